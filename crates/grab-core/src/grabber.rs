//! Per hand or controller grab arbitration
//!
//! A grabber ticks its detectors, turns their hover sets into Hover and
//! Unhover events, picks the detector whose candidate a grab would use and
//! runs the grab state machine over the active input methods.

use glam::Vec3;
use tracing::{debug, trace};

use crate::config::{DebugConfig, GrabberConfig};
use crate::detector::{
    highest_priority, DebugShape, DetectorContext, DistanceDetector, GrabDetector, HandDetector,
    RayDetector, RayHit,
};
use crate::events::{CancelGrabEvent, PointerEvent, PointerEventType};
use crate::host::{ColliderShape, Host};
use crate::motion::{GrabMotion, MotionInputs};
use crate::registry::GrabbableRegistry;
use crate::transform::{Pose, Transform};
use crate::types::{
    ComponentId, CoordinatorId, DetectorKind, GrabbableId, GrabberId, InputMethod, InputMethods,
    InteractorState, MultiGrabBehavior,
};

/// Everything outside the grabber a frame operation touches
pub(crate) struct GrabContext<'a> {
    pub registry: &'a mut GrabbableRegistry,
    pub host: &'a mut dyn Host,
    pub time: f32,
    pub debug: &'a DebugConfig,
}

/// Grab state machine for one hand or controller
#[derive(Debug)]
pub struct GrabCoordinator {
    id: GrabberId,
    component: ComponentId,
    config: GrabberConfig,
    hand: HandDetector,
    ray: RayDetector,
    distance: DistanceDetector,
    current_hover: Option<DetectorKind>,
    current_grab: Option<DetectorKind>,
    active_methods: InputMethods,
    initial_method: InputMethod,
    grabbed: Option<GrabbableId>,
    grabbed_coordinator: Option<CoordinatorId>,
    hovered: Vec<GrabbableId>,
    motion: Option<GrabMotion>,
    state: InteractorState,
    active: bool,
}

impl GrabCoordinator {
    /// Create a grabber rooted at a host component
    pub fn new(id: GrabberId, component: ComponentId, config: GrabberConfig) -> Self {
        Self {
            id,
            component,
            hand: HandDetector::new(&config.hand),
            ray: RayDetector::new(&config.ray),
            distance: DistanceDetector::new(&config.distance),
            config,
            current_hover: None,
            current_grab: None,
            active_methods: InputMethods::NONE,
            initial_method: InputMethod::Unknown,
            grabbed: None,
            grabbed_coordinator: None,
            hovered: Vec::new(),
            motion: None,
            state: InteractorState::Normal,
            active: true,
        }
    }

    /// Handle
    pub fn id(&self) -> GrabberId {
        self.id
    }

    /// Root component in the host scene
    pub fn component(&self) -> ComponentId {
        self.component
    }

    /// Configuration
    pub fn config(&self) -> &GrabberConfig {
        &self.config
    }

    /// Current state
    pub fn state(&self) -> InteractorState {
        self.state
    }

    /// Whether the grabber takes part in interaction
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether a grab is running
    pub fn is_grabbing(&self) -> bool {
        self.grabbed.is_some()
    }

    /// Held grabbable
    pub fn grabbed(&self) -> Option<GrabbableId> {
        self.grabbed
    }

    /// Hovered grabbables across enabled detectors
    pub fn hovered(&self) -> &[GrabbableId] {
        &self.hovered
    }

    /// Detector a grab would start from
    pub fn current_hover_detector(&self) -> Option<DetectorKind> {
        self.current_hover
    }

    /// Detector that started the running grab
    pub fn current_grab_detector(&self) -> Option<DetectorKind> {
        self.current_grab
    }

    /// Input methods holding the running grab
    pub fn active_input_methods(&self) -> InputMethods {
        self.active_methods
    }

    /// Input method that started the running grab
    pub fn initial_input_method(&self) -> InputMethod {
        self.initial_method
    }

    /// Whether the grabber runs a detector kind
    pub fn is_detector_allowed(&self, kind: DetectorKind) -> bool {
        self.config.allowed_detectors.allows(kind)
    }

    /// Hand detector
    pub fn hand_detector(&self) -> &HandDetector {
        &self.hand
    }

    /// Ray detector
    pub fn ray_detector(&self) -> &RayDetector {
        &self.ray
    }

    /// Distance detector
    pub fn distance_detector(&self) -> &DistanceDetector {
        &self.distance
    }

    /// Live ray hit, or the hit glued to the held object during a ray grab
    pub fn ray_hit(&self) -> Option<RayHit> {
        if self.is_detector_allowed(DetectorKind::Ray) {
            self.ray.hit()
        } else {
            None
        }
    }

    /// Swap the pinch volume shape
    pub fn replace_pinch_volume(&mut self, shape: ColliderShape) {
        self.hand.replace_pinch_shape(shape);
    }

    /// Swap the palm volume shape
    pub fn replace_palm_volume(&mut self, shape: ColliderShape) {
        self.hand.replace_palm_shape(shape);
    }

    /// Move the palm volume relative to the grabber root
    pub fn set_palm_offset(&mut self, offset: Vec3) {
        self.hand.set_palm_offset(offset);
    }

    /// World transform of the grabber root
    pub fn root_transform(&self, host: &dyn Host) -> Transform {
        host.world_transform(self.component).unwrap_or_default()
    }

    /// World transform used for a given input method: pinch volume, palm
    /// volume or the root
    pub fn grabber_transform(&self, method: InputMethod, host: &dyn Host) -> Transform {
        let root = self.root_transform(host);
        match method {
            InputMethod::Pinch => self.hand.pinch_transform(host, self.id, &root),
            InputMethod::Palm => self.hand.palm_transform(&root),
            InputMethod::Unknown | InputMethod::Custom => root,
        }
    }

    /// Detector shapes for debug drawing
    pub fn debug_shapes(&self) -> Vec<DebugShape> {
        self.allowed_detectors()
            .into_iter()
            .flat_map(|kind| self.detector(kind).debug_shapes())
            .collect()
    }

    fn detector(&self, kind: DetectorKind) -> &dyn GrabDetector {
        match kind {
            DetectorKind::Hand => &self.hand,
            DetectorKind::Ray => &self.ray,
            DetectorKind::Distance => &self.distance,
        }
    }

    fn detector_mut(&mut self, kind: DetectorKind) -> &mut dyn GrabDetector {
        match kind {
            DetectorKind::Hand => &mut self.hand,
            DetectorKind::Ray => &mut self.ray,
            DetectorKind::Distance => &mut self.distance,
        }
    }

    fn allowed_detectors(&self) -> Vec<DetectorKind> {
        DetectorKind::priority_order()
            .iter()
            .copied()
            .filter(|kind| self.is_detector_allowed(*kind))
            .collect()
    }

    fn detector_context<'a>(
        &self,
        root: Transform,
        registry: &'a GrabbableRegistry,
        host: &'a dyn Host,
    ) -> DetectorContext<'a> {
        DetectorContext {
            grabber: self.id,
            grabber_transform: root,
            allowed_input_methods: self.config.allowed_input_methods,
            host,
            registry,
        }
    }

    fn motion_inputs(&self, delta_time: f32, cx: &GrabContext) -> MotionInputs {
        let grabbable = self
            .grabbed
            .and_then(|id| cx.registry.grabbable(id))
            .and_then(|g| cx.host.world_transform(g.collider()));
        MotionInputs {
            grabbable,
            grabber: self.grabber_transform(self.initial_method, &*cx.host),
            pointer: cx.host.pointer_pose(self.id).map(|p| p.to_transform()),
            time: cx.time,
            delta_time,
        }
    }

    fn event_pose(&self, kind: PointerEventType, interactable: GrabbableId, cx: &GrabContext) -> Pose {
        if let Some(motion) = &self.motion {
            return motion.transform().pose();
        }
        match kind {
            PointerEventType::Hover | PointerEventType::Unhover => cx
                .registry
                .grabbable(interactable)
                .and_then(|g| cx.host.world_transform(g.collider()))
                .unwrap_or_else(|| self.root_transform(&*cx.host))
                .pose(),
            _ => self.grabber_transform(self.initial_method, &*cx.host).pose(),
        }
    }

    fn post(&self, kind: PointerEventType, interactable: GrabbableId, cx: &mut GrabContext) {
        let event = PointerEvent {
            identifier: self.id.0,
            kind,
            pose: self.event_pose(kind, interactable, cx),
            interactor: self.id,
            interactable,
            interactor_transform: self.root_transform(&*cx.host),
        };
        if cx.debug.log_pointer_events {
            debug!(
                "{} {} {} at {:?}",
                self.id,
                kind.display_name(),
                interactable,
                event.pose.position
            );
        }
        cx.registry.post_event(&event, cx.time, &mut *cx.host);
    }

    fn update_state(&mut self) {
        self.state = if !self.active {
            InteractorState::Disabled
        } else if self.grabbed.is_some() {
            InteractorState::Select
        } else if !self.hovered.is_empty() {
            InteractorState::Hover
        } else {
            InteractorState::Normal
        };
    }

    /// Run one frame: detectors, motion, hover diff, hover arbitration, Move
    pub(crate) fn tick(&mut self, delta_time: f32, cx: &mut GrabContext) {
        if !self.active {
            return;
        }
        let allowed = self.allowed_detectors();
        let root = self.root_transform(&*cx.host);
        {
            let ctx = self.detector_context(root, &*cx.registry, &*cx.host);
            for kind in &allowed {
                self.detector_mut(*kind).tick(&ctx);
            }
        }

        if let Some(mut motion) = self.motion.take() {
            let inputs = self.motion_inputs(delta_time, cx);
            if motion.tick(&inputs) {
                self.motion = Some(motion);
            }
        }

        self.update_hover(&allowed, cx);

        self.current_hover = if self.grabbed.is_some() {
            None
        } else {
            let hovering: Vec<DetectorKind> = allowed
                .iter()
                .copied()
                .filter(|kind| !self.detector(*kind).hovered().is_empty())
                .collect();
            highest_priority(&hovering)
        };
        if let Some(kind) = self.current_hover {
            trace!("{} hover detector {}", self.id, kind.display_name());
        }

        match self.grabbed {
            Some(grabbed) if self.is_grab_valid(grabbed, cx) => {
                self.post(PointerEventType::Move, grabbed, cx);
            }
            _ if self.grabbed.is_some() || !self.active_methods.is_empty() => {
                self.drop_dangling_grab(cx);
            }
            _ => {}
        }

        self.update_state();
    }

    fn is_grab_valid(&self, grabbed: GrabbableId, cx: &GrabContext) -> bool {
        cx.registry
            .grabbable(grabbed)
            .is_some_and(|g| cx.host.is_alive(g.collider()))
    }

    fn update_hover(&mut self, allowed: &[DetectorKind], cx: &mut GrabContext) {
        let mut now: Vec<GrabbableId> = Vec::new();
        for kind in allowed {
            for id in self.detector(*kind).hovered() {
                if !now.contains(id) && cx.registry.contains(*id) {
                    now.push(*id);
                }
            }
        }
        // destroyed grabbables leave without an Unhover
        self.hovered.retain(|id| cx.registry.contains(*id));

        let gone: Vec<GrabbableId> = self
            .hovered
            .iter()
            .copied()
            .filter(|id| !now.contains(id))
            .collect();
        let added: Vec<GrabbableId> = now
            .iter()
            .copied()
            .filter(|id| !self.hovered.contains(id))
            .collect();
        self.hovered = now;

        for id in gone {
            self.post(PointerEventType::Unhover, id, cx);
        }
        for id in added {
            self.post(PointerEventType::Hover, id, cx);
        }
    }

    /// The held object went away: cancel our grab point and fall back to idle
    fn drop_dangling_grab(&mut self, cx: &mut GrabContext) {
        debug!("{} lost its grabbed object", self.id);
        let coordinator = match self.grabbed_coordinator {
            Some(id) => cx.registry.coordinator_mut(id),
            None => None,
        };
        if let Some(coordinator) = coordinator {
            coordinator.unsubscribe_cancel(self.id);
            if let (Some(grabbed), Some(_)) =
                (self.grabbed, coordinator.poses().find_select(self.id.0))
            {
                let event = PointerEvent {
                    identifier: self.id.0,
                    kind: PointerEventType::Cancel,
                    pose: Pose::IDENTITY,
                    interactor: self.id,
                    interactable: grabbed,
                    interactor_transform: Transform::IDENTITY,
                };
                coordinator.process_pointer_event(&event, cx.time, &mut *cx.host);
            }
        }
        self.reset_grab_state();
    }

    /// First half of a grab: checks, eviction and detector selection
    ///
    /// Returns `None` when nothing new was grabbed. Otherwise returns the
    /// cancel events of grabbers evicted by the object's multi grab policy;
    /// they must be routed before [`Self::complete_select`].
    pub(crate) fn try_select(
        &mut self,
        method: InputMethod,
        cx: &mut GrabContext,
    ) -> Option<Vec<CancelGrabEvent>> {
        if !self.active
            || self.active_methods.contains(method)
            || !self.config.allowed_input_methods.contains(method)
        {
            return None;
        }

        if let Some(grabbed) = self.grabbed {
            if cx
                .registry
                .grabbable(grabbed)
                .is_some_and(|g| g.is_grab_input_method_allowed(method))
            {
                self.active_methods.insert(method);
                debug!("{} added {} to its grab", self.id, method.display_name());
            }
            return None;
        }

        let kind = self.current_hover?;
        let candidate = self.detector(kind).grab_candidate(method)?;
        let grabbable = cx.registry.grabbable(candidate)?;
        if !grabbable.is_grab_input_method_allowed(method) {
            return None;
        }
        let coordinator = grabbable.coordinator();
        let num_grabbers = cx.registry.num_grabbers(candidate);
        let behavior = cx.registry.multi_grab_behavior(candidate);
        if num_grabbers >= 1 && behavior == Some(MultiGrabBehavior::SingleGrabFirstRetained) {
            debug!("{} is held, {} keeps it", candidate, self.id);
            return None;
        }

        self.grabbed = Some(candidate);
        self.grabbed_coordinator = coordinator;
        self.current_grab = Some(kind);
        self.initial_method = method;
        self.active_methods.insert(method);

        let root = self.root_transform(&*cx.host);
        {
            let ctx = self.detector_context(root, &*cx.registry, &*cx.host);
            self.detector_mut(kind).select(method, &ctx);
        }
        self.hand.attach_pinch_to_root(&*cx.host, self.id, &root);

        let evict = num_grabbers >= 1
            && match behavior {
                Some(MultiGrabBehavior::SingleGrabTransferToSecond) => true,
                Some(MultiGrabBehavior::MultiGrab) => kind != DetectorKind::Hand,
                _ => false,
            };
        let cancels = match coordinator {
            Some(coordinator) if evict => cx
                .registry
                .force_cancel(coordinator, &mut *cx.host)
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        Some(cancels)
    }

    /// Second half of a grab: subscribe, start far grab motion, post Select
    pub(crate) fn complete_select(&mut self, cx: &mut GrabContext) {
        let Some(grabbed) = self.grabbed else {
            return;
        };
        let mut motion_config = None;
        if let Some(id) = self.grabbed_coordinator {
            if let Some(coordinator) = cx.registry.coordinator_mut(id) {
                coordinator.subscribe_cancel(self.id);
                motion_config = coordinator.distance_grab_motion().cloned();
            }
        }
        if self.current_grab != Some(DetectorKind::Hand) {
            if let Some(config) = motion_config {
                let inputs = self.motion_inputs(0.0, cx);
                self.motion = GrabMotion::start(&config, &inputs);
            }
        }

        debug!(
            "{} grabbed {} with {} via {}",
            self.id,
            grabbed,
            self.initial_method.display_name(),
            self.current_grab.map_or("none", |k| k.display_name())
        );
        self.post(PointerEventType::Select, grabbed, cx);
        self.update_state();
    }

    /// Clear an input method; the grab ends with the last one
    pub(crate) fn release(&mut self, method: InputMethod, cx: &mut GrabContext) {
        self.active_methods.remove(method);
        if !self.active_methods.is_empty() {
            return;
        }
        let Some(grabbed) = self.grabbed else {
            return;
        };
        debug!("{} released {}", self.id, grabbed);
        self.post(PointerEventType::Unselect, grabbed, cx);
        if let Some(id) = self.grabbed_coordinator {
            if let Some(coordinator) = cx.registry.coordinator_mut(id) {
                coordinator.unsubscribe_cancel(self.id);
            }
        }
        self.reset_grab_state();
    }

    /// Drop the grab because the object's coordinator cancelled it
    pub(crate) fn handle_cancel(&mut self, event: &CancelGrabEvent, cx: &mut GrabContext) {
        if event.interactor_id != self.id.0
            || self.grabbed.is_none()
            || self.grabbed_coordinator != Some(event.coordinator)
        {
            return;
        }
        debug!("{} grab cancelled by {}", self.id, event.coordinator);
        self.active_methods.clear();
        self.release(InputMethod::Unknown, cx);
    }

    fn reset_grab_state(&mut self) {
        self.motion = None;
        if let Some(kind) = self.current_grab.take() {
            self.detector_mut(kind).unselect();
        }
        self.grabbed = None;
        self.grabbed_coordinator = None;
        self.active_methods.clear();
        self.initial_method = InputMethod::Unknown;
        self.hand.attach_pinch_to_thumb_tip();
        self.update_state();
    }

    /// Let go of everything, unhover and stop ticking
    pub(crate) fn deactivate(&mut self, cx: &mut GrabContext) {
        if !self.active {
            return;
        }
        self.release(InputMethod::Palm, cx);
        self.release(InputMethod::Pinch, cx);
        if self.grabbed.is_some() {
            self.active_methods.clear();
            self.release(InputMethod::Unknown, cx);
        }

        let hovered = std::mem::take(&mut self.hovered);
        for id in hovered {
            if cx.registry.contains(id) {
                self.post(PointerEventType::Unhover, id, cx);
            }
        }
        self.current_hover = None;
        self.active = false;
        self.update_state();
        debug!("{} deactivated", self.id);
    }

    /// Resume ticking
    pub(crate) fn activate(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.update_state();
        debug!("{} activated", self.id);
    }
}
