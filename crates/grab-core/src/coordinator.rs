//! Per-object grab transform coordination
//!
//! The coordinator owns the grab points of one object and picks the solver
//! that moves it: none, single or multi, by the number of selecting points.
//! It also pauses physics while the object is held, throws it on release and
//! can snap the object onto the grabbing hand.

use std::collections::BTreeSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GrabError, GrabResult};
use crate::events::{
    CancelGrabEvent, EventEmitter, ListenerId, PointerEvent, PointerEventType, TransformEvent,
    TransformEventType,
};
use crate::host::Host;
use crate::motion::MotionConfig;
use crate::pose_collection::GrabPoseCollection;
use crate::throwable::{ThrowSettings, VelocityTracker};
use crate::transform::{TargetTransform, Transform};
use crate::transformer::{GrabTransformer, Transformer, TransformerConfig, TransformerRole};
use crate::types::{ComponentId, CoordinatorId, GrabberId, MultiGrabBehavior};

/// Serializable coordinator settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// What a second grabber does to an object that is already held
    pub multi_grab_behavior: MultiGrabBehavior,
    /// Solver used with one grab point
    pub single_grab_transformer: Option<TransformerConfig>,
    /// Solver used with two or more grab points
    pub multi_grab_transformer: Option<TransformerConfig>,
    /// Grabber-side motion for ray and distance grabs
    pub distance_grab_motion: Option<MotionConfig>,
    /// Throw on release
    pub throwable: Option<ThrowSettings>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            multi_grab_behavior: MultiGrabBehavior::default(),
            single_grab_transformer: Some(TransformerConfig::default()),
            multi_grab_transformer: Some(TransformerConfig::default()),
            distance_grab_motion: Some(MotionConfig::default()),
            throwable: None,
        }
    }
}

impl CoordinatorConfig {
    /// Set multi grab behavior
    pub fn with_multi_grab_behavior(mut self, behavior: MultiGrabBehavior) -> Self {
        self.multi_grab_behavior = behavior;
        self
    }

    /// Set the single grab solver
    pub fn with_single_grab_transformer(mut self, transformer: TransformerConfig) -> Self {
        self.single_grab_transformer = Some(transformer);
        self
    }

    /// Set the multi grab solver
    pub fn with_multi_grab_transformer(mut self, transformer: TransformerConfig) -> Self {
        self.multi_grab_transformer = Some(transformer);
        self
    }

    /// Set or disable far grab motion
    pub fn with_distance_grab_motion(mut self, motion: Option<MotionConfig>) -> Self {
        self.distance_grab_motion = motion;
        self
    }

    /// Make the object throwable
    pub fn with_throwable(mut self, settings: ThrowSettings) -> Self {
        self.throwable = Some(settings);
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PhysicsCache {
    cached: bool,
    was_simulating: bool,
    had_gravity: bool,
}

#[derive(Debug, Clone, Copy)]
struct MoveSnap {
    start: Transform,
    start_time: f32,
    duration: f32,
}

#[derive(Debug, Clone, Copy, Default)]
struct InteractorSnap {
    enabled: bool,
    first_frame: bool,
    offset: Transform,
    move_snap: Option<MoveSnap>,
    queued: Option<(Transform, f32)>,
}

/// World transform that puts `target` at `offset` on the interactor
///
/// Only exact after a second pass when the rotation changes, since the
/// offset is expressed relative to the target itself.
fn snap_transform(offset: &Transform, target: &Transform, interactor: &Transform) -> Transform {
    let rotated_rotation = target.rotation * offset.rotation;
    let rotated_location = target.translation + target.rotation * offset.translation;
    let rotation = (interactor.rotation * rotated_rotation.inverse()) * target.rotation;
    Transform::new(
        target.translation + (interactor.translation - rotated_location),
        rotation.normalize(),
        target.scale,
    )
}

/// Drives one object's transform from its grab points
#[derive(Debug)]
pub struct GrabTransformCoordinator {
    id: CoordinatorId,
    target: Option<ComponentId>,
    multi_grab_behavior: MultiGrabBehavior,
    single: Option<GrabTransformer>,
    multi: Option<GrabTransformer>,
    active: Option<TransformerRole>,
    poses: GrabPoseCollection,
    initial_target: Option<TargetTransform>,
    physics: PhysicsCache,
    throwable: Option<VelocityTracker>,
    distance_grab_motion: Option<MotionConfig>,
    snap: InteractorSnap,
    last_interactor: Option<Transform>,
    cancel_subscribers: BTreeSet<GrabberId>,
    transform_events: EventEmitter<TransformEvent>,
    cancel_events: EventEmitter<CancelGrabEvent>,
}

impl GrabTransformCoordinator {
    /// Create a coordinator moving `target`
    pub fn new(
        id: CoordinatorId,
        target: Option<ComponentId>,
        config: &CoordinatorConfig,
    ) -> GrabResult<Self> {
        let multi = config.multi_grab_transformer.as_ref().map(TransformerConfig::build);
        if let Some(solver) = &multi {
            check_multi(solver)?;
        }
        Ok(Self {
            id,
            target,
            multi_grab_behavior: config.multi_grab_behavior,
            single: config.single_grab_transformer.as_ref().map(TransformerConfig::build),
            multi,
            active: None,
            poses: GrabPoseCollection::new(),
            initial_target: None,
            physics: PhysicsCache::default(),
            throwable: config.throwable.clone().map(VelocityTracker::new),
            distance_grab_motion: config.distance_grab_motion.clone(),
            snap: InteractorSnap::default(),
            last_interactor: None,
            cancel_subscribers: BTreeSet::new(),
            transform_events: EventEmitter::new(),
            cancel_events: EventEmitter::new(),
        })
    }

    /// Handle
    pub fn id(&self) -> CoordinatorId {
        self.id
    }

    /// Component this coordinator moves
    pub fn target(&self) -> Option<ComponentId> {
        self.target
    }

    /// Change the moved component. Constraints are re-derived on the next grab.
    pub fn set_target(&mut self, target: Option<ComponentId>) {
        self.target = target;
        self.initial_target = None;
    }

    /// Grab points
    pub fn poses(&self) -> &GrabPoseCollection {
        &self.poses
    }

    /// Number of selecting grab points
    pub fn num_grabbers(&self) -> usize {
        self.poses.select_poses().len()
    }

    /// Solver slot in use
    pub fn active_role(&self) -> Option<TransformerRole> {
        self.active
    }

    /// Multi grab policy
    pub fn multi_grab_behavior(&self) -> MultiGrabBehavior {
        self.multi_grab_behavior
    }

    /// Change the multi grab policy
    pub fn set_multi_grab_behavior(&mut self, behavior: MultiGrabBehavior) {
        self.multi_grab_behavior = behavior;
    }

    /// Far grab motion
    pub fn distance_grab_motion(&self) -> Option<&MotionConfig> {
        self.distance_grab_motion.as_ref()
    }

    /// Change or disable far grab motion
    pub fn set_distance_grab_motion(&mut self, motion: Option<MotionConfig>) {
        self.distance_grab_motion = motion;
    }

    /// Whether release applies throw velocity
    pub fn is_throwable(&self) -> bool {
        self.throwable.is_some()
    }

    /// Velocity tracker, when throwable
    pub fn velocity_tracker(&self) -> Option<&VelocityTracker> {
        self.throwable.as_ref()
    }

    /// Make throwable or not; a running track is dropped
    pub fn set_throwable(&mut self, settings: Option<ThrowSettings>) {
        self.throwable = settings.map(VelocityTracker::new);
    }

    /// Single grab solver
    pub fn single_grab_transformer(&self) -> Option<&GrabTransformer> {
        self.single.as_ref()
    }

    /// Multi grab solver
    pub fn multi_grab_transformer(&self) -> Option<&GrabTransformer> {
        self.multi.as_ref()
    }

    /// Whether an interactor snap is running
    pub fn is_interactor_snap_enabled(&self) -> bool {
        self.snap.enabled
    }

    /// Observe begin/update/end
    pub fn on_transform_event(
        &mut self,
        listener: impl FnMut(&TransformEvent) + 'static,
    ) -> ListenerId {
        self.transform_events.subscribe(listener)
    }

    /// Stop observing transform events
    pub fn remove_transform_listener(&mut self, id: ListenerId) -> bool {
        self.transform_events.unsubscribe(id)
    }

    /// Observe forced cancels
    pub fn on_cancel_grab_event(
        &mut self,
        listener: impl FnMut(&CancelGrabEvent) + 'static,
    ) -> ListenerId {
        self.cancel_events.subscribe(listener)
    }

    /// Stop observing cancels
    pub fn remove_cancel_listener(&mut self, id: ListenerId) -> bool {
        self.cancel_events.unsubscribe(id)
    }

    /// Register a grabber for cancel delivery. Subscribing twice is a no-op.
    pub fn subscribe_cancel(&mut self, grabber: GrabberId) {
        self.cancel_subscribers.insert(grabber);
    }

    /// Unregister a grabber
    pub fn unsubscribe_cancel(&mut self, grabber: GrabberId) {
        self.cancel_subscribers.remove(&grabber);
    }

    /// Whether a grabber receives cancels
    pub fn is_cancel_subscriber(&self, grabber: GrabberId) -> bool {
        self.cancel_subscribers.contains(&grabber)
    }

    /// Apply a pointer event
    ///
    /// Point count changes restart the solver so the slot always matches the
    /// post-event count.
    pub fn process_pointer_event(&mut self, event: &PointerEvent, time: f32, host: &mut dyn Host) {
        self.poses.update_from_event(event);
        self.last_interactor = Some(event.interactor_transform);
        match event.kind {
            PointerEventType::Select | PointerEventType::Unselect | PointerEventType::Cancel => {
                self.end_transform(host);
                self.begin_transform(time, host);
            }
            PointerEventType::Move => self.update_transform(time, host),
            PointerEventType::Hover | PointerEventType::Unhover => {}
        }
    }

    /// Drop every grab point and ask their grabbers to let go
    ///
    /// Returns the cancel events in the order they were emitted; the caller
    /// routes them to subscribed grabbers.
    pub fn force_cancel(&mut self, host: &mut dyn Host) -> Vec<CancelGrabEvent> {
        let identifiers: Vec<u32> = self
            .poses
            .select_poses()
            .iter()
            .map(|p| p.identifier)
            .collect();
        self.poses.clear();
        // poses must be gone first so physics is restored
        self.end_transform(host);

        identifiers
            .into_iter()
            .map(|interactor_id| {
                let event = CancelGrabEvent {
                    interactor_id,
                    coordinator: self.id,
                };
                debug!("{} cancelled grab point {}", self.id, interactor_id);
                self.cancel_events.emit(&event);
                event
            })
            .collect()
    }

    /// Replace the single grab solver and restart
    pub fn set_single_grab_transformer(
        &mut self,
        transformer: Option<GrabTransformer>,
        time: f32,
        host: &mut dyn Host,
    ) -> GrabResult<()> {
        self.single = transformer;
        if let (Some(solver), Some(initial)) = (&mut self.single, self.initial_target) {
            solver.update_constraints(&initial);
        }
        self.restart(time, host);
        Ok(())
    }

    /// Replace the multi grab solver and restart
    ///
    /// Solvers limited to one grab point are rejected.
    pub fn set_multi_grab_transformer(
        &mut self,
        transformer: Option<GrabTransformer>,
        time: f32,
        host: &mut dyn Host,
    ) -> GrabResult<()> {
        if let Some(solver) = &transformer {
            check_multi(solver)?;
        }
        self.multi = transformer;
        if let (Some(solver), Some(initial)) = (&mut self.multi, self.initial_target) {
            solver.update_constraints(&initial);
        }
        self.restart(time, host);
        Ok(())
    }

    /// Snap the object onto the grabbing interactor
    ///
    /// `offset` places the interactor relative to the object. A positive
    /// `move_snap_duration` blends in from the current pose. A request made
    /// while another snap runs is applied on the next update.
    pub fn set_interactor_snap(
        &mut self,
        offset: Transform,
        move_snap_duration: f32,
        time: f32,
        host: &dyn Host,
    ) {
        if self.snap.enabled && self.last_interactor.is_some() {
            self.snap.queued = Some((offset, move_snap_duration));
            return;
        }
        let start = self.snapshot(host).map(|s| s.world);
        self.execute_snap(offset, move_snap_duration, time, start);
    }

    /// Record the target's pose for throw estimation
    pub fn sample_throwable(&mut self, time: f32, host: &dyn Host) {
        let (Some(tracker), Some(target)) = (&mut self.throwable, self.target) else {
            return;
        };
        if !tracker.is_tracking() {
            return;
        }
        if let Some(world) = host.world_transform(target) {
            tracker.sample(world.translation, world.rotation, time);
        }
    }

    /// End the active solver, e.g. when the object goes away
    pub fn end_transform(&mut self, host: &mut dyn Host) {
        let (Some(target), Some(role)) = (self.target, self.active) else {
            return;
        };
        let snapshot = self.snapshot(host);
        let solver = match role {
            TransformerRole::Single => self.single.as_mut(),
            TransformerRole::Multi => self.multi.as_mut(),
        };
        if let Some(solver) = solver {
            let relative = solver.end_transform(&snapshot.unwrap_or_default());
            if snapshot.is_some() {
                host.set_relative_transform(target, relative);
            }
        }
        debug!("{} ended {} transform", self.id, role);
        self.emit(TransformEventType::End);

        self.active = None;
        self.last_interactor = None;
        self.snap = InteractorSnap {
            queued: self.snap.queued,
            ..Default::default()
        };

        if self.poses.select_poses().is_empty() {
            self.release_physics(target, host);
        }
    }

    fn begin_transform(&mut self, time: f32, host: &mut dyn Host) {
        let Some(target) = self.target else {
            return;
        };
        let Some(snapshot) = self.snapshot(host) else {
            return;
        };
        if self.initial_target.is_none() {
            self.initial_target = Some(snapshot);
            self.update_constraints();
        }

        let role = match self.poses.select_poses().len() {
            0 => return,
            1 => TransformerRole::Single,
            _ => TransformerRole::Multi,
        };
        let has_solver = match role {
            TransformerRole::Single => self.single.is_some(),
            TransformerRole::Multi => self.multi.is_some(),
        };
        if !has_solver {
            return;
        }

        if !self.physics.cached {
            self.pause_physics(target, host);
        }
        if let Some(tracker) = &mut self.throwable {
            tracker.start_tracking(snapshot.world.translation, time);
        }

        let solver = match role {
            TransformerRole::Single => self.single.as_mut(),
            TransformerRole::Multi => self.multi.as_mut(),
        };
        if let Some(solver) = solver {
            solver.begin_transform(self.poses.select_poses(), &snapshot);
        }
        self.active = Some(role);
        debug!(
            "{} began {} transform with {} point(s)",
            self.id,
            role,
            self.num_grabbers()
        );
        self.emit(TransformEventType::Begin);
    }

    fn update_transform(&mut self, time: f32, host: &mut dyn Host) {
        let (Some(target), Some(role)) = (self.target, self.active) else {
            return;
        };
        let Some(snapshot) = self.snapshot(host) else {
            return;
        };

        if let Some((offset, duration)) = self.snap.queued.take() {
            self.execute_snap(offset, duration, time, Some(snapshot.world));
        }

        let relative = match self.snapped_world(time, &snapshot) {
            Some(world) => world.relative_to(&snapshot.parent_world),
            None => {
                let solver = match role {
                    TransformerRole::Single => self.single.as_mut(),
                    TransformerRole::Multi => self.multi.as_mut(),
                };
                let Some(solver) = solver else {
                    return;
                };
                solver.update_transform(self.poses.select_poses(), &snapshot)
            }
        };
        host.set_relative_transform(target, relative);
        self.emit(TransformEventType::Update);
    }

    fn restart(&mut self, time: f32, host: &mut dyn Host) {
        self.end_transform(host);
        self.begin_transform(time, host);
    }

    fn update_constraints(&mut self) {
        let Some(initial) = self.initial_target else {
            return;
        };
        for solver in [self.single.as_mut(), self.multi.as_mut()].into_iter().flatten() {
            solver.update_constraints(&initial);
        }
    }

    fn snapshot(&self, host: &dyn Host) -> Option<TargetTransform> {
        let target = self.target?;
        if !host.is_alive(target) {
            return None;
        }
        let world = host.world_transform(target)?;
        Some(TargetTransform::from_world(
            world,
            host.parent_world_transform(target),
        ))
    }

    fn execute_snap(&mut self, offset: Transform, duration: f32, time: f32, start: Option<Transform>) {
        self.snap.move_snap = match start {
            Some(start) if duration > 0.0 => Some(MoveSnap {
                start,
                start_time: time,
                duration,
            }),
            _ => None,
        };
        self.snap.enabled = true;
        self.snap.first_frame = true;
        self.snap.offset = offset;
    }

    fn snapped_world(&mut self, time: f32, snapshot: &TargetTransform) -> Option<Transform> {
        if !self.snap.enabled || self.num_grabbers() != 1 {
            return None;
        }
        let Some(interactor) = self.last_interactor else {
            warn!("{} has no interactor to snap to", self.id);
            return None;
        };

        let mut world = snap_transform(&self.snap.offset, &snapshot.world, &interactor);
        if self.snap.first_frame {
            world = snap_transform(&self.snap.offset, &world, &interactor);
            self.snap.first_frame = false;
        }

        if let Some(move_snap) = self.snap.move_snap {
            let alpha = ((time - move_snap.start_time) / move_snap.duration).min(1.0);
            world = move_snap.start.lerp(&world, alpha);
            if alpha >= 1.0 {
                self.snap.move_snap = None;
            }
        }
        Some(world)
    }

    fn pause_physics(&mut self, target: ComponentId, host: &mut dyn Host) {
        let simulating = host.is_simulating_physics(target);
        self.physics = PhysicsCache {
            cached: true,
            was_simulating: simulating,
            had_gravity: host.is_gravity_enabled(target),
        };
        if simulating {
            host.set_linear_velocity(target, Vec3::ZERO);
            host.set_simulate_physics(target, false);
            host.set_gravity_enabled(target, false);
            debug!("{} paused physics on {}", self.id, target);
        }
    }

    fn release_physics(&mut self, target: ComponentId, host: &mut dyn Host) {
        if !self.physics.cached {
            return;
        }
        let cache = std::mem::take(&mut self.physics);
        host.set_simulate_physics(target, cache.was_simulating);

        if let Some(tracker) = &mut self.throwable {
            let velocity = tracker.velocity();
            host.set_linear_velocity(target, velocity);
            host.set_angular_velocity(target, tracker.angular_velocity());
            let gravity = if tracker.settings().retain_gravity {
                cache.had_gravity
            } else {
                !cache.had_gravity
            };
            host.set_gravity_enabled(target, gravity);
            tracker.stop_tracking();
            debug!(
                "{} threw {} at {:.1} units/s",
                self.id,
                target,
                velocity.length()
            );
        } else if cache.was_simulating {
            host.set_gravity_enabled(target, cache.had_gravity);
        }
    }

    fn emit(&mut self, kind: TransformEventType) {
        self.transform_events.emit(&TransformEvent {
            kind,
            coordinator: self.id,
        });
    }
}

fn check_multi(solver: &GrabTransformer) -> GrabResult<()> {
    let max_grab_points = solver.max_grab_points();
    if max_grab_points == 1 {
        warn!(
            "{} solver accepts a single grab point and cannot be used for multi grab",
            solver.display_name()
        );
        return Err(GrabError::InvalidTransformer {
            role: TransformerRole::Multi,
            max_grab_points,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ColliderShape, RigidBodyControl, SceneGraph};
    use crate::test_host::FakeHost;
    use crate::transform::Pose;
    use crate::transformer::{OneGrabRotateConfig, OneGrabTranslateConfig};
    use crate::types::GrabbableId;
    use glam::Quat;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn pointer(kind: PointerEventType, grabber: u32, position: Vec3) -> PointerEvent {
        PointerEvent {
            identifier: grabber,
            kind,
            pose: Pose::new(position, Quat::IDENTITY),
            interactor: GrabberId(grabber),
            interactable: GrabbableId(0),
            interactor_transform: Transform::from_translation(position),
        }
    }

    fn setup(config: CoordinatorConfig) -> (FakeHost, ComponentId, GrabTransformCoordinator) {
        let mut host = FakeHost::default();
        let target = host.add_body(1, Vec3::ONE, ColliderShape::default());
        let coordinator =
            GrabTransformCoordinator::new(CoordinatorId(0), Some(target), &config).unwrap();
        (host, target, coordinator)
    }

    #[test]
    fn test_solver_slot_follows_point_count() {
        let (mut host, _, mut c) = setup(CoordinatorConfig::default());
        c.process_pointer_event(&pointer(PointerEventType::Select, 1, Vec3::ONE), 0.0, &mut host);
        assert_eq!(c.active_role(), Some(TransformerRole::Single));
        c.process_pointer_event(&pointer(PointerEventType::Select, 2, Vec3::ZERO), 0.0, &mut host);
        assert_eq!(c.active_role(), Some(TransformerRole::Multi));
        assert_eq!(c.num_grabbers(), 2);
        c.process_pointer_event(&pointer(PointerEventType::Unselect, 1, Vec3::ONE), 0.0, &mut host);
        assert_eq!(c.active_role(), Some(TransformerRole::Single));
        c.process_pointer_event(&pointer(PointerEventType::Cancel, 2, Vec3::ONE), 0.0, &mut host);
        assert_eq!(c.active_role(), None);
    }

    #[test]
    fn test_move_applies_solver() {
        let (mut host, target, mut c) = setup(CoordinatorConfig::default());
        c.process_pointer_event(&pointer(PointerEventType::Select, 1, Vec3::ONE), 0.0, &mut host);
        c.process_pointer_event(
            &pointer(PointerEventType::Move, 1, Vec3::splat(5.0)),
            0.1,
            &mut host,
        );
        let world = host.world_transform(target).unwrap();
        assert!(world.translation.abs_diff_eq(Vec3::splat(5.0), 1e-4));
    }

    #[test]
    fn test_transform_events_in_order() {
        let (mut host, _, mut c) = setup(CoordinatorConfig::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        c.on_transform_event(move |e| log.borrow_mut().push(e.kind));
        c.process_pointer_event(&pointer(PointerEventType::Select, 1, Vec3::ONE), 0.0, &mut host);
        c.process_pointer_event(&pointer(PointerEventType::Move, 1, Vec3::ONE), 0.0, &mut host);
        c.process_pointer_event(&pointer(PointerEventType::Unselect, 1, Vec3::ONE), 0.0, &mut host);
        assert_eq!(
            *seen.borrow(),
            vec![
                TransformEventType::Begin,
                TransformEventType::Update,
                TransformEventType::End
            ]
        );
    }

    #[test]
    fn test_physics_paused_and_restored() {
        let (mut host, target, mut c) = setup(CoordinatorConfig::default());
        host.set_simulate_physics(target, true);
        host.set_gravity_enabled(target, true);
        host.set_linear_velocity(target, Vec3::X);

        c.process_pointer_event(&pointer(PointerEventType::Select, 1, Vec3::ONE), 0.0, &mut host);
        assert!(!host.is_simulating_physics(target));
        assert!(!host.is_gravity_enabled(target));
        assert_eq!(host.linear_velocity(target), Vec3::ZERO);

        c.process_pointer_event(&pointer(PointerEventType::Unselect, 1, Vec3::ONE), 0.0, &mut host);
        assert!(host.is_simulating_physics(target));
        assert!(host.is_gravity_enabled(target));
    }

    #[test]
    fn test_throw_applies_release_velocity() {
        let config = CoordinatorConfig::default().with_throwable(ThrowSettings::default());
        let (mut host, target, mut c) = setup(config);
        host.set_simulate_physics(target, true);
        host.set_gravity_enabled(target, true);

        c.process_pointer_event(&pointer(PointerEventType::Select, 1, Vec3::ONE), 0.0, &mut host);
        for i in 1..=8 {
            let t = i as f32 / 60.0;
            let p = Vec3::ONE + Vec3::new(120.0, 0.0, 0.0) * t;
            c.process_pointer_event(&pointer(PointerEventType::Move, 1, p), t, &mut host);
            c.sample_throwable(t, &host);
        }
        c.process_pointer_event(&pointer(PointerEventType::Unselect, 1, Vec3::ONE), 0.2, &mut host);

        let v = host.linear_velocity(target);
        assert!((v.x - 120.0).abs() < 1.0, "{v}");
        assert!(host.is_gravity_enabled(target));
        assert!(!c.velocity_tracker().unwrap().is_tracking());
    }

    #[test]
    fn test_throw_inverts_gravity_when_not_retained() {
        let (mut host, target, mut c) = setup(CoordinatorConfig::default());
        assert!(!c.is_throwable());
        c.set_throwable(Some(ThrowSettings {
            retain_gravity: false,
            ..Default::default()
        }));
        assert!(c.is_throwable());
        host.set_simulate_physics(target, true);
        host.set_gravity_enabled(target, true);

        c.process_pointer_event(&pointer(PointerEventType::Select, 1, Vec3::ONE), 0.0, &mut host);
        c.sample_throwable(0.0, &host);
        c.process_pointer_event(&pointer(PointerEventType::Unselect, 1, Vec3::ONE), 0.1, &mut host);
        assert!(host.is_simulating_physics(target));
        assert!(!host.is_gravity_enabled(target));

        c.set_throwable(None);
        assert!(c.velocity_tracker().is_none());
        c.process_pointer_event(&pointer(PointerEventType::Select, 1, Vec3::ONE), 0.2, &mut host);
        c.process_pointer_event(&pointer(PointerEventType::Unselect, 1, Vec3::ONE), 0.3, &mut host);
        assert!(!host.is_gravity_enabled(target));
    }

    #[test]
    fn test_retarget_moves_new_component() {
        let (mut host, first, mut c) = setup(CoordinatorConfig::default());
        let second = host.add_body(2, Vec3::ZERO, ColliderShape::default());
        c.set_target(Some(second));
        assert_eq!(c.target(), Some(second));

        c.process_pointer_event(&pointer(PointerEventType::Select, 1, Vec3::ZERO), 0.0, &mut host);
        c.process_pointer_event(&pointer(PointerEventType::Move, 1, Vec3::splat(3.0)), 0.1, &mut host);
        assert!(host.position(second).abs_diff_eq(Vec3::splat(3.0), 1e-4));
        assert_eq!(host.position(first), Vec3::ONE);
    }

    #[test]
    fn test_removed_transform_listener_stops_hearing() {
        let (mut host, _, mut c) = setup(CoordinatorConfig::default());
        let seen = Rc::new(RefCell::new(0));
        let log = seen.clone();
        let id = c.on_transform_event(move |_| *log.borrow_mut() += 1);
        c.process_pointer_event(&pointer(PointerEventType::Select, 1, Vec3::ONE), 0.0, &mut host);
        assert!(c.remove_transform_listener(id));
        assert!(!c.remove_transform_listener(id));
        c.process_pointer_event(&pointer(PointerEventType::Unselect, 1, Vec3::ONE), 0.0, &mut host);
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn test_force_cancel_reports_each_point() {
        let (mut host, _, mut c) = setup(CoordinatorConfig::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        c.on_cancel_grab_event(move |e| log.borrow_mut().push(e.interactor_id));
        c.process_pointer_event(&pointer(PointerEventType::Select, 3, Vec3::ONE), 0.0, &mut host);
        c.process_pointer_event(&pointer(PointerEventType::Select, 5, Vec3::ONE), 0.0, &mut host);

        let cancels = c.force_cancel(&mut host);
        assert_eq!(cancels.len(), 2);
        assert_eq!(*seen.borrow(), vec![3, 5]);
        assert_eq!(c.num_grabbers(), 0);
        assert_eq!(c.active_role(), None);
    }

    #[test]
    fn test_multi_rejects_single_point_solver() {
        let (mut host, _, mut c) = setup(CoordinatorConfig::default());
        let rotate = TransformerConfig::OneGrabRotate(OneGrabRotateConfig::default()).build();
        let err = c
            .set_multi_grab_transformer(Some(rotate), 0.0, &mut host)
            .unwrap_err();
        assert!(matches!(
            err,
            GrabError::InvalidTransformer {
                role: TransformerRole::Multi,
                max_grab_points: 1
            }
        ));

        let bad = CoordinatorConfig::default().with_multi_grab_transformer(
            TransformerConfig::OneGrabTranslate(OneGrabTranslateConfig::default()),
        );
        assert!(GrabTransformCoordinator::new(CoordinatorId(1), None, &bad).is_err());
    }

    #[test]
    fn test_missing_target_is_noop() {
        let mut host = FakeHost::default();
        let mut c =
            GrabTransformCoordinator::new(CoordinatorId(0), None, &CoordinatorConfig::default())
                .unwrap();
        c.process_pointer_event(&pointer(PointerEventType::Select, 1, Vec3::ONE), 0.0, &mut host);
        assert_eq!(c.num_grabbers(), 1);
        assert_eq!(c.active_role(), None);
    }

    #[test]
    fn test_interactor_snap_moves_object_onto_hand() {
        let (mut host, target, mut c) = setup(CoordinatorConfig::default());
        c.process_pointer_event(&pointer(PointerEventType::Select, 1, Vec3::ONE), 0.0, &mut host);
        c.set_interactor_snap(Transform::IDENTITY, 0.0, 0.0, &host);
        assert!(c.is_interactor_snap_enabled());

        let hand = Vec3::new(20.0, 0.0, 0.0);
        c.process_pointer_event(&pointer(PointerEventType::Move, 1, hand), 0.1, &mut host);
        let world = host.world_transform(target).unwrap();
        assert!(world.translation.abs_diff_eq(hand, 1e-4));
    }

    #[test]
    fn test_move_snap_blends() {
        let (mut host, target, mut c) = setup(CoordinatorConfig::default());
        c.process_pointer_event(&pointer(PointerEventType::Select, 1, Vec3::ONE), 0.0, &mut host);
        c.set_interactor_snap(Transform::IDENTITY, 1.0, 0.0, &host);

        let hand = Vec3::new(11.0, 1.0, 1.0);
        c.process_pointer_event(&pointer(PointerEventType::Move, 1, hand), 0.5, &mut host);
        let halfway = host.world_transform(target).unwrap().translation;
        assert!(halfway.abs_diff_eq(Vec3::new(6.0, 1.0, 1.0), 1e-3), "{halfway}");
    }

    #[test]
    fn test_snap_cleared_on_release() {
        let (mut host, _, mut c) = setup(CoordinatorConfig::default());
        c.process_pointer_event(&pointer(PointerEventType::Select, 1, Vec3::ONE), 0.0, &mut host);
        c.set_interactor_snap(Transform::IDENTITY, 0.0, 0.0, &host);
        c.process_pointer_event(&pointer(PointerEventType::Unselect, 1, Vec3::ONE), 0.0, &mut host);
        assert!(!c.is_interactor_snap_enabled());
    }
}
