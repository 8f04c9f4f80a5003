//! Grabbable objects
//!
//! A grabbable is a collider that detectors can find, plus the bookkeeping of
//! which grabbers hover and select it. Its transform is driven by the
//! coordinator it is attached to.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::events::{EventEmitter, ListenerId, PointerEvent, PointerEventType};
use crate::host::ColliderShape;
use crate::types::{
    ComponentId, CoordinatorId, DetectorKind, DetectorKinds, GrabbableId, GrabberId,
    InputMethod, InputMethods, InteractableState,
};

/// Serializable grabbable settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GrabbableConfig {
    /// Collider shape used for debug drawing and bounds fallback
    pub collider_shape: ColliderShape,
    /// Input methods that may grab this object
    pub allowed_input_methods: InputMethods,
    /// Detectors that may find this object
    pub allowed_detectors: DetectorKinds,
}

impl Default for GrabbableConfig {
    fn default() -> Self {
        Self {
            collider_shape: ColliderShape::default(),
            allowed_input_methods: InputMethods::hand(),
            allowed_detectors: DetectorKinds::all(),
        }
    }
}

impl GrabbableConfig {
    /// Set collider shape
    pub fn with_shape(mut self, shape: ColliderShape) -> Self {
        self.collider_shape = shape;
        self
    }

    /// Set allowed input methods
    pub fn with_input_methods(mut self, methods: InputMethods) -> Self {
        self.allowed_input_methods = methods;
        self
    }

    /// Set allowed detectors
    pub fn with_detectors(mut self, detectors: DetectorKinds) -> Self {
        self.allowed_detectors = detectors;
        self
    }
}

/// An object that can be hovered and grabbed
#[derive(Debug)]
pub struct Grabbable {
    id: GrabbableId,
    collider: ComponentId,
    collider_shape: ColliderShape,
    allowed_input_methods: InputMethods,
    allowed_detectors: DetectorKinds,
    coordinator: Option<CoordinatorId>,
    hovered_by: BTreeSet<GrabberId>,
    selected_by: BTreeSet<GrabberId>,
    state: InteractableState,
    pointer_events: EventEmitter<PointerEvent>,
}

impl Grabbable {
    /// Create a grabbable around a host collider
    pub fn new(id: GrabbableId, collider: ComponentId, config: GrabbableConfig) -> Self {
        Self {
            id,
            collider,
            collider_shape: config.collider_shape,
            allowed_input_methods: config.allowed_input_methods,
            allowed_detectors: config.allowed_detectors,
            coordinator: None,
            hovered_by: BTreeSet::new(),
            selected_by: BTreeSet::new(),
            state: InteractableState::Normal,
            pointer_events: EventEmitter::new(),
        }
    }

    /// Handle
    pub fn id(&self) -> GrabbableId {
        self.id
    }

    /// Collider component reported by overlap and trace queries
    pub fn collider(&self) -> ComponentId {
        self.collider
    }

    /// Collider shape
    pub fn collider_shape(&self) -> ColliderShape {
        self.collider_shape
    }

    /// Replace the collider shape
    pub fn set_collider_shape(&mut self, shape: ColliderShape) {
        self.collider_shape = shape;
    }

    /// Transform coordinator driving this object
    pub fn coordinator(&self) -> Option<CoordinatorId> {
        self.coordinator
    }

    pub(crate) fn set_coordinator(&mut self, coordinator: Option<CoordinatorId>) {
        self.coordinator = coordinator;
    }

    /// Current interaction state
    pub fn state(&self) -> InteractableState {
        self.state
    }

    /// Allowed input methods
    pub fn allowed_input_methods(&self) -> InputMethods {
        self.allowed_input_methods
    }

    /// Whether `method` may grab this object
    pub fn is_grab_input_method_allowed(&self, method: InputMethod) -> bool {
        self.allowed_input_methods.contains(method)
    }

    /// Allow or disallow an input method
    pub fn set_grab_input_method_allowed(&mut self, method: InputMethod, allowed: bool) {
        self.allowed_input_methods.set(method, allowed);
    }

    /// Allowed detectors
    pub fn allowed_detectors(&self) -> DetectorKinds {
        self.allowed_detectors
    }

    /// Whether a detector kind may find this object
    pub fn is_detector_allowed(&self, kind: DetectorKind) -> bool {
        self.allowed_detectors.allows(kind)
    }

    /// Allow or disallow a detector kind
    pub fn set_detector_allowed(&mut self, kind: DetectorKind, allowed: bool) {
        self.allowed_detectors.set(kind, allowed);
    }

    /// Whether `grabber` hovers this object
    pub fn is_hovered_by(&self, grabber: GrabberId) -> bool {
        self.hovered_by.contains(&grabber)
    }

    /// Whether `grabber` holds this object
    pub fn is_grabbed_by(&self, grabber: GrabberId) -> bool {
        self.selected_by.contains(&grabber)
    }

    /// Grabbers hovering, in id order
    pub fn hovered_by(&self) -> impl Iterator<Item = GrabberId> + '_ {
        self.hovered_by.iter().copied()
    }

    /// Grabbers holding, in id order
    pub fn selected_by(&self) -> impl Iterator<Item = GrabberId> + '_ {
        self.selected_by.iter().copied()
    }

    /// Observe pointer events delivered to this object
    pub fn on_pointer_event(&mut self, listener: impl FnMut(&PointerEvent) + 'static) -> ListenerId {
        self.pointer_events.subscribe(listener)
    }

    /// Stop observing
    pub fn remove_pointer_listener(&mut self, id: ListenerId) -> bool {
        self.pointer_events.unsubscribe(id)
    }

    /// Update relations and state from an event, then notify observers
    pub(crate) fn process_pointer_event(&mut self, event: &PointerEvent) {
        let grabber = event.interactor;
        match event.kind {
            PointerEventType::Hover => {
                self.hovered_by.insert(grabber);
            }
            PointerEventType::Unhover => {
                self.hovered_by.remove(&grabber);
            }
            PointerEventType::Select => {
                self.selected_by.insert(grabber);
            }
            PointerEventType::Unselect => {
                self.selected_by.remove(&grabber);
            }
            PointerEventType::Cancel => {
                self.hovered_by.remove(&grabber);
                self.selected_by.remove(&grabber);
            }
            PointerEventType::Move => {}
        }

        self.state = if !self.selected_by.is_empty() {
            InteractableState::Select
        } else if !self.hovered_by.is_empty() {
            InteractableState::Hover
        } else {
            InteractableState::Normal
        };

        self.pointer_events.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{Pose, Transform};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn event(kind: PointerEventType, grabber: u32) -> PointerEvent {
        PointerEvent {
            identifier: grabber,
            kind,
            pose: Pose::IDENTITY,
            interactor: GrabberId(grabber),
            interactable: GrabbableId(0),
            interactor_transform: Transform::IDENTITY,
        }
    }

    #[test]
    fn test_state_follows_relations() {
        let mut g = Grabbable::new(GrabbableId(0), ComponentId(1), GrabbableConfig::default());
        g.process_pointer_event(&event(PointerEventType::Hover, 1));
        assert_eq!(g.state(), InteractableState::Hover);
        g.process_pointer_event(&event(PointerEventType::Select, 2));
        assert_eq!(g.state(), InteractableState::Select);
        assert!(g.is_grabbed_by(GrabberId(2)));
        g.process_pointer_event(&event(PointerEventType::Cancel, 2));
        assert_eq!(g.state(), InteractableState::Hover);
        g.process_pointer_event(&event(PointerEventType::Unhover, 1));
        assert_eq!(g.state(), InteractableState::Normal);
    }

    #[test]
    fn test_observers_see_events() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut g = Grabbable::new(GrabbableId(0), ComponentId(1), GrabbableConfig::default());
        let log = seen.clone();
        g.on_pointer_event(move |e| log.borrow_mut().push(e.kind));
        g.process_pointer_event(&event(PointerEventType::Hover, 1));
        g.process_pointer_event(&event(PointerEventType::Move, 1));
        assert_eq!(
            *seen.borrow(),
            vec![PointerEventType::Hover, PointerEventType::Move]
        );
    }

    #[test]
    fn test_input_method_toggle() {
        let mut g = Grabbable::new(GrabbableId(0), ComponentId(1), GrabbableConfig::default());
        assert!(g.is_grab_input_method_allowed(InputMethod::Palm));
        g.set_grab_input_method_allowed(InputMethod::Palm, false);
        assert!(!g.is_grab_input_method_allowed(InputMethod::Palm));
        assert!(g.is_grab_input_method_allowed(InputMethod::Pinch));
        g.set_detector_allowed(DetectorKind::Ray, false);
        assert!(!g.is_detector_allowed(DetectorKind::Ray));
    }
}
