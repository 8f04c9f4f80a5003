//! Pointer, transform and cancel events with per-component observer lists

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transform::{Pose, Transform};
use crate::types::{CoordinatorId, GrabbableId, GrabberId};

/// Kind of pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerEventType {
    /// Grabber started hovering
    Hover,
    /// Grabber stopped hovering
    Unhover,
    /// Grabber grabbed
    Select,
    /// Grabber released
    Unselect,
    /// Grabber moved while grabbing
    Move,
    /// Grab was cancelled
    Cancel,
}

impl PointerEventType {
    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            PointerEventType::Hover => "Hover",
            PointerEventType::Unhover => "Unhover",
            PointerEventType::Select => "Select",
            PointerEventType::Unselect => "Unselect",
            PointerEventType::Move => "Move",
            PointerEventType::Cancel => "Cancel",
        }
    }
}

/// Unit of communication from a grabber to a grabbable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Grab point identifier (the posting grabber's id)
    pub identifier: u32,
    /// Event kind
    pub kind: PointerEventType,
    /// Grab point pose
    pub pose: Pose,
    /// Posting grabber
    pub interactor: GrabberId,
    /// Receiving grabbable
    pub interactable: GrabbableId,
    /// World transform of the posting grabber's root
    pub interactor_transform: Transform,
}

/// Kind of transform event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformEventType {
    /// A solver began
    Begin,
    /// A solver produced a new pose
    Update,
    /// A solver ended
    End,
}

/// Emitted by a transform coordinator around each solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformEvent {
    /// Event kind
    pub kind: TransformEventType,
    /// Emitting coordinator
    pub coordinator: CoordinatorId,
}

/// Asks a grabber to drop its grab on a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelGrabEvent {
    /// Grab point identifier being cancelled
    pub interactor_id: u32,
    /// Coordinator that cancelled
    pub coordinator: CoordinatorId,
}

/// Subscription handle returned by [`EventEmitter::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Box<dyn FnMut(&E)>;

/// Ordered list of observers for one event type
pub struct EventEmitter<E> {
    listeners: Vec<(ListenerId, Listener<E>)>,
    next_id: u64,
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E> EventEmitter<E> {
    /// Create an empty emitter
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Add a listener; it is called in subscription order
    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Deliver an event to every listener
    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    /// Number of listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True if nobody listens
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_emit_in_order_and_unsubscribe() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut emitter = EventEmitter::<u32>::new();

        let a = {
            let log = log.clone();
            emitter.subscribe(move |e| log.borrow_mut().push(("a", *e)))
        };
        {
            let log = log.clone();
            emitter.subscribe(move |e| log.borrow_mut().push(("b", *e)));
        }

        emitter.emit(&1);
        assert!(emitter.unsubscribe(a));
        assert!(!emitter.unsubscribe(a));
        emitter.emit(&2);

        assert_eq!(*log.borrow(), vec![("a", 1), ("b", 1), ("b", 2)]);
        assert_eq!(emitter.len(), 1);
    }
}
