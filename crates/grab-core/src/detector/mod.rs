//! Grab detectors
//!
//! Each detector finds hover candidates with its own geometric heuristic and
//! nominates a grab candidate per input method. A grabber owns one of each
//! and arbitrates between them.

mod distance;
mod hand;
mod ray;

pub use distance::*;
pub use hand::*;
pub use ray::*;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::grabbable::Grabbable;
use crate::host::{ColliderShape, Host};
use crate::registry::GrabbableRegistry;
use crate::transform::Transform;
use crate::types::{
    ComponentId, DetectorKind, GrabbableId, GrabberId, InputMethods, InteractableState,
    InteractorState, MultiGrabBehavior,
};

/// Read-only view of the world a detector ticks against
pub struct DetectorContext<'a> {
    /// Ticking grabber
    pub grabber: GrabberId,
    /// World transform of the grabber root
    pub grabber_transform: Transform,
    /// Input methods the grabber may use
    pub allowed_input_methods: InputMethods,
    /// Host queries
    pub host: &'a dyn Host,
    /// Grabbables and coordinators
    pub registry: &'a GrabbableRegistry,
}

impl<'a> DetectorContext<'a> {
    /// Grabbable owning a component, if `kind` may consider it for `methods`
    ///
    /// Ray and distance detection skip objects already held by another
    /// grabber. Hand detection defers to the object's multi grab policy and
    /// only skips held objects that keep their first grabber.
    pub fn accept(
        &self,
        component: ComponentId,
        kind: DetectorKind,
        methods: InputMethods,
    ) -> Option<&'a Grabbable> {
        let id = self.registry.find_by_component(component)?;
        let grabbable = self.registry.grabbable(id)?;
        if !grabbable.is_detector_allowed(kind) {
            return None;
        }
        let usable = methods.intersection(self.allowed_input_methods);
        if !grabbable.allowed_input_methods().intersects(usable) {
            return None;
        }

        let held_by_other =
            self.registry.num_grabbers(id) >= 1 && !grabbable.is_grabbed_by(self.grabber);
        let excluded = match kind {
            DetectorKind::Hand => {
                held_by_other
                    && self.registry.multi_grab_behavior(id)
                        == Some(MultiGrabBehavior::SingleGrabFirstRetained)
            }
            DetectorKind::Ray | DetectorKind::Distance => held_by_other,
        };
        (!excluded).then_some(grabbable)
    }

    /// World position of a grabbable's collider
    pub fn collider_position(&self, grabbable: &Grabbable) -> Option<Vec3> {
        self.host
            .world_transform(grabbable.collider())
            .map(|t| t.translation)
    }
}

/// Something a host renderer may draw for debugging
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DebugShape {
    /// Detection volume
    Volume {
        /// Shape
        shape: ColliderShape,
        /// World placement
        transform: Transform,
        /// Owning grabber's detector state
        state: InteractorState,
    },
    /// Ray segment
    Line {
        /// Segment start
        start: Vec3,
        /// Segment end
        end: Vec3,
        /// Detector state
        state: InteractorState,
    },
    /// Detection cone
    Cone {
        /// Apex
        origin: Vec3,
        /// Unit axis
        direction: Vec3,
        /// Slant length
        length: f32,
        /// Half angle in degrees
        half_angle: f32,
        /// Detector state
        state: InteractorState,
    },
    /// Grabbable collider
    Collider {
        /// Shape
        shape: ColliderShape,
        /// World placement
        transform: Transform,
        /// Grabbable state
        state: InteractableState,
    },
}

/// Common detector contract
pub trait GrabDetector {
    /// Detector kind
    fn kind(&self) -> DetectorKind;

    /// Recompute hover set and candidates
    fn tick(&mut self, ctx: &DetectorContext);

    /// Grabbables currently hovered, without duplicates
    fn hovered(&self) -> &[GrabbableId];

    /// Best grabbable for an input method
    fn grab_candidate(&self, method: crate::types::InputMethod) -> Option<GrabbableId>;

    /// A grab started through this detector
    fn select(&mut self, method: crate::types::InputMethod, ctx: &DetectorContext);

    /// The grab ended
    fn unselect(&mut self);

    /// Whether a grab through this detector is running
    fn is_selecting(&self) -> bool;

    /// Volumes and rays for debug drawing
    fn debug_shapes(&self) -> Vec<DebugShape>;

    /// State used to tint debug shapes
    fn debug_state(&self) -> InteractorState {
        if self.is_selecting() {
            InteractorState::Select
        } else if !self.hovered().is_empty() {
            InteractorState::Hover
        } else {
            InteractorState::Normal
        }
    }
}

/// First detector in Hand > Ray > Distance order that is hovering something
pub fn highest_priority(hovering: &[DetectorKind]) -> Option<DetectorKind> {
    DetectorKind::priority_order()
        .iter()
        .copied()
        .find(|kind| hovering.contains(kind))
}

fn push_unique(list: &mut Vec<GrabbableId>, id: GrabbableId) {
    if !list.contains(&id) {
        list.push(id);
    }
}
