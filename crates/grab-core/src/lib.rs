//! Grab Interaction Core
//!
//! Hover/select arbitration and transform solving for tracked hands and
//! controllers:
//! - Hand, ray and distance detectors nominating grab candidates
//! - Per-grabber grab state machine over input methods
//! - Per-object transform coordination with single and multi point solvers
//! - Far grab motion blending, interactor snapping and throw velocity
//!
//! # Module Structure
//!
//! ```text
//! grab-core/
//! ├── types.rs, transform.rs, geometry.rs   # Ids, math, constraint helpers
//! ├── events.rs, pose_collection.rs         # Event shapes and grab point records
//! ├── host.rs                               # Traits the engine implements
//! ├── detector/                             # Hand, Ray, Distance
//! ├── transformer/                          # Free, OneGrabRotate, OneGrabTranslate
//! ├── motion.rs, throwable.rs               # Far grab blenders, release velocity
//! ├── grabbable.rs, coordinator.rs          # Object side
//! ├── grabber.rs                            # Hand/controller side
//! └── session.rs                            # Owner of every entity
//! ```

pub mod config;
pub mod constants;
pub mod coordinator;
pub mod detector;
pub mod error;
pub mod events;
pub mod geometry;
pub mod grabbable;
pub mod grabber;
pub mod host;
pub mod motion;
pub mod pose_collection;
pub mod registry;
pub mod session;
pub mod throwable;
pub mod transform;
pub mod transformer;
pub mod types;

#[cfg(test)]
mod test_host;

// Re-exports for convenience
pub use config::{
    DebugConfig, DistanceDetectorConfig, GrabberConfig, HandDetectorConfig, RayDetectorConfig,
    SessionConfig,
};
pub use coordinator::{CoordinatorConfig, GrabTransformCoordinator};
pub use detector::{DebugShape, GrabDetector, RayHit};
pub use error::{GrabError, GrabResult};
pub use events::{
    CancelGrabEvent, ListenerId, PointerEvent, PointerEventType, TransformEvent,
    TransformEventType,
};
pub use grabbable::{Grabbable, GrabbableConfig};
pub use grabber::GrabCoordinator;
pub use host::{
    BoundingSphere, ColliderShape, Host, OverlapVolume, PoseSource, RigidBodyControl, SceneGraph,
    SpatialQuery, TraceHit,
};
pub use motion::{MotionConfig, PullToHandConfig, ResponseCurve};
pub use session::InteractionSession;
pub use throwable::{ThrowSettings, VelocityEstimator, VelocityTracker};
pub use transform::{Pose, TargetTransform, Transform};
pub use transformer::{GrabTransformer, TransformerConfig, TransformerRole};
pub use types::{
    ComponentId, CoordinatorId, DetectorKind, DetectorKinds, GrabbableId, GrabberId, InputMethod,
    InputMethods, InteractableState, InteractorState, MultiGrabBehavior,
};
