//! Error types for configuration and registration calls
//!
//! Per-frame operations never fail; they degrade to no-ops when a dependency
//! is missing.

use crate::transformer::TransformerRole;
use crate::types::{CoordinatorId, DetectorKind, GrabbableId, GrabberId};

/// Errors returned by session configuration calls
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GrabError {
    /// No grabber with this id
    #[error("Grabber not found: {0}")]
    UnknownGrabber(GrabberId),

    /// No grabbable with this id
    #[error("Grabbable not found: {0}")]
    UnknownGrabbable(GrabbableId),

    /// No coordinator with this id
    #[error("Transform coordinator not found: {0}")]
    UnknownCoordinator(CoordinatorId),

    /// Transformer cannot serve the requested role
    #[error("Transformer accepting {max_grab_points} grab point(s) cannot fill the {role} role")]
    InvalidTransformer {
        /// Requested role
        role: TransformerRole,
        /// Points the transformer accepts
        max_grab_points: i32,
    },

    /// Detector kind disabled on the grabber
    #[error("Detector {0:?} is not allowed on this grabber")]
    DetectorNotAllowed(DetectorKind),
}

/// Result alias for grab-core
pub type GrabResult<T> = Result<T, GrabError>;
