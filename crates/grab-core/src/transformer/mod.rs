//! Transform solvers
//!
//! A solver maps the selected grab points of one grabbable, together with a
//! snapshot of its target, to a new transform relative to the target's attach
//! parent. The set of solvers is closed, so [`GrabTransformer`] dispatches over
//! an enum rather than boxed trait objects.

mod free;
mod rotate;
mod translate;

pub use free::*;
pub use rotate::*;
pub use translate::*;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pose_collection::GrabPose;
use crate::transform::{TargetTransform, Transform};

/// Common solver contract
pub trait Transformer {
    /// Capture the initial state for the given selected points
    fn begin_transform(&mut self, poses: &[GrabPose], target: &TargetTransform);

    /// Compute the new relative transform of the target
    fn update_transform(&mut self, poses: &[GrabPose], target: &TargetTransform) -> Transform;

    /// Finish solving and return the final relative transform
    fn end_transform(&mut self, target: &TargetTransform) -> Transform;

    /// Re-derive parent-space constraints from the target's initial pose
    fn update_constraints(&mut self, target: &TargetTransform);

    /// True between begin and end
    fn is_active(&self) -> bool;

    /// Maximum number of grab points, -1 for unbounded
    fn max_grab_points(&self) -> i32;
}

/// Slot a solver is assigned to on a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformerRole {
    /// Used while exactly one point selects
    Single,
    /// Used while two or more points select
    Multi,
}

impl fmt::Display for TransformerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformerRole::Single => write!(f, "single grab"),
            TransformerRole::Multi => write!(f, "multi grab"),
        }
    }
}

/// Any of the available solvers
#[derive(Debug, Clone)]
pub enum GrabTransformer {
    /// N-point rigid solve
    Free(FreeTransformer),
    /// Single point rotation about the object origin
    OneGrabRotate(OneGrabRotateTransformer),
    /// Single point translation
    OneGrabTranslate(OneGrabTranslateTransformer),
}

impl Default for GrabTransformer {
    fn default() -> Self {
        GrabTransformer::Free(FreeTransformer::default())
    }
}

impl GrabTransformer {
    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            GrabTransformer::Free(_) => "Free",
            GrabTransformer::OneGrabRotate(_) => "OneGrabRotate",
            GrabTransformer::OneGrabTranslate(_) => "OneGrabTranslate",
        }
    }

    fn inner(&self) -> &dyn Transformer {
        match self {
            GrabTransformer::Free(t) => t,
            GrabTransformer::OneGrabRotate(t) => t,
            GrabTransformer::OneGrabTranslate(t) => t,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Transformer {
        match self {
            GrabTransformer::Free(t) => t,
            GrabTransformer::OneGrabRotate(t) => t,
            GrabTransformer::OneGrabTranslate(t) => t,
        }
    }
}

impl Transformer for GrabTransformer {
    fn begin_transform(&mut self, poses: &[GrabPose], target: &TargetTransform) {
        self.inner_mut().begin_transform(poses, target);
    }

    fn update_transform(&mut self, poses: &[GrabPose], target: &TargetTransform) -> Transform {
        self.inner_mut().update_transform(poses, target)
    }

    fn end_transform(&mut self, target: &TargetTransform) -> Transform {
        self.inner_mut().end_transform(target)
    }

    fn update_constraints(&mut self, target: &TargetTransform) {
        self.inner_mut().update_constraints(target);
    }

    fn is_active(&self) -> bool {
        self.inner().is_active()
    }

    fn max_grab_points(&self) -> i32 {
        self.inner().max_grab_points()
    }
}

impl From<FreeTransformer> for GrabTransformer {
    fn from(t: FreeTransformer) -> Self {
        GrabTransformer::Free(t)
    }
}

impl From<OneGrabRotateTransformer> for GrabTransformer {
    fn from(t: OneGrabRotateTransformer) -> Self {
        GrabTransformer::OneGrabRotate(t)
    }
}

impl From<OneGrabTranslateTransformer> for GrabTransformer {
    fn from(t: OneGrabTranslateTransformer) -> Self {
        GrabTransformer::OneGrabTranslate(t)
    }
}

/// Serializable description of a solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransformerConfig {
    /// [`FreeTransformer`]
    Free(FreeTransformerConfig),
    /// [`OneGrabRotateTransformer`]
    OneGrabRotate(OneGrabRotateConfig),
    /// [`OneGrabTranslateTransformer`]
    OneGrabTranslate(OneGrabTranslateConfig),
}

impl Default for TransformerConfig {
    fn default() -> Self {
        TransformerConfig::Free(FreeTransformerConfig::default())
    }
}

impl TransformerConfig {
    /// Instantiate the solver
    pub fn build(&self) -> GrabTransformer {
        match self {
            TransformerConfig::Free(c) => FreeTransformer::new(c.clone()).into(),
            TransformerConfig::OneGrabRotate(c) => OneGrabRotateTransformer::new(c.clone()).into(),
            TransformerConfig::OneGrabTranslate(c) => {
                OneGrabTranslateTransformer::new(c.clone()).into()
            }
        }
    }
}

/// Find the live pose for `identifier`, falling back to `cached`
pub(crate) fn find_pose(poses: &[GrabPose], identifier: u32, cached: GrabPose) -> GrabPose {
    poses
        .iter()
        .find(|p| p.identifier == identifier)
        .copied()
        .unwrap_or(cached)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_grab_points() {
        assert_eq!(GrabTransformer::default().max_grab_points(), -1);
        let rotate = TransformerConfig::OneGrabRotate(OneGrabRotateConfig::default()).build();
        assert_eq!(rotate.max_grab_points(), 1);
        let translate =
            TransformerConfig::OneGrabTranslate(OneGrabTranslateConfig::default()).build();
        assert_eq!(translate.max_grab_points(), 1);
        assert_eq!(translate.display_name(), "OneGrabTranslate");
    }

    #[test]
    fn test_role_display() {
        assert_eq!(TransformerRole::Multi.to_string(), "multi grab");
    }
}
