//! Single point translation

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{find_pose, Transformer};
use crate::geometry::{constrained_position, parent_position_constraints, ConstraintAxes};
use crate::pose_collection::GrabPose;
use crate::transform::{TargetTransform, Transform};

/// Translation limits for [`OneGrabTranslateTransformer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneGrabTranslateConfig {
    /// Per-axis limits in parent space
    pub constraints: ConstraintAxes,
    /// Limits are offsets from the initial relative position
    pub relative_constraints: bool,
}

impl Default for OneGrabTranslateConfig {
    fn default() -> Self {
        Self {
            constraints: ConstraintAxes::default(),
            relative_constraints: true,
        }
    }
}

impl OneGrabTranslateConfig {
    /// Set the limits
    pub fn with_constraints(mut self, constraints: ConstraintAxes) -> Self {
        self.constraints = constraints;
        self
    }
}

/// Slides the target with the grab point, keeping rotation and scale
#[derive(Debug, Clone, Default)]
pub struct OneGrabTranslateTransformer {
    config: OneGrabTranslateConfig,
    target_constraints: ConstraintAxes,
    active: bool,
    cached_pose: GrabPose,
    grab_offset: Vec3,
}

impl OneGrabTranslateTransformer {
    /// Create a solver
    pub fn new(config: OneGrabTranslateConfig) -> Self {
        Self {
            target_constraints: config.constraints,
            config,
            ..Default::default()
        }
    }

    /// Current configuration
    pub fn config(&self) -> &OneGrabTranslateConfig {
        &self.config
    }
}

impl Transformer for OneGrabTranslateTransformer {
    fn begin_transform(&mut self, poses: &[GrabPose], target: &TargetTransform) {
        let Some(first) = poses.first() else {
            return;
        };
        self.active = true;
        self.cached_pose = *first;
        self.grab_offset = target
            .parent_world
            .inverse_transform_vector(target.world.translation - first.pose.position);
    }

    fn update_transform(&mut self, poses: &[GrabPose], target: &TargetTransform) -> Transform {
        if poses.is_empty() {
            return target.relative;
        }
        let current = find_pose(poses, self.cached_pose.identifier, self.cached_pose);
        let local = target
            .parent_world
            .inverse_transform_point(current.pose.position);
        let position = constrained_position(local + self.grab_offset, &self.target_constraints);
        Transform::new(position, target.relative.rotation, target.relative.scale)
    }

    fn end_transform(&mut self, target: &TargetTransform) -> Transform {
        self.active = false;
        target.relative
    }

    fn update_constraints(&mut self, target: &TargetTransform) {
        self.target_constraints = if self.config.relative_constraints {
            parent_position_constraints(&self.config.constraints, target.relative.translation)
        } else {
            self.config.constraints
        };
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn max_grab_points(&self) -> i32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Axis, AxisConstraint};
    use crate::transform::Pose;
    use glam::Quat;

    fn grab(position: Vec3) -> GrabPose {
        GrabPose::new(7, Pose::new(position, Quat::from_rotation_y(1.0)))
    }

    #[test]
    fn test_keeps_offset_and_rotation() {
        let world = Transform::from_rotation_translation(Quat::from_rotation_z(0.3), Vec3::ONE);
        let target = TargetTransform::from_world(world, Transform::IDENTITY);
        let mut solver = OneGrabTranslateTransformer::default();
        solver.begin_transform(&[grab(Vec3::new(2.0, 1.0, 1.0))], &target);

        let result = solver.update_transform(&[grab(Vec3::new(2.0, 4.0, 1.0))], &target);
        assert!(result.translation.abs_diff_eq(Vec3::new(1.0, 4.0, 1.0), 1e-5));
        assert_eq!(result.rotation, target.relative.rotation);
    }

    #[test]
    fn test_relative_constraint_clamps_around_start() {
        let config = OneGrabTranslateConfig::default().with_constraints(
            ConstraintAxes::default().with_axis(Axis::Y, AxisConstraint::new(0.0, 2.0)),
        );
        let target = TargetTransform::from_world(
            Transform::from_translation(Vec3::new(0.0, 10.0, 0.0)),
            Transform::IDENTITY,
        );
        let mut solver = OneGrabTranslateTransformer::new(config);
        solver.update_constraints(&target);
        solver.begin_transform(&[grab(Vec3::new(0.0, 10.0, 0.0))], &target);

        let up = solver.update_transform(&[grab(Vec3::new(5.0, 50.0, 0.0))], &target);
        assert!(up.translation.abs_diff_eq(Vec3::new(5.0, 12.0, 0.0), 1e-5));
        let down = solver.update_transform(&[grab(Vec3::new(0.0, -50.0, 0.0))], &target);
        assert!(down.translation.abs_diff_eq(Vec3::new(0.0, 10.0, 0.0), 1e-5));
    }

    #[test]
    fn test_parent_space() {
        let parent = Transform::from_translation(Vec3::new(100.0, 0.0, 0.0));
        let world = Transform::from_translation(Vec3::new(101.0, 0.0, 0.0));
        let target = TargetTransform::from_world(world, parent);
        let mut solver = OneGrabTranslateTransformer::default();
        solver.begin_transform(&[grab(Vec3::new(101.0, 0.0, 0.0))], &target);
        let result = solver.update_transform(&[grab(Vec3::new(103.0, 0.0, 0.0))], &target);
        assert!(result.translation.abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-5));
        assert!(solver.is_active());
        solver.end_transform(&target);
        assert!(!solver.is_active());
    }
}
