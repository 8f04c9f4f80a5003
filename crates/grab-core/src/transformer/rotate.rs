//! Single point rotation about the target origin

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::{find_pose, Transformer};
use crate::geometry::{
    constrained_rotation, constrained_rotation_from_axis, constrained_twist_rotation,
    find_between_normals, is_degenerate, project_on_plane, Axis, AxisConstraint, ConstraintAxes,
};
use crate::pose_collection::GrabPose;
use crate::transform::{TargetTransform, Transform};

/// Rotation limits for [`OneGrabRotateTransformer`]
///
/// Exactly one policy applies:
/// - `use_angle_from_axis` with an axis: limit the tilt of that axis
/// - no axis: per-axis Euler clamp with `rotation_constraint`
/// - an axis: rotation is locked to it and its twist clamped to `axis_angle_range`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneGrabRotateConfig {
    /// Local axis the rotation is locked to or measured from
    pub rotation_axis: Option<Axis>,
    /// Limit deviation from `rotation_axis` instead of locking to it
    pub use_angle_from_axis: bool,
    /// Largest allowed tilt of `rotation_axis`, degrees
    pub max_angle_from_axis: f32,
    /// Euler limits (degrees) used when no axis is set
    pub rotation_constraint: ConstraintAxes,
    /// Twist range (degrees) around `rotation_axis`
    pub axis_angle_range: AxisConstraint,
}

impl Default for OneGrabRotateConfig {
    fn default() -> Self {
        Self {
            rotation_axis: Some(Axis::X),
            use_angle_from_axis: false,
            max_angle_from_axis: 0.0,
            rotation_constraint: ConstraintAxes::default(),
            axis_angle_range: AxisConstraint::default(),
        }
    }
}

impl OneGrabRotateConfig {
    /// Lock rotation to an axis (or free it with `None`)
    pub fn with_axis(mut self, axis: Option<Axis>) -> Self {
        self.rotation_axis = axis;
        self
    }

    /// Clamp the twist around the locked axis
    pub fn with_axis_angle_range(mut self, range: AxisConstraint) -> Self {
        self.axis_angle_range = range;
        self
    }

    /// Limit the tilt of the axis to `max_angle` degrees
    pub fn with_max_angle_from_axis(mut self, max_angle: f32) -> Self {
        self.use_angle_from_axis = true;
        self.max_angle_from_axis = max_angle;
        self
    }
}

/// Rotates the target about its own origin, keeping its position and scale
///
/// The rotation is the arc between the pivot-to-grab-point direction at begin
/// and the same direction now, composed onto the initial relative rotation.
#[derive(Debug, Clone, Default)]
pub struct OneGrabRotateTransformer {
    config: OneGrabRotateConfig,
    active: bool,
    cached_pose: GrabPose,
    cached_pose_vector: Vec3,
    cached_relative_rotation: Quat,
}

impl OneGrabRotateTransformer {
    /// Create a solver
    pub fn new(config: OneGrabRotateConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Current configuration
    pub fn config(&self) -> &OneGrabRotateConfig {
        &self.config
    }

    fn grab_axis(&self, v: Vec3) -> Vec3 {
        match self.config.rotation_axis {
            Some(axis) if !self.config.use_angle_from_axis => {
                project_on_plane(v, axis.unit_vector()).normalize_or_zero()
            }
            _ => v.normalize_or_zero(),
        }
    }
}

impl Transformer for OneGrabRotateTransformer {
    fn begin_transform(&mut self, poses: &[GrabPose], target: &TargetTransform) {
        let Some(first) = poses.first() else {
            return;
        };
        self.active = true;
        self.cached_pose = *first;
        self.cached_pose_vector = target
            .parent_world
            .inverse_transform_vector_no_scale(first.pose.position - target.world.translation);
        self.cached_relative_rotation = target.relative.rotation;
    }

    fn update_transform(&mut self, poses: &[GrabPose], target: &TargetTransform) -> Transform {
        if poses.is_empty() {
            return target.relative;
        }
        let current = find_pose(poses, self.cached_pose.identifier, self.cached_pose);

        let pivot = Transform::from_rotation_translation(
            target.parent_world.rotation * self.cached_relative_rotation,
            target.world.translation,
        );
        let start = pivot.inverse_transform_vector(
            target
                .parent_world
                .transform_vector_no_scale(self.cached_pose_vector),
        );
        let now = pivot.inverse_transform_point(current.pose.position);
        if is_degenerate(start) || is_degenerate(now) {
            return target.relative;
        }

        let start_axis = self.grab_axis(start);
        let current_axis = self.grab_axis(now);
        // Projection onto the lock plane can still collapse a vector
        if is_degenerate(start_axis) || is_degenerate(current_axis) {
            return target.relative;
        }
        let unconstrained =
            self.cached_relative_rotation * find_between_normals(start_axis, current_axis);

        let rotation = match (self.config.rotation_axis, self.config.use_angle_from_axis) {
            (Some(axis), true) => constrained_rotation_from_axis(
                unconstrained,
                axis.unit_vector(),
                self.config.max_angle_from_axis,
            ),
            (None, true) => unconstrained,
            (None, false) => constrained_rotation(unconstrained, &self.config.rotation_constraint),
            (Some(axis), false) => constrained_twist_rotation(
                unconstrained,
                axis.unit_vector(),
                &self.config.axis_angle_range,
            ),
        };

        Transform::new(target.relative.translation, rotation, target.relative.scale)
    }

    fn end_transform(&mut self, target: &TargetTransform) -> Transform {
        self.active = false;
        target.relative
    }

    fn update_constraints(&mut self, _target: &TargetTransform) {
        // limits are always expressed in the target's own frame
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn max_grab_points(&self) -> i32 {
        1
    }
}
