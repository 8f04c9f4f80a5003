//! N-point rigid solve with centroid tracking

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::Transformer;
use crate::constants::DEGENERATE_EPSILON;
use crate::geometry::{
    constrained_position_relative, constrained_rotation_relative, constrained_scale,
    find_between_normals, parent_position_constraints, parent_scale_constraint,
    rotation_twist_around_axis, AxisConstraint, ConstraintAxes,
};
use crate::pose_collection::GrabPose;
use crate::transform::{TargetTransform, Transform};

/// Constraints applied by [`FreeTransformer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeTransformerConfig {
    /// Translation limits, in parent space
    pub position: ConstraintAxes,
    /// Rotation limits in degrees, in parent space
    pub rotation: ConstraintAxes,
    /// Uniform scale limits
    pub scale: AxisConstraint,
    /// Position limits are offsets from the initial relative position
    pub relative_position: bool,
    /// Scale limits are factors of the initial relative scale
    pub relative_scale: bool,
}

impl Default for FreeTransformerConfig {
    fn default() -> Self {
        Self {
            position: ConstraintAxes::default(),
            rotation: ConstraintAxes::default(),
            scale: AxisConstraint::default(),
            relative_position: true,
            relative_scale: true,
        }
    }
}

impl FreeTransformerConfig {
    /// Set position limits
    pub fn with_position(mut self, position: ConstraintAxes) -> Self {
        self.position = position;
        self
    }

    /// Set rotation limits
    pub fn with_rotation(mut self, rotation: ConstraintAxes) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set scale limits
    pub fn with_scale(mut self, scale: AxisConstraint) -> Self {
        self.scale = scale;
        self
    }
}

/// Frame-to-frame memory of one grab point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabPointDelta {
    /// Offset from the point to the centroid last frame
    pub prev_centroid_offset: Vec3,
    /// Offset from the point to the centroid this frame
    pub centroid_offset: Vec3,
    /// Orientation last frame
    pub prev_rotation: Quat,
    /// Orientation this frame, kept in the same hemisphere as the previous one
    pub rotation: Quat,
}

impl GrabPointDelta {
    /// Start tracking a point
    pub fn new(centroid_offset: Vec3, rotation: Quat) -> Self {
        Self {
            prev_centroid_offset: centroid_offset,
            centroid_offset,
            prev_rotation: rotation,
            rotation,
        }
    }

    /// Push a new sample
    pub fn update(&mut self, centroid_offset: Vec3, rotation: Quat) {
        self.prev_centroid_offset = self.centroid_offset;
        self.centroid_offset = centroid_offset;
        self.prev_rotation = self.rotation;
        self.rotation = if rotation.dot(self.rotation) < 0.0 {
            -rotation
        } else {
            rotation
        };
    }

    /// Both offsets are long enough to define a direction
    pub fn is_valid_axis(&self) -> bool {
        self.centroid_offset.length_squared() > DEGENERATE_EPSILON
            && self.prev_centroid_offset.length_squared() > DEGENERATE_EPSILON
    }
}

/// Moves, rotates and scales the target with the relative motion of every
/// selected grab point
///
/// With one point the object follows the point rigidly. With more, each point
/// contributes `1/N` of its own rotation plus an aiming correction from the
/// change in direction of its centroid offset, and the spread of the points
/// drives uniform scale.
#[derive(Debug, Clone, Default)]
pub struct FreeTransformer {
    config: FreeTransformerConfig,
    target_position_constraints: ConstraintAxes,
    target_scale_constraint: AxisConstraint,
    selected: Vec<GrabPose>,
    deltas: Vec<GrabPointDelta>,
    relative_centroid_to_target: Vec3,
    initial_world_rotation: Quat,
    last_rotation: Quat,
    last_scale: Vec3,
}

impl FreeTransformer {
    /// Create a solver with the given constraints
    pub fn new(config: FreeTransformerConfig) -> Self {
        Self {
            target_position_constraints: config.position,
            target_scale_constraint: config.scale,
            config,
            ..Default::default()
        }
    }

    /// Current configuration
    pub fn config(&self) -> &FreeTransformerConfig {
        &self.config
    }

    /// Number of tracked grab points
    pub fn grab_count(&self) -> usize {
        self.deltas.len()
    }

    fn centroid(poses: &[GrabPose]) -> Vec3 {
        if poses.is_empty() {
            return Vec3::ZERO;
        }
        poses.iter().map(|p| p.pose.position).sum::<Vec3>() / poses.len() as f32
    }

    fn delta_rotation(&self) -> Quat {
        let mut combined = Quat::IDENTITY;
        if self.deltas.is_empty() {
            return combined;
        }
        let fraction = 1.0 / self.deltas.len() as f32;
        for delta in &self.deltas {
            let mut rot_delta = delta.rotation * delta.prev_rotation.inverse();
            if delta.is_valid_axis() {
                let aim = delta.centroid_offset.normalize();
                let dir_delta =
                    find_between_normals(delta.prev_centroid_offset.normalize(), aim);
                combined = Quat::IDENTITY.slerp(dir_delta, fraction) * combined;
                rot_delta = rotation_twist_around_axis(rot_delta, aim);
            }
            combined = Quat::IDENTITY.slerp(rot_delta, fraction) * combined;
        }
        combined.normalize()
    }

    fn delta_scale(&self) -> f32 {
        if self.deltas.is_empty() {
            return 1.0;
        }
        let fraction = 1.0 / self.deltas.len() as f32;
        self.deltas
            .iter()
            .map(|d| {
                if d.is_valid_axis() {
                    (d.centroid_offset.length_squared() / d.prev_centroid_offset.length_squared())
                        .sqrt()
                        * fraction
                } else {
                    fraction
                }
            })
            .sum()
    }
}

impl Transformer for FreeTransformer {
    fn begin_transform(&mut self, poses: &[GrabPose], target: &TargetTransform) {
        self.selected = poses.to_vec();
        let centroid = Self::centroid(&self.selected);
        self.deltas = self
            .selected
            .iter()
            .map(|p| GrabPointDelta::new(centroid - p.pose.position, p.pose.orientation))
            .collect();
        self.relative_centroid_to_target = target
            .world
            .inverse_transform_vector(centroid - target.world.translation);
        self.initial_world_rotation = target.world.rotation;
        self.last_rotation = Quat::IDENTITY;
        self.last_scale = target.relative.scale;
    }

    fn update_transform(&mut self, poses: &[GrabPose], target: &TargetTransform) -> Transform {
        if self.selected.is_empty() {
            return target.relative;
        }

        for selected in &mut self.selected {
            if let Some(live) = poses.iter().find(|p| p.identifier == selected.identifier) {
                *selected = *live;
            }
        }
        let centroid = Self::centroid(&self.selected);
        for (delta, pose) in self.deltas.iter_mut().zip(&self.selected) {
            delta.update(centroid - pose.pose.position, pose.pose.orientation);
        }

        self.last_scale = if self.selected.len() <= 1 {
            target.relative.scale
        } else {
            self.last_scale * self.delta_scale()
        };
        let scale = constrained_scale(self.last_scale, &self.target_scale_constraint);

        self.last_rotation = (self.delta_rotation() * self.last_rotation).normalize();
        let world_rotation = constrained_rotation_relative(
            self.last_rotation * self.initial_world_rotation,
            &self.config.rotation,
            &target.parent_world,
        );
        let rotation = target.parent_world.inverse_transform_rotation(world_rotation);

        // Re-express the centroid offset with the freshly solved rotation and scale
        let solved_world = Transform::new(
            target.world.translation,
            world_rotation,
            target.parent_world.scale * scale,
        );
        let world_position = constrained_position_relative(
            centroid - solved_world.transform_vector(self.relative_centroid_to_target),
            &self.target_position_constraints,
            &target.parent_world,
        );
        let position = target.parent_world.inverse_transform_point(world_position);

        Transform::new(position, rotation, scale)
    }

    fn end_transform(&mut self, target: &TargetTransform) -> Transform {
        self.selected.clear();
        self.deltas.clear();
        target.relative
    }

    fn update_constraints(&mut self, target: &TargetTransform) {
        self.target_position_constraints = if self.config.relative_position {
            parent_position_constraints(&self.config.position, target.relative.translation)
        } else {
            self.config.position
        };
        self.target_scale_constraint = if self.config.relative_scale {
            parent_scale_constraint(&self.config.scale, target.relative.scale.x)
        } else {
            self.config.scale
        };
    }

    fn is_active(&self) -> bool {
        !self.deltas.is_empty()
    }

    fn max_grab_points(&self) -> i32 {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Axis;
    use crate::transform::Pose;
    use approx::assert_abs_diff_eq;

    fn grab(id: u32, position: Vec3) -> GrabPose {
        GrabPose::new(id, Pose::new(position, Quat::IDENTITY))
    }

    fn target_at(position: Vec3) -> TargetTransform {
        TargetTransform::from_world(Transform::from_translation(position), Transform::IDENTITY)
    }

    /// Apply a solved relative transform back onto the snapshot
    fn advance(target: &TargetTransform, relative: Transform) -> TargetTransform {
        TargetTransform::from_world(relative.then(&target.parent_world), target.parent_world)
    }

    #[test]
    fn test_single_point_translates_rigidly() {
        let mut solver = FreeTransformer::default();
        let mut target = target_at(Vec3::new(1.0, 1.0, 1.0));
        solver.begin_transform(&[grab(1, Vec3::new(2.0, 1.0, 1.0))], &target);
        assert!(solver.is_active());

        let mut point = Vec3::new(2.0, 1.0, 1.0);
        for _ in 0..5 {
            point += Vec3::new(0.5, -0.25, 1.0);
            let result = solver.update_transform(&[grab(1, point)], &target);
            assert_eq!(result.scale, Vec3::ONE);
            target = advance(&target, result);
        }

        let expected = Vec3::new(1.0, 1.0, 1.0) + (point - Vec3::new(2.0, 1.0, 1.0));
        assert!(
            target.world.translation.abs_diff_eq(expected, 1e-4),
            "{} != {}",
            target.world.translation,
            expected
        );
        assert!(target.world.rotation.abs_diff_eq(Quat::IDENTITY, 1e-5));
    }

    #[test]
    fn test_single_point_follows_orientation() {
        let mut solver = FreeTransformer::default();
        let target = target_at(Vec3::ZERO);
        solver.begin_transform(&[grab(1, Vec3::new(1.0, 0.0, 0.0))], &target);

        let turned = GrabPose::new(
            1,
            Pose::new(Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_z(0.5)),
        );
        let result = solver.update_transform(&[turned], &target);
        let (axis, angle) = result.rotation.to_axis_angle();
        assert_abs_diff_eq!(angle, 0.5, epsilon = 1e-4);
        assert!(axis.abs_diff_eq(Vec3::Z, 1e-4));
        // rotation pivots about the grab point, so the origin swings around it
        let expected = Vec3::new(1.0, 0.0, 0.0) - Quat::from_rotation_z(0.5) * Vec3::X;
        assert!(result.translation.abs_diff_eq(expected, 1e-4), "{}", result.translation);
    }

    #[test]
    fn test_two_points_spread_scales_uniformly() {
        let mut solver = FreeTransformer::default();
        let target = target_at(Vec3::ZERO);
        solver.begin_transform(
            &[grab(1, Vec3::new(-1.0, 0.0, 0.0)), grab(2, Vec3::new(1.0, 0.0, 0.0))],
            &target,
        );
        let result = solver.update_transform(
            &[grab(1, Vec3::new(-2.0, 0.0, 0.0)), grab(2, Vec3::new(2.0, 0.0, 0.0))],
            &target,
        );
        assert!(result.scale.abs_diff_eq(Vec3::splat(2.0), 1e-4), "{}", result.scale);
        assert!(result.translation.abs_diff_eq(Vec3::ZERO, 1e-4));
    }

    #[test]
    fn test_two_points_rotate_about_centroid() {
        let mut solver = FreeTransformer::default();
        let target = target_at(Vec3::ZERO);
        solver.begin_transform(
            &[grab(1, Vec3::new(-1.0, 0.0, 0.0)), grab(2, Vec3::new(1.0, 0.0, 0.0))],
            &target,
        );
        // swing both hands a quarter turn about Z
        let result = solver.update_transform(
            &[grab(1, Vec3::new(0.0, -1.0, 0.0)), grab(2, Vec3::new(0.0, 1.0, 0.0))],
            &target,
        );
        let forward = result.rotation * Vec3::X;
        assert!(forward.abs_diff_eq(Vec3::Y, 1e-3), "{forward}");
        assert!(result.scale.abs_diff_eq(Vec3::ONE, 1e-4));
    }

    #[test]
    fn test_position_constraint_relative_to_initial() {
        let config = FreeTransformerConfig::default().with_position(
            ConstraintAxes::default().with_axis(Axis::X, AxisConstraint::new(-1.0, 1.0)),
        );
        let mut solver = FreeTransformer::new(config);
        let target = target_at(Vec3::new(10.0, 0.0, 0.0));
        solver.update_constraints(&target);
        solver.begin_transform(&[grab(1, Vec3::new(10.0, 0.0, 0.0))], &target);

        let result = solver.update_transform(&[grab(1, Vec3::new(20.0, 3.0, 0.0))], &target);
        assert_abs_diff_eq!(result.translation.x, 11.0, epsilon = 1e-4);
        assert_abs_diff_eq!(result.translation.y, 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_end_resets() {
        let mut solver = FreeTransformer::default();
        let target = target_at(Vec3::ZERO);
        solver.begin_transform(&[grab(1, Vec3::X)], &target);
        let result = solver.end_transform(&target);
        assert_eq!(result, target.relative);
        assert!(!solver.is_active());
        assert_eq!(solver.update_transform(&[grab(1, Vec3::Y)], &target), target.relative);
    }

    #[test]
    fn test_degenerate_points_do_not_produce_nan() {
        let mut solver = FreeTransformer::default();
        let target = target_at(Vec3::ZERO);
        solver.begin_transform(&[grab(1, Vec3::ZERO), grab(2, Vec3::ZERO)], &target);
        let result = solver.update_transform(&[grab(1, Vec3::ZERO), grab(2, Vec3::ZERO)], &target);
        assert!(result.translation.is_finite());
        assert!(result.rotation.is_finite());
        assert!(result.scale.abs_diff_eq(Vec3::ONE, 1e-6));
    }
}
