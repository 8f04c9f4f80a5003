//! Rigid transforms and poses
//!
//! Transforms compose child-then-parent: `child.then(&parent)` maps a point
//! from the child's local space through the parent into world space.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::KINDA_SMALL_NUMBER;

/// Position and orientation without scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World position
    pub position: Vec3,
    /// World orientation
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    /// Pose at the origin with no rotation
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    /// Create a new pose
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Convert to a unit-scale transform
    pub fn to_transform(&self) -> Transform {
        Transform::from_rotation_translation(self.orientation, self.position)
    }
}

impl From<Transform> for Pose {
    fn from(t: Transform) -> Self {
        Self::new(t.translation, t.rotation)
    }
}

/// Translation, rotation and per-axis scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation
    pub translation: Vec3,
    /// Rotation (unit quaternion)
    pub rotation: Quat,
    /// Per-axis scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a new transform
    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Pure translation
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Rotation and translation with unit scale
    pub fn from_rotation_translation(rotation: Quat, translation: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Set the scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Local +X axis in world space
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Local +Y axis in world space
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Local +Z axis in world space
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Local point to world
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * (self.scale * point) + self.translation
    }

    /// World point to local
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        (self.rotation.inverse() * (point - self.translation)) * safe_reciprocal(self.scale)
    }

    /// Local direction to world, including scale
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * (self.scale * vector)
    }

    /// Local direction to world, ignoring scale
    pub fn transform_vector_no_scale(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }

    /// World direction to local, including scale
    pub fn inverse_transform_vector(&self, vector: Vec3) -> Vec3 {
        (self.rotation.inverse() * vector) * safe_reciprocal(self.scale)
    }

    /// World direction to local, ignoring scale
    pub fn inverse_transform_vector_no_scale(&self, vector: Vec3) -> Vec3 {
        self.rotation.inverse() * vector
    }

    /// Local rotation to world
    pub fn transform_rotation(&self, rotation: Quat) -> Quat {
        self.rotation * rotation
    }

    /// World rotation to local
    pub fn inverse_transform_rotation(&self, rotation: Quat) -> Quat {
        self.rotation.inverse() * rotation
    }

    /// Apply `self`, then `parent`
    pub fn then(&self, parent: &Transform) -> Transform {
        Transform {
            translation: parent.transform_point(self.translation),
            rotation: (parent.rotation * self.rotation).normalize(),
            scale: parent.scale * self.scale,
        }
    }

    /// Express `self` in the local space of `other`
    ///
    /// `a.relative_to(&b).then(&b)` reproduces `a` for uniformly scaled `b`.
    pub fn relative_to(&self, other: &Transform) -> Transform {
        Transform {
            translation: other.inverse_transform_point(self.translation),
            rotation: (other.rotation.inverse() * self.rotation).normalize(),
            scale: self.scale * safe_reciprocal(other.scale),
        }
    }

    /// Inverse transform (exact for uniform scale)
    pub fn inverse(&self) -> Transform {
        Transform::IDENTITY.relative_to(self)
    }

    /// Blend translation and scale linearly, rotation along the shortest arc
    pub fn lerp(&self, other: &Transform, alpha: f32) -> Transform {
        Transform {
            translation: self.translation.lerp(other.translation, alpha),
            rotation: self.rotation.slerp(other.rotation, alpha).normalize(),
            scale: self.scale.lerp(other.scale, alpha),
        }
    }

    /// Component-wise comparison within a tolerance
    pub fn equals(&self, other: &Transform, tolerance: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, tolerance)
            && self.scale.abs_diff_eq(other.scale, tolerance)
            && self.rotation.dot(other.rotation).abs() >= 1.0 - tolerance
    }

    /// Drop scale
    pub fn pose(&self) -> Pose {
        Pose::from(*self)
    }
}

/// Reciprocal with near-zero components mapped to zero
fn safe_reciprocal(v: Vec3) -> Vec3 {
    let r = |c: f32| {
        if c.abs() <= KINDA_SMALL_NUMBER {
            0.0
        } else {
            1.0 / c
        }
    };
    Vec3::new(r(v.x), r(v.y), r(v.z))
}

/// Snapshot of a transform target taken from the host each solve
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetTransform {
    /// World transform of the target
    pub world: Transform,
    /// Transform relative to the attach parent
    pub relative: Transform,
    /// World transform of the attach parent (identity when unattached)
    pub parent_world: Transform,
}

impl TargetTransform {
    /// Build a snapshot from the target's world transform and its parent's
    pub fn from_world(world: Transform, parent_world: Transform) -> Self {
        Self {
            world,
            relative: world.relative_to(&parent_world),
            parent_world,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn sample() -> Transform {
        Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_z(FRAC_PI_2),
            Vec3::splat(2.0),
        )
    }

    #[test]
    fn test_point_round_trip() {
        let t = sample();
        let p = Vec3::new(-4.0, 0.5, 7.0);
        let back = t.inverse_transform_point(t.transform_point(p));
        assert!(back.abs_diff_eq(p, 1e-4), "{back} != {p}");
    }

    #[test]
    fn test_transform_point_order() {
        // scale, then rotate 90 degrees about Z, then translate
        let t = sample();
        let p = t.transform_point(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(1.0, 4.0, 3.0), 1e-4), "{p}");
    }

    #[test]
    fn test_relative_then_reproduces() {
        let parent = sample();
        let child = Transform::new(
            Vec3::new(5.0, -1.0, 0.0),
            Quat::from_rotation_x(0.3),
            Vec3::splat(4.0),
        );
        let rebuilt = child.relative_to(&parent).then(&parent);
        assert!(rebuilt.equals(&child, 1e-4), "{:?} != {:?}", rebuilt, child);
    }

    #[test]
    fn test_inverse() {
        let t = sample();
        let identity = t.then(&t.inverse());
        assert!(identity.equals(&Transform::IDENTITY, 1e-4), "{:?}", identity);
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = Transform::IDENTITY;
        let b = sample();
        assert!(a.lerp(&b, 0.0).equals(&a, 1e-5));
        assert!(a.lerp(&b, 1.0).equals(&b, 1e-5));
        let mid = a.lerp(&b, 0.5);
        assert!(mid.translation.abs_diff_eq(Vec3::new(0.5, 1.0, 1.5), 1e-5));
    }

    #[test]
    fn test_zero_scale_does_not_produce_nan() {
        let t = Transform::IDENTITY.with_scale(Vec3::new(0.0, 1.0, 1.0));
        let local = t.inverse_transform_point(Vec3::new(3.0, 1.0, 1.0));
        assert!(local.is_finite());
    }

    #[test]
    fn test_target_transform_relative() {
        let parent = Transform::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let world = Transform::from_translation(Vec3::new(12.0, 1.0, 0.0));
        let target = TargetTransform::from_world(world, parent);
        assert!(target.relative.translation.abs_diff_eq(Vec3::new(2.0, 1.0, 0.0), 1e-5));
    }
}
