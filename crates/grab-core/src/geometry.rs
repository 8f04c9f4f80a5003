//! Geometry utilities for grab solving
//!
//! Axis-constraint clamping, swing/twist decomposition and the parent-space
//! constraint generation used by the transform solvers. Rotation constraints
//! are expressed in degrees; Euler angles are (roll about X, pitch about Y,
//! yaw about Z) with rotation = yaw * pitch * roll.

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::DEGENERATE_EPSILON;
use crate::transform::Transform;

/// Principal axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Axis {
    /// X axis
    #[default]
    X,
    /// Y axis
    Y,
    /// Z axis
    Z,
}

impl Axis {
    /// Unit vector along the axis
    pub fn unit_vector(&self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    /// All axes
    pub fn all() -> &'static [Axis] {
        &[Axis::X, Axis::Y, Axis::Z]
    }
}

/// Optional clamp range on a single scalar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct AxisConstraint {
    /// Whether the range is applied
    pub enabled: bool,
    /// Lower bound
    pub min: f32,
    /// Upper bound
    pub max: f32,
}

impl AxisConstraint {
    /// Enabled constraint over `[min, max]`
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            enabled: true,
            min,
            max,
        }
    }

    /// Clamp `value` when enabled, return it unchanged otherwise
    pub fn apply(&self, value: f32) -> f32 {
        if self.enabled {
            // max/min instead of clamp so an inverted range cannot panic
            value.max(self.min).min(self.max)
        } else {
            value
        }
    }

    /// Shift both bounds by `offset` when enabled
    pub fn offset_by(&self, offset: f32) -> Self {
        if !self.enabled {
            return *self;
        }
        Self::new(self.min + offset, self.max + offset)
    }

    /// Scale both bounds by `factor` when enabled
    pub fn scaled_by(&self, factor: f32) -> Self {
        if !self.enabled {
            return *self;
        }
        Self::new(self.min * factor, self.max * factor)
    }
}

/// Per-axis constraints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ConstraintAxes {
    /// X axis range
    pub x: AxisConstraint,
    /// Y axis range
    pub y: AxisConstraint,
    /// Z axis range
    pub z: AxisConstraint,
}

impl ConstraintAxes {
    /// Set a constraint on one axis
    pub fn with_axis(mut self, axis: Axis, constraint: AxisConstraint) -> Self {
        *self.axis_mut(axis) = constraint;
        self
    }

    /// Constraint on an axis
    pub fn axis(&self, axis: Axis) -> &AxisConstraint {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    /// Mutable constraint on an axis
    pub fn axis_mut(&mut self, axis: Axis) -> &mut AxisConstraint {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }

    /// True if any axis is enabled
    pub fn has_constraints(&self) -> bool {
        self.x.enabled || self.y.enabled || self.z.enabled
    }

    fn apply(&self, v: Vec3) -> Vec3 {
        Vec3::new(self.x.apply(v.x), self.y.apply(v.y), self.z.apply(v.z))
    }
}

/// Re-anchor position constraints at the object's initial position
pub fn parent_position_constraints(constraints: &ConstraintAxes, initial: Vec3) -> ConstraintAxes {
    ConstraintAxes {
        x: constraints.x.offset_by(initial.x),
        y: constraints.y.offset_by(initial.y),
        z: constraints.z.offset_by(initial.z),
    }
}

/// Re-anchor a scale constraint at the object's initial scale
pub fn parent_scale_constraint(constraint: &AxisConstraint, initial_scale: f32) -> AxisConstraint {
    constraint.scaled_by(initial_scale)
}

/// Clamp each enabled axis of `position`
pub fn constrained_position(position: Vec3, constraints: &ConstraintAxes) -> Vec3 {
    constraints.apply(position)
}

/// Clamp `position` in the local space of `frame`
pub fn constrained_position_relative(
    position: Vec3,
    constraints: &ConstraintAxes,
    frame: &Transform,
) -> Vec3 {
    if !constraints.has_constraints() {
        return position;
    }
    let local = frame.inverse_transform_point(position);
    frame.transform_point(constraints.apply(local))
}

/// Clamp the Euler angles (degrees) of `rotation` on enabled axes
pub fn constrained_rotation(rotation: Quat, constraints: &ConstraintAxes) -> Quat {
    if !constraints.has_constraints() {
        return rotation;
    }
    let (yaw, pitch, roll) = rotation.to_euler(EulerRot::ZYX);
    let roll = constraints.x.apply(roll.to_degrees()).to_radians();
    let pitch = constraints.y.apply(pitch.to_degrees()).to_radians();
    let yaw = constraints.z.apply(yaw.to_degrees()).to_radians();
    Quat::from_euler(EulerRot::ZYX, yaw, pitch, roll)
}

/// Clamp the Euler angles of `rotation` measured in the local space of `frame`
pub fn constrained_rotation_relative(
    rotation: Quat,
    constraints: &ConstraintAxes,
    frame: &Transform,
) -> Quat {
    if !constraints.has_constraints() {
        return rotation;
    }
    let local = frame.inverse_transform_rotation(rotation);
    frame.transform_rotation(constrained_rotation(local, constraints))
}

/// Clamp every scale component to the constraint range
pub fn constrained_scale(scale: Vec3, constraint: &AxisConstraint) -> Vec3 {
    Vec3::new(
        constraint.apply(scale.x),
        constraint.apply(scale.y),
        constraint.apply(scale.z),
    )
}

/// Signed twist angle (radians, in `[-PI, PI]`) of `rotation` around `axis`
pub fn twist_angle(rotation: Quat, axis: Vec3) -> f32 {
    let xyz = Vec3::new(rotation.x, rotation.y, rotation.z);
    unwind_radians(2.0 * xyz.dot(axis).atan2(rotation.w))
}

/// Twist component of `rotation` around `axis`
pub fn rotation_twist_around_axis(rotation: Quat, axis: Vec3) -> Quat {
    Quat::from_axis_angle(axis, twist_angle(rotation, axis))
}

/// Roll back the part of `rotation` that tilts `axis` further than
/// `max_angle` degrees away from itself
pub fn constrained_rotation_from_axis(rotation: Quat, axis: Vec3, max_angle: f32) -> Quat {
    let Some(rotated) = (rotation * axis).try_normalize() else {
        return rotation;
    };
    let between = find_between_normals(axis, rotated);
    let (swing_axis, angle) = between.to_axis_angle();
    let max = max_angle.to_radians();
    if angle > max {
        Quat::from_axis_angle(swing_axis, angle - max).inverse() * rotation
    } else {
        rotation
    }
}

/// Keep only the twist of `rotation` around `axis`, clamped to `range` degrees
pub fn constrained_twist_rotation(rotation: Quat, axis: Vec3, range: &AxisConstraint) -> Quat {
    if !range.enabled {
        return rotation;
    }
    let twist = range.apply(twist_angle(rotation, axis).to_degrees());
    Quat::from_axis_angle(axis, twist.to_radians())
}

/// Shortest rotation taking unit vector `from` onto unit vector `to`
pub fn find_between_normals(from: Vec3, to: Vec3) -> Quat {
    Quat::from_rotation_arc(from, to)
}

/// Project `v` onto the plane with unit normal `normal`
pub fn project_on_plane(v: Vec3, normal: Vec3) -> Vec3 {
    v - normal * v.dot(normal)
}

/// True when `v` is too short to define a direction
pub fn is_degenerate(v: Vec3) -> bool {
    v.length_squared() <= DEGENERATE_EPSILON
}

/// Closest point on a sphere's surface to an infinite line
///
/// When the line passes through the sphere, the entry point nearest the line
/// origin is returned.
pub fn sphere_dist_to_line(center: Vec3, radius: f32, origin: Vec3, direction: Vec3) -> Vec3 {
    let dir = direction.normalize_or_zero();
    let along = (center - origin).dot(dir);
    let projected = origin + dir * along;
    let to_line = projected - center;
    let dist_sq = to_line.length_squared();
    if dist_sq <= radius * radius {
        let half_chord = (radius * radius - dist_sq).max(0.0).sqrt();
        origin + dir * (along - half_chord)
    } else {
        center + to_line * (radius / dist_sq.sqrt())
    }
}

fn unwind_radians(mut a: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    while a > PI {
        a -= TAU;
    }
    while a < -PI {
        a += TAU;
    }
    a
}
