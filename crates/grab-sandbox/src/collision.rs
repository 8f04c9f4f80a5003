//! Brute-force intersection tests for the sandbox world

use glam::Vec3;

use grab_core::{ColliderShape, Transform};

/// Entry distance and surface normal of a ray hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayIntersection {
    /// Distance along the unit direction
    pub distance: f32,
    /// World normal at the entry point
    pub normal: Vec3,
}

/// Ray against a sphere. Rays starting inside report a hit at distance 0.
pub fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<RayIntersection> {
    let dir = direction.try_normalize()?;
    let to_center = center - origin;
    if to_center.length_squared() <= radius * radius {
        return Some(RayIntersection {
            distance: 0.0,
            normal: (-to_center).try_normalize().unwrap_or(-dir),
        });
    }
    let along = to_center.dot(dir);
    if along < 0.0 {
        return None;
    }
    let dist_sq = to_center.length_squared() - along * along;
    if dist_sq > radius * radius {
        return None;
    }
    let distance = along - (radius * radius - dist_sq).sqrt();
    let point = origin + dir * distance;
    Some(RayIntersection {
        distance,
        normal: (point - center).normalize_or_zero(),
    })
}

/// Ray against an oriented box, slab method in box space
pub fn ray_box(
    origin: Vec3,
    direction: Vec3,
    transform: &Transform,
    extent: Vec3,
) -> Option<RayIntersection> {
    let dir = direction.try_normalize()?;
    let half = extent * transform.scale.abs();
    let local_origin = transform.rotation.inverse() * (origin - transform.translation);
    let local_dir = transform.rotation.inverse() * dir;

    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    let mut entry_axis = 0;
    for axis in 0..3 {
        let o = local_origin[axis];
        let d = local_dir[axis];
        if d.abs() < 1e-8 {
            if o < -half[axis] || o > half[axis] {
                return None;
            }
            continue;
        }
        let mut t0 = (-half[axis] - o) / d;
        let mut t1 = (half[axis] - o) / d;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 > t_min {
            t_min = t0;
            entry_axis = axis;
        }
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }
    if t_max < 0.0 {
        return None;
    }

    let distance = t_min.max(0.0);
    let mut local_normal = Vec3::ZERO;
    local_normal[entry_axis] = -local_dir[entry_axis].signum();
    Some(RayIntersection {
        distance,
        normal: transform.rotation * local_normal,
    })
}

/// Ray against any collider shape
pub fn ray_shape(
    origin: Vec3,
    direction: Vec3,
    shape: &ColliderShape,
    transform: &Transform,
) -> Option<RayIntersection> {
    match shape {
        ColliderShape::Box { extent } => ray_box(origin, direction, transform, *extent),
        _ => {
            let bounds = shape.bounding_sphere(transform);
            ray_sphere(origin, direction, bounds.center, bounds.radius)
        }
    }
}

fn closest_point_on_box(point: Vec3, transform: &Transform, extent: Vec3) -> Vec3 {
    let half = extent * transform.scale.abs();
    let local = transform.rotation.inverse() * (point - transform.translation);
    transform.translation + transform.rotation * local.clamp(-half, half)
}

/// Whether two placed shapes overlap
///
/// Sphere and box pairs are exact; anything involving a generic shape, and
/// box against box, is tested by bounding sphere.
pub fn shapes_overlap(a: &ColliderShape, a_at: &Transform, b: &ColliderShape, b_at: &Transform) -> bool {
    match (a, b) {
        (ColliderShape::Sphere { .. }, ColliderShape::Box { extent }) => {
            let sphere = a.bounding_sphere(a_at);
            let closest = closest_point_on_box(sphere.center, b_at, *extent);
            closest.distance_squared(sphere.center) <= sphere.radius * sphere.radius
        }
        (ColliderShape::Box { .. }, ColliderShape::Sphere { .. }) => shapes_overlap(b, b_at, a, a_at),
        _ => {
            let sa = a.bounding_sphere(a_at);
            let sb = b.bounding_sphere(b_at);
            sa.center.distance(sb.center) <= sa.radius + sb.radius
        }
    }
}
