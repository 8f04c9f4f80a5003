//! Distance detector
//!
//! A large proximity sphere around the grabber narrowed to a cone around the
//! pointer. Objects are scored by the angle between the pointer and the
//! closest point of their bounds to the pointer line.

use glam::Vec3;

use super::{push_unique, DebugShape, DetectorContext, GrabDetector};
use crate::config::DistanceDetectorConfig;
use crate::geometry::sphere_dist_to_line;
use crate::host::{ColliderShape, OverlapVolume};
use crate::transform::Transform;
use crate::types::{DetectorKind, GrabbableId, InputMethod, InputMethods};

/// Cone detector for far grabs
#[derive(Debug, Clone)]
pub struct DistanceDetector {
    frustum_radius: f32,
    frustum_angle: f32,
    hovered: Vec<GrabbableId>,
    candidate: Option<GrabbableId>,
    selecting: bool,
    origin: Vec3,
    direction: Vec3,
}

impl DistanceDetector {
    /// Create from configuration
    pub fn new(config: &DistanceDetectorConfig) -> Self {
        Self {
            frustum_radius: config.frustum_radius,
            frustum_angle: config.frustum_angle,
            hovered: Vec::new(),
            candidate: None,
            selecting: false,
            origin: Vec3::ZERO,
            direction: Vec3::X,
        }
    }

    /// Full cone angle in degrees
    pub fn frustum_angle(&self) -> f32 {
        self.frustum_angle
    }

    /// Change the full cone angle
    pub fn set_frustum_angle(&mut self, degrees: f32) {
        self.frustum_angle = degrees;
    }

    /// Proximity sphere radius
    pub fn frustum_radius(&self) -> f32 {
        self.frustum_radius
    }
}

/// Angle in degrees between the pointer and the closest point of a sphere
pub fn angle_to_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> f32 {
    if origin.distance_squared(center) <= radius * radius {
        return 0.0;
    }
    let closest = sphere_dist_to_line(center, radius, origin, direction);
    let to_closest = (closest - origin).normalize_or_zero();
    if to_closest == Vec3::ZERO {
        return 0.0;
    }
    let dot = to_closest.dot(direction.normalize_or_zero()).clamp(-1.0, 1.0);
    dot.acos().to_degrees()
}

impl GrabDetector for DistanceDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Distance
    }

    fn tick(&mut self, ctx: &DetectorContext) {
        self.hovered.clear();
        let Some(pointer) = ctx.host.pointer_pose(ctx.grabber) else {
            if !self.selecting {
                self.candidate = None;
            }
            return;
        };
        self.origin = pointer.position;
        self.direction = pointer.orientation * Vec3::X;

        let volume = OverlapVolume {
            shape: ColliderShape::Sphere {
                radius: self.frustum_radius,
            },
            transform: Transform::from_translation(ctx.grabber_transform.translation),
        };
        let half_angle = self.frustum_angle * 0.5;
        let mut best: Option<(GrabbableId, f32)> = None;

        for component in ctx.host.overlapping_components(&volume) {
            let Some(grabbable) =
                ctx.accept(component, DetectorKind::Distance, InputMethods::all())
            else {
                continue;
            };
            if self.hovered.contains(&grabbable.id()) {
                continue;
            }
            let bounds = ctx.host.bounds(grabbable.collider()).or_else(|| {
                ctx.host
                    .world_transform(grabbable.collider())
                    .map(|t| grabbable.collider_shape().bounding_sphere(&t))
            });
            let Some(bounds) = bounds else {
                continue;
            };

            let angle = angle_to_sphere(self.origin, self.direction, bounds.center, bounds.radius);
            if angle > half_angle {
                continue;
            }
            push_unique(&mut self.hovered, grabbable.id());
            if best.is_none_or(|(_, a)| angle < a) {
                best = Some((grabbable.id(), angle));
            }
        }

        if !self.selecting {
            self.candidate = best.map(|(id, _)| id);
        }
    }

    fn hovered(&self) -> &[GrabbableId] {
        &self.hovered
    }

    fn grab_candidate(&self, _method: InputMethod) -> Option<GrabbableId> {
        self.candidate
    }

    fn select(&mut self, _method: InputMethod, _ctx: &DetectorContext) {
        self.selecting = true;
    }

    fn unselect(&mut self) {
        self.selecting = false;
    }

    fn is_selecting(&self) -> bool {
        self.selecting
    }

    fn debug_shapes(&self) -> Vec<DebugShape> {
        vec![DebugShape::Cone {
            origin: self.origin,
            direction: self.direction,
            length: self.frustum_radius,
            half_angle: self.frustum_angle * 0.5,
            state: self.debug_state(),
        }]
    }
}
