//! Host collaborator traits
//!
//! The engine owns scene components, broad-phase queries, skeletal poses and
//! rigid-body integration. The interaction core only reads and writes them
//! through these traits, once per frame, on one thread.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::{GRABBABLE_BOX_EXTENT, GRABBABLE_SPHERE_RADIUS};
use crate::transform::{Pose, Transform};
use crate::types::{ComponentId, GrabberId};

/// Bounding sphere in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    /// Center
    pub center: Vec3,
    /// Radius
    pub radius: f32,
}

/// Collider shape, selected once when the collider is set up
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    /// Sphere around the component origin
    Sphere {
        /// Radius (local units)
        radius: f32,
    },
    /// Box centred on the component origin
    Box {
        /// Half extents (local units)
        extent: Vec3,
    },
    /// Arbitrary shape, known only by its bounds
    Generic {
        /// Local-space bounds
        bounds: BoundingSphere,
    },
}

impl Default for ColliderShape {
    fn default() -> Self {
        ColliderShape::Sphere {
            radius: GRABBABLE_SPHERE_RADIUS,
        }
    }
}

impl ColliderShape {
    /// Default box collider
    pub fn default_box() -> Self {
        ColliderShape::Box {
            extent: Vec3::splat(GRABBABLE_BOX_EXTENT),
        }
    }

    /// World-space bounding sphere of the shape placed at `transform`
    pub fn bounding_sphere(&self, transform: &Transform) -> BoundingSphere {
        let max_scale = transform.scale.abs().max_element();
        match self {
            ColliderShape::Sphere { radius } => BoundingSphere {
                center: transform.translation,
                radius: radius * max_scale,
            },
            ColliderShape::Box { extent } => BoundingSphere {
                center: transform.translation,
                radius: (*extent * transform.scale.abs()).length(),
            },
            ColliderShape::Generic { bounds } => BoundingSphere {
                center: transform.transform_point(bounds.center),
                radius: bounds.radius * max_scale,
            },
        }
    }
}

/// Shape placed in the world for an overlap query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlapVolume {
    /// Shape
    pub shape: ColliderShape,
    /// World placement
    pub transform: Transform,
}

/// One line trace hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceHit {
    /// World hit location
    pub point: Vec3,
    /// Surface normal at the hit
    pub normal: Vec3,
    /// Component that was hit
    pub component: ComponentId,
}

/// Scene component access
pub trait SceneGraph {
    /// Whether the component still exists
    fn is_alive(&self, component: ComponentId) -> bool;

    /// World transform of a component
    fn world_transform(&self, component: ComponentId) -> Option<Transform>;

    /// World transform of the component's attach parent, identity when unattached
    fn parent_world_transform(&self, component: ComponentId) -> Transform;

    /// Move a component relative to its attach parent
    fn set_relative_transform(&mut self, component: ComponentId, transform: Transform);

    /// World bounds of a component
    fn bounds(&self, component: ComponentId) -> Option<BoundingSphere>;
}

/// Engine supplied broad-phase queries
pub trait SpatialQuery {
    /// Components overlapping the volume
    fn overlapping_components(&self, volume: &OverlapVolume) -> Vec<ComponentId>;

    /// Hits along a segment, ordered by distance from `origin`
    fn line_trace(&self, origin: Vec3, direction: Vec3, length: f32) -> Vec<TraceHit>;
}

/// Tracked hand and controller poses
pub trait PoseSource {
    /// Forward-ray pose of the grabber's hand or controller
    fn pointer_pose(&self, grabber: GrabberId) -> Option<Pose>;

    /// World transform of a skeletal joint, e.g. the thumb tip
    fn bone_transform(&self, grabber: GrabberId, socket: &str) -> Option<Transform>;
}

/// Rigid-body flags and velocities; integration stays with the engine
pub trait RigidBodyControl {
    /// Whether the body is simulated
    fn is_simulating_physics(&self, component: ComponentId) -> bool;

    /// Enable or disable simulation
    fn set_simulate_physics(&mut self, component: ComponentId, simulate: bool);

    /// Whether gravity applies
    fn is_gravity_enabled(&self, component: ComponentId) -> bool;

    /// Enable or disable gravity
    fn set_gravity_enabled(&mut self, component: ComponentId, enabled: bool);

    /// Current linear velocity
    fn linear_velocity(&self, component: ComponentId) -> Vec3;

    /// Set linear velocity
    fn set_linear_velocity(&mut self, component: ComponentId, velocity: Vec3);

    /// Set angular velocity (radians per second)
    fn set_angular_velocity(&mut self, component: ComponentId, velocity: Vec3);
}

/// Everything the interaction core needs from its host
pub trait Host: SceneGraph + SpatialQuery + PoseSource + RigidBodyControl {}

impl<T: SceneGraph + SpatialQuery + PoseSource + RigidBodyControl> Host for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_sphere_scales() {
        let t = Transform::from_translation(Vec3::X).with_scale(Vec3::new(1.0, 3.0, 1.0));
        let sphere = ColliderShape::Sphere { radius: 2.0 }.bounding_sphere(&t);
        assert_eq!(sphere.center, Vec3::X);
        assert_eq!(sphere.radius, 6.0);

        let cube = ColliderShape::Box {
            extent: Vec3::ONE,
        }
        .bounding_sphere(&Transform::IDENTITY);
        assert!((cube.radius - 3f32.sqrt()).abs() < 1e-5);
    }
}
