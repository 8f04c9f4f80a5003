//! In-memory host used by unit tests

use std::collections::HashMap;

use glam::Vec3;

use crate::host::{
    BoundingSphere, ColliderShape, OverlapVolume, PoseSource, RigidBodyControl, SceneGraph,
    SpatialQuery, TraceHit,
};
use crate::transform::{Pose, Transform};
use crate::types::{ComponentId, GrabberId};

#[derive(Debug, Clone)]
pub(crate) struct FakeBody {
    pub transform: Transform,
    pub parent: Option<ComponentId>,
    pub shape: Option<ColliderShape>,
    pub alive: bool,
    pub simulating: bool,
    pub gravity: bool,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

#[derive(Debug, Default)]
pub(crate) struct FakeHost {
    pub bodies: HashMap<ComponentId, FakeBody>,
    pub pointers: HashMap<GrabberId, Pose>,
    pub bones: HashMap<GrabberId, Transform>,
}

impl FakeHost {
    /// Body with a collider
    pub fn add_body(&mut self, id: u64, position: Vec3, shape: ColliderShape) -> ComponentId {
        self.insert(id, position, Some(shape))
    }

    /// Component without a collider, e.g. a grabber root
    pub fn add_point(&mut self, id: u64, position: Vec3) -> ComponentId {
        self.insert(id, position, None)
    }

    fn insert(&mut self, id: u64, position: Vec3, shape: Option<ColliderShape>) -> ComponentId {
        let component = ComponentId(id);
        self.bodies.insert(
            component,
            FakeBody {
                transform: Transform::from_translation(position),
                parent: None,
                shape,
                alive: true,
                simulating: false,
                gravity: false,
                linear_velocity: Vec3::ZERO,
                angular_velocity: Vec3::ZERO,
            },
        );
        component
    }

    pub fn move_to(&mut self, component: ComponentId, transform: Transform) {
        if let Some(body) = self.bodies.get_mut(&component) {
            body.transform = transform;
        }
    }

    pub fn position(&self, component: ComponentId) -> Vec3 {
        self.bodies
            .get(&component)
            .map_or(Vec3::ZERO, |b| b.transform.translation)
    }

    pub fn kill(&mut self, component: ComponentId) {
        if let Some(body) = self.bodies.get_mut(&component) {
            body.alive = false;
        }
    }

    fn colliders(&self) -> impl Iterator<Item = (ComponentId, BoundingSphere)> + '_ {
        self.bodies.iter().filter_map(|(id, body)| {
            let shape = body.shape?;
            body.alive
                .then(|| (*id, shape.bounding_sphere(&body.transform)))
        })
    }
}

impl SceneGraph for FakeHost {
    fn is_alive(&self, component: ComponentId) -> bool {
        self.bodies.get(&component).is_some_and(|b| b.alive)
    }

    fn world_transform(&self, component: ComponentId) -> Option<Transform> {
        self.bodies
            .get(&component)
            .filter(|b| b.alive)
            .map(|b| b.transform)
    }

    fn parent_world_transform(&self, component: ComponentId) -> Transform {
        self.bodies
            .get(&component)
            .and_then(|b| b.parent)
            .and_then(|p| self.world_transform(p))
            .unwrap_or_default()
    }

    fn set_relative_transform(&mut self, component: ComponentId, transform: Transform) {
        let parent = self.parent_world_transform(component);
        if let Some(body) = self.bodies.get_mut(&component) {
            body.transform = transform.then(&parent);
        }
    }

    fn bounds(&self, component: ComponentId) -> Option<BoundingSphere> {
        let body = self.bodies.get(&component)?;
        Some(body.shape?.bounding_sphere(&body.transform))
    }
}

impl SpatialQuery for FakeHost {
    fn overlapping_components(&self, volume: &OverlapVolume) -> Vec<ComponentId> {
        let query = volume.shape.bounding_sphere(&volume.transform);
        let mut hits: Vec<ComponentId> = self
            .colliders()
            .filter(|(_, s)| s.center.distance(query.center) <= s.radius + query.radius)
            .map(|(id, _)| id)
            .collect();
        hits.sort();
        hits
    }

    fn line_trace(&self, origin: Vec3, direction: Vec3, length: f32) -> Vec<TraceHit> {
        let dir = direction.normalize_or_zero();
        let mut hits: Vec<(f32, TraceHit)> = self
            .colliders()
            .filter_map(|(id, s)| {
                let to_center = s.center - origin;
                let along = to_center.dot(dir);
                let dist_sq = to_center.length_squared() - along * along;
                if dist_sq > s.radius * s.radius {
                    return None;
                }
                let t = along - (s.radius * s.radius - dist_sq).sqrt();
                if t < 0.0 || t > length {
                    return None;
                }
                let point = origin + dir * t;
                let normal = (point - s.center).normalize_or_zero();
                Some((
                    t,
                    TraceHit {
                        point,
                        normal,
                        component: id,
                    },
                ))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, hit)| hit).collect()
    }
}

impl PoseSource for FakeHost {
    fn pointer_pose(&self, grabber: GrabberId) -> Option<Pose> {
        self.pointers.get(&grabber).copied()
    }

    fn bone_transform(&self, grabber: GrabberId, _socket: &str) -> Option<Transform> {
        self.bones.get(&grabber).copied()
    }
}

impl RigidBodyControl for FakeHost {
    fn is_simulating_physics(&self, component: ComponentId) -> bool {
        self.bodies.get(&component).is_some_and(|b| b.simulating)
    }

    fn set_simulate_physics(&mut self, component: ComponentId, simulate: bool) {
        if let Some(body) = self.bodies.get_mut(&component) {
            body.simulating = simulate;
        }
    }

    fn is_gravity_enabled(&self, component: ComponentId) -> bool {
        self.bodies.get(&component).is_some_and(|b| b.gravity)
    }

    fn set_gravity_enabled(&mut self, component: ComponentId, enabled: bool) {
        if let Some(body) = self.bodies.get_mut(&component) {
            body.gravity = enabled;
        }
    }

    fn linear_velocity(&self, component: ComponentId) -> Vec3 {
        self.bodies
            .get(&component)
            .map_or(Vec3::ZERO, |b| b.linear_velocity)
    }

    fn set_linear_velocity(&mut self, component: ComponentId, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(&component) {
            body.linear_velocity = velocity;
        }
    }

    fn set_angular_velocity(&mut self, component: ComponentId, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(&component) {
            body.angular_velocity = velocity;
        }
    }
}
