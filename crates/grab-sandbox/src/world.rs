//! Headless scene the interaction core runs against
//!
//! Objects form a parent hierarchy of local transforms. Simulated bodies are
//! integrated with explicit Euler steps; there is no contact resolution.

use std::collections::{BTreeMap, HashMap};

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use grab_core::constants::THUMB_TIP_SOCKET;
use grab_core::{
    BoundingSphere, ColliderShape, ComponentId, GrabberId, OverlapVolume, Pose, PoseSource,
    RigidBodyControl, SceneGraph, SpatialQuery, TraceHit, Transform,
};

use crate::collision::{ray_shape, shapes_overlap};

/// Gravity in units per second squared, Z up
pub const GRAVITY: Vec3 = Vec3::new(0.0, 0.0, -980.0);

/// Rigid-body flags and velocities of a scene object
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RigidBody {
    pub simulate: bool,
    pub gravity: bool,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

/// One scene component
#[derive(Debug, Clone)]
pub struct SimObject {
    pub name: String,
    /// Transform relative to `parent`
    pub local: Transform,
    pub parent: Option<ComponentId>,
    /// `None` for components that queries never find
    pub shape: Option<ColliderShape>,
    pub alive: bool,
    pub body: RigidBody,
}

/// Tracking state of one grabber's hand or controller
#[derive(Debug, Clone, Default)]
pub struct SimHand {
    /// Component the pointer follows
    pub root: Option<ComponentId>,
    /// Pointer tracking lost when false
    pub tracked: bool,
    /// Thumb tip offset from the root, in root space
    pub thumb_tip: Option<Vec3>,
}

/// In-memory host
#[derive(Debug, Default)]
pub struct SimWorld {
    objects: BTreeMap<ComponentId, SimObject>,
    hands: HashMap<GrabberId, SimHand>,
    next_id: u64,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Objects ==========

    /// Spawn a component with a collider
    pub fn spawn(&mut self, name: impl Into<String>, transform: Transform, shape: ColliderShape) -> ComponentId {
        self.insert(name.into(), transform, Some(shape))
    }

    /// Spawn a component without a collider, e.g. a hand root
    pub fn spawn_point(&mut self, name: impl Into<String>, transform: Transform) -> ComponentId {
        self.insert(name.into(), transform, None)
    }

    fn insert(&mut self, name: String, transform: Transform, shape: Option<ColliderShape>) -> ComponentId {
        self.next_id += 1;
        let id = ComponentId(self.next_id);
        debug!("Spawned {} as {}", name, id);
        self.objects.insert(
            id,
            SimObject {
                name,
                local: transform,
                parent: None,
                shape,
                alive: true,
                body: RigidBody::default(),
            },
        );
        id
    }

    /// Mark a component destroyed. It stays listed so reports can show it.
    pub fn destroy(&mut self, component: ComponentId) -> bool {
        match self.objects.get_mut(&component) {
            Some(object) if object.alive => {
                object.alive = false;
                debug!("Destroyed {}", object.name);
                true
            }
            _ => false,
        }
    }

    /// Attach to a parent, keeping the world transform
    pub fn set_parent(&mut self, component: ComponentId, parent: Option<ComponentId>) {
        let Some(world) = self.world_transform(component) else {
            return;
        };
        let parent_world = parent
            .and_then(|p| self.world_transform(p))
            .unwrap_or_default();
        if let Some(object) = self.objects.get_mut(&component) {
            object.parent = parent;
            object.local = world.relative_to(&parent_world);
        }
    }

    pub fn object(&self, component: ComponentId) -> Option<&SimObject> {
        self.objects.get(&component)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ComponentId, &SimObject)> {
        self.objects.iter().map(|(id, o)| (*id, o))
    }

    /// Find a component by name
    pub fn find(&self, name: &str) -> Option<ComponentId> {
        self.objects
            .iter()
            .find(|(_, o)| o.name == name)
            .map(|(id, _)| *id)
    }

    /// Place a component in world space
    pub fn set_world_transform(&mut self, component: ComponentId, transform: Transform) {
        let parent = self.parent_world_transform(component);
        if let Some(object) = self.objects.get_mut(&component) {
            object.local = transform.relative_to(&parent);
        }
    }

    /// World position, `None` once destroyed
    pub fn position(&self, component: ComponentId) -> Option<Vec3> {
        self.world_transform(component).map(|t| t.translation)
    }

    pub fn body(&self, component: ComponentId) -> Option<&RigidBody> {
        self.objects.get(&component).map(|o| &o.body)
    }

    // ========== Hands ==========

    /// Let `grabber`'s pointer follow `root`
    pub fn track_hand(&mut self, grabber: GrabberId, root: ComponentId) {
        let hand = self.hands.entry(grabber).or_default();
        hand.root = Some(root);
        hand.tracked = true;
    }

    /// Toggle pointer tracking
    pub fn set_tracked(&mut self, grabber: GrabberId, tracked: bool) {
        self.hands.entry(grabber).or_default().tracked = tracked;
    }

    /// Thumb tip offset from the hand root
    pub fn set_thumb_tip(&mut self, grabber: GrabberId, offset: Option<Vec3>) {
        self.hands.entry(grabber).or_default().thumb_tip = offset;
    }

    fn hand_root(&self, grabber: GrabberId) -> Option<Transform> {
        let hand = self.hands.get(&grabber)?;
        self.world_transform(hand.root?)
    }

    // ========== Simulation ==========

    /// Integrate simulated bodies
    pub fn step(&mut self, delta_time: f32) {
        let ids: Vec<ComponentId> = self
            .objects
            .iter()
            .filter(|(_, o)| o.alive && o.body.simulate)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            let Some(world) = self.world_transform(id) else {
                continue;
            };
            let Some(object) = self.objects.get_mut(&id) else {
                continue;
            };
            let body = &mut object.body;
            if body.gravity {
                body.linear_velocity += GRAVITY * delta_time;
            }
            let spin = body.angular_velocity * delta_time;
            let rotation = if spin.length_squared() > 0.0 {
                (Quat::from_scaled_axis(spin) * world.rotation).normalize()
            } else {
                world.rotation
            };
            let moved = Transform::new(
                world.translation + body.linear_velocity * delta_time,
                rotation,
                world.scale,
            );
            self.set_world_transform(id, moved);
        }
    }

    fn live_colliders(&self) -> impl Iterator<Item = (ComponentId, ColliderShape, Transform)> + '_ {
        self.objects.iter().filter_map(|(id, o)| {
            let shape = o.shape?;
            let world = self.world_transform(*id)?;
            Some((*id, shape, world))
        })
    }
}

impl SceneGraph for SimWorld {
    fn is_alive(&self, component: ComponentId) -> bool {
        self.objects.get(&component).is_some_and(|o| o.alive)
    }

    fn world_transform(&self, component: ComponentId) -> Option<Transform> {
        let object = self.objects.get(&component).filter(|o| o.alive)?;
        Some(object.local.then(&self.parent_world_transform(component)))
    }

    fn parent_world_transform(&self, component: ComponentId) -> Transform {
        self.objects
            .get(&component)
            .and_then(|o| o.parent)
            .and_then(|p| self.world_transform(p))
            .unwrap_or_default()
    }

    fn set_relative_transform(&mut self, component: ComponentId, transform: Transform) {
        if let Some(object) = self.objects.get_mut(&component) {
            object.local = transform;
        }
    }

    fn bounds(&self, component: ComponentId) -> Option<BoundingSphere> {
        let shape = self.objects.get(&component)?.shape?;
        Some(shape.bounding_sphere(&self.world_transform(component)?))
    }
}

impl SpatialQuery for SimWorld {
    fn overlapping_components(&self, volume: &OverlapVolume) -> Vec<ComponentId> {
        self.live_colliders()
            .filter(|(_, shape, at)| shapes_overlap(&volume.shape, &volume.transform, shape, at))
            .map(|(id, _, _)| id)
            .collect()
    }

    fn line_trace(&self, origin: Vec3, direction: Vec3, length: f32) -> Vec<TraceHit> {
        let Some(dir) = direction.try_normalize() else {
            return Vec::new();
        };
        let mut hits: Vec<(f32, TraceHit)> = self
            .live_colliders()
            .filter_map(|(id, shape, at)| {
                let hit = ray_shape(origin, dir, &shape, &at)?;
                (hit.distance <= length).then(|| {
                    (
                        hit.distance,
                        TraceHit {
                            point: origin + dir * hit.distance,
                            normal: hit.normal,
                            component: id,
                        },
                    )
                })
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, hit)| hit).collect()
    }
}

impl PoseSource for SimWorld {
    fn pointer_pose(&self, grabber: GrabberId) -> Option<Pose> {
        if !self.hands.get(&grabber)?.tracked {
            return None;
        }
        self.hand_root(grabber).map(|t| t.pose())
    }

    fn bone_transform(&self, grabber: GrabberId, socket: &str) -> Option<Transform> {
        if socket != THUMB_TIP_SOCKET {
            return None;
        }
        let offset = self.hands.get(&grabber)?.thumb_tip?;
        let root = self.hand_root(grabber)?;
        Some(Transform::from_rotation_translation(
            root.rotation,
            root.transform_point(offset),
        ))
    }
}

impl RigidBodyControl for SimWorld {
    fn is_simulating_physics(&self, component: ComponentId) -> bool {
        self.objects.get(&component).is_some_and(|o| o.body.simulate)
    }

    fn set_simulate_physics(&mut self, component: ComponentId, simulate: bool) {
        if let Some(object) = self.objects.get_mut(&component) {
            object.body.simulate = simulate;
        }
    }

    fn is_gravity_enabled(&self, component: ComponentId) -> bool {
        self.objects.get(&component).is_some_and(|o| o.body.gravity)
    }

    fn set_gravity_enabled(&mut self, component: ComponentId, enabled: bool) {
        if let Some(object) = self.objects.get_mut(&component) {
            object.body.gravity = enabled;
        }
    }

    fn linear_velocity(&self, component: ComponentId) -> Vec3 {
        self.objects
            .get(&component)
            .map_or(Vec3::ZERO, |o| o.body.linear_velocity)
    }

    fn set_linear_velocity(&mut self, component: ComponentId, velocity: Vec3) {
        if let Some(object) = self.objects.get_mut(&component) {
            object.body.linear_velocity = velocity;
        }
    }

    fn set_angular_velocity(&mut self, component: ComponentId, velocity: Vec3) {
        if let Some(object) = self.objects.get_mut(&component) {
            object.body.angular_velocity = velocity;
        }
    }
}
