//! Ray detector
//!
//! Traces along the pointer and hovers the first grabbable it hits. While a
//! grab is running the hit point stays glued to the object, so the drawn ray
//! bends toward it as the object moves.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::{DebugShape, DetectorContext, GrabDetector};
use crate::config::RayDetectorConfig;
use crate::geometry::is_degenerate;
use crate::transform::Transform;
use crate::types::{ComponentId, DetectorKind, GrabbableId, InputMethod, InputMethods};

/// Last ray hit, real or kept alive during a grab
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayHit {
    /// World hit location
    pub point: Vec3,
    /// Surface normal at the hit
    pub normal: Vec3,
    /// Trace start
    pub trace_start: Vec3,
    /// Trace end
    pub trace_end: Vec3,
    /// Collider that was hit
    pub component: ComponentId,
}

impl RayHit {
    /// Hit frame: X along the normal, Z across the trace
    pub fn frame(&self) -> Transform {
        let forward = (self.trace_end - self.trace_start).normalize_or_zero();
        let x = self.normal.normalize_or_zero();
        let z = x.cross(forward);
        let rotation = if is_degenerate(x) {
            Quat::IDENTITY
        } else if is_degenerate(z) {
            Quat::from_rotation_arc(Vec3::X, x)
        } else {
            let z = z.normalize();
            let y = z.cross(x);
            Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize()
        };
        Transform::from_rotation_translation(rotation, self.point)
    }
}

/// Line trace along the pointer
#[derive(Debug, Clone)]
pub struct RayDetector {
    length: f32,
    hovered: Vec<GrabbableId>,
    hit: Option<RayHit>,
    selected: Option<GrabbableId>,
    hit_from_object: Transform,
    origin: Vec3,
    end: Vec3,
}

impl RayDetector {
    /// Create from configuration
    pub fn new(config: &RayDetectorConfig) -> Self {
        Self {
            length: config.length,
            hovered: Vec::new(),
            hit: None,
            selected: None,
            hit_from_object: Transform::IDENTITY,
            origin: Vec3::ZERO,
            end: Vec3::ZERO,
        }
    }

    /// Trace length
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Change trace length
    pub fn set_length(&mut self, length: f32) {
        self.length = length;
    }

    /// Current hit
    pub fn hit(&self) -> Option<RayHit> {
        self.hit
    }

    fn tick_selected(&mut self, ctx: &DetectorContext, selected: GrabbableId, origin: Vec3) {
        self.hovered.clear();
        self.hovered.push(selected);

        let Some(grabbable) = ctx.registry.grabbable(selected) else {
            return;
        };
        let Some(object) = ctx.host.world_transform(grabbable.collider()) else {
            return;
        };
        let hit_world = self.hit_from_object.then(&object);
        let toward = (hit_world.translation - origin).normalize_or_zero();
        self.end = origin + toward * self.length;
        self.hit = Some(RayHit {
            point: hit_world.translation,
            normal: hit_world.forward(),
            trace_start: origin,
            trace_end: self.end,
            component: grabbable.collider(),
        });
    }
}

impl GrabDetector for RayDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Ray
    }

    fn tick(&mut self, ctx: &DetectorContext) {
        let Some(pointer) = ctx.host.pointer_pose(ctx.grabber) else {
            if self.selected.is_none() {
                self.hovered.clear();
                self.hit = None;
            }
            return;
        };
        let origin = pointer.position;
        let direction = pointer.orientation * Vec3::X;
        self.origin = origin;
        self.end = origin + direction * self.length;

        if let Some(selected) = self.selected {
            self.tick_selected(ctx, selected, origin);
            return;
        }

        self.hovered.clear();
        self.hit = None;
        for hit in ctx.host.line_trace(origin, direction, self.length) {
            let Some(grabbable) = ctx.accept(hit.component, DetectorKind::Ray, InputMethods::all())
            else {
                continue;
            };
            self.hovered.push(grabbable.id());
            self.hit = Some(RayHit {
                point: hit.point,
                normal: hit.normal,
                trace_start: origin,
                trace_end: self.end,
                component: hit.component,
            });
            break;
        }
    }

    fn hovered(&self) -> &[GrabbableId] {
        &self.hovered
    }

    fn grab_candidate(&self, _method: InputMethod) -> Option<GrabbableId> {
        self.hovered.first().copied()
    }

    fn select(&mut self, _method: InputMethod, ctx: &DetectorContext) {
        let Some(id) = self.hovered.first().copied() else {
            return;
        };
        self.selected = Some(id);
        let object = ctx
            .registry
            .grabbable(id)
            .and_then(|g| ctx.host.world_transform(g.collider()));
        self.hit_from_object = match (self.hit, object) {
            (Some(hit), Some(object)) => hit.frame().relative_to(&object),
            _ => Transform::IDENTITY,
        };
    }

    fn unselect(&mut self) {
        self.selected = None;
        self.hit_from_object = Transform::IDENTITY;
    }

    fn is_selecting(&self) -> bool {
        self.selected.is_some()
    }

    fn debug_shapes(&self) -> Vec<DebugShape> {
        let end = self.hit.map_or(self.end, |h| h.point);
        vec![DebugShape::Line {
            start: self.origin,
            end,
            state: self.debug_state(),
        }]
    }
}
