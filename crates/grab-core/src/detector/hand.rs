//! Hand proximity detector
//!
//! Two overlap volumes: a small pinch volume that follows the thumb tip and a
//! larger palm volume around the hand root. Each volume nominates the nearest
//! grabbable for its own input method.

use glam::Vec3;

use super::{push_unique, DebugShape, DetectorContext, GrabDetector};
use crate::config::HandDetectorConfig;
use crate::host::{ColliderShape, Host, OverlapVolume};
use crate::transform::Transform;
use crate::types::{DetectorKind, GrabbableId, GrabberId, InputMethod, InputMethods};

/// Where the pinch volume is anchored
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PinchAttachment {
    /// Follows the thumb tip socket
    ThumbTip,
    /// Frozen relative to the hand root
    HandRoot {
        /// Pinch transform in hand root space
        relative: Transform,
    },
}

/// Proximity volumes on a tracked hand
#[derive(Debug, Clone)]
pub struct HandDetector {
    pinch_shape: ColliderShape,
    palm_shape: ColliderShape,
    palm_offset: Vec3,
    thumb_tip_socket: String,
    pinch_attachment: PinchAttachment,
    pinch_world: Transform,
    palm_world: Transform,
    hovered: Vec<GrabbableId>,
    pinch_candidate: Option<GrabbableId>,
    palm_candidate: Option<GrabbableId>,
    selecting: bool,
}

impl HandDetector {
    /// Create from configuration
    pub fn new(config: &HandDetectorConfig) -> Self {
        Self {
            pinch_shape: ColliderShape::Sphere {
                radius: config.pinch_radius,
            },
            palm_shape: ColliderShape::Sphere {
                radius: config.palm_radius,
            },
            palm_offset: config.palm_offset,
            thumb_tip_socket: config.thumb_tip_socket.clone(),
            pinch_attachment: PinchAttachment::ThumbTip,
            pinch_world: Transform::IDENTITY,
            palm_world: Transform::IDENTITY,
            hovered: Vec::new(),
            pinch_candidate: None,
            palm_candidate: None,
            selecting: false,
        }
    }

    /// Current pinch anchoring
    pub fn pinch_attachment(&self) -> PinchAttachment {
        self.pinch_attachment
    }

    /// Freeze the pinch volume where it is, relative to the hand root
    pub fn attach_pinch_to_root(&mut self, host: &dyn Host, grabber: GrabberId, root: &Transform) {
        let pinch = self.pinch_transform(host, grabber, root);
        self.pinch_attachment = PinchAttachment::HandRoot {
            relative: pinch.relative_to(root),
        };
    }

    /// Let the pinch volume follow the thumb tip again
    pub fn attach_pinch_to_thumb_tip(&mut self) {
        self.pinch_attachment = PinchAttachment::ThumbTip;
    }

    /// Swap the pinch volume shape
    pub fn replace_pinch_shape(&mut self, shape: ColliderShape) {
        self.pinch_shape = shape;
    }

    /// Swap the palm volume shape
    pub fn replace_palm_shape(&mut self, shape: ColliderShape) {
        self.palm_shape = shape;
    }

    /// Move the palm volume relative to the hand root
    pub fn set_palm_offset(&mut self, offset: Vec3) {
        self.palm_offset = offset;
    }

    /// World transform of the pinch volume for the current root
    pub fn pinch_transform(&self, host: &dyn Host, grabber: GrabberId, root: &Transform) -> Transform {
        match self.pinch_attachment {
            PinchAttachment::ThumbTip => host
                .bone_transform(grabber, &self.thumb_tip_socket)
                .unwrap_or(*root),
            PinchAttachment::HandRoot { relative } => relative.then(root),
        }
    }

    /// World transform of the palm volume for the current root
    pub fn palm_transform(&self, root: &Transform) -> Transform {
        Transform::from_translation(self.palm_offset).then(root)
    }

    /// Pinch volume placement from the last tick
    pub fn last_pinch_transform(&self) -> Transform {
        self.pinch_world
    }

    /// Palm volume placement from the last tick
    pub fn last_palm_transform(&self) -> Transform {
        self.palm_world
    }

    /// Grabbables overlapping one volume that accept `method`
    fn overlaps(
        &self,
        ctx: &DetectorContext,
        shape: ColliderShape,
        transform: Transform,
        method: InputMethod,
    ) -> Vec<(GrabbableId, f32)> {
        if !ctx.allowed_input_methods.contains(method) {
            return Vec::new();
        }
        let volume = OverlapVolume { shape, transform };
        let methods = InputMethods::NONE.with(method);
        let mut found: Vec<(GrabbableId, f32)> = Vec::new();
        for component in ctx.host.overlapping_components(&volume) {
            let Some(grabbable) = ctx.accept(component, DetectorKind::Hand, methods) else {
                continue;
            };
            if found.iter().any(|(id, _)| *id == grabbable.id()) {
                continue;
            }
            let distance_sq = ctx
                .collider_position(grabbable)
                .map_or(f32::MAX, |p| p.distance_squared(transform.translation));
            found.push((grabbable.id(), distance_sq));
        }
        found
    }
}

fn nearest(found: &[(GrabbableId, f32)]) -> Option<GrabbableId> {
    found
        .iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| *id)
}

impl GrabDetector for HandDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Hand
    }

    fn tick(&mut self, ctx: &DetectorContext) {
        self.pinch_world = self.pinch_transform(ctx.host, ctx.grabber, &ctx.grabber_transform);
        self.palm_world = self.palm_transform(&ctx.grabber_transform);

        let pinch = self.overlaps(ctx, self.pinch_shape, self.pinch_world, InputMethod::Pinch);
        let palm = self.overlaps(ctx, self.palm_shape, self.palm_world, InputMethod::Palm);

        self.hovered.clear();
        for (id, _) in pinch.iter().chain(palm.iter()) {
            push_unique(&mut self.hovered, *id);
        }

        if !self.selecting {
            self.pinch_candidate = nearest(&pinch);
            self.palm_candidate = nearest(&palm);
        }
    }

    fn hovered(&self) -> &[GrabbableId] {
        &self.hovered
    }

    fn grab_candidate(&self, method: InputMethod) -> Option<GrabbableId> {
        match method {
            InputMethod::Pinch => self.pinch_candidate,
            InputMethod::Palm => self.palm_candidate,
            _ => None,
        }
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
        let state = self.debug_state();
        vec![
            DebugShape::Volume {
                shape: self.pinch_shape,
                transform: self.pinch_world,
                state,
            },
            DebugShape::Volume {
                shape: self.palm_shape,
                transform: self.palm_world,
                state,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grabbable::GrabbableConfig;
    use crate::registry::GrabbableRegistry;
    use crate::test_host::FakeHost;

    fn ctx<'a>(host: &'a FakeHost, registry: &'a GrabbableRegistry, root: Vec3) -> DetectorContext<'a> {
        DetectorContext {
            grabber: GrabberId(0),
            grabber_transform: Transform::from_translation(root),
            allowed_input_methods: InputMethods::hand(),
            host,
            registry,
        }
    }

    fn small() -> ColliderShape {
        ColliderShape::Sphere { radius: 0.5 }
    }

    #[test]
    fn test_volumes_nominate_nearest_per_method() {
        let mut host = FakeHost::default();
        let near = host.add_body(1, Vec3::new(1.0, 0.0, 0.0), small());
        let far = host.add_body(2, Vec3::new(3.0, 0.0, 0.0), small());
        let mut registry = GrabbableRegistry::new();
        let near_id = registry.add_grabbable(near, GrabbableConfig::default());
        let far_id = registry.add_grabbable(far, GrabbableConfig::default());

        let mut detector = HandDetector::new(&HandDetectorConfig::default());
        detector.tick(&ctx(&host, &registry, Vec3::ZERO));

        // pinch radius 1.2 reaches only the near body, palm radius 4 both
        assert_eq!(detector.grab_candidate(InputMethod::Pinch), Some(near_id));
        assert_eq!(detector.grab_candidate(InputMethod::Palm), Some(near_id));
        assert_eq!(detector.hovered(), &[near_id, far_id]);
        assert_eq!(detector.grab_candidate(InputMethod::Custom), None);
    }

    #[test]
    fn test_palm_only_grabbable_skips_pinch() {
        let mut host = FakeHost::default();
        let body = host.add_body(1, Vec3::new(0.5, 0.0, 0.0), small());
        let mut registry = GrabbableRegistry::new();
        let id = registry.add_grabbable(
            body,
            GrabbableConfig::default().with_input_methods(InputMethods::NONE.with(InputMethod::Palm)),
        );
        let mut detector = HandDetector::new(&HandDetectorConfig::default());
        detector.tick(&ctx(&host, &registry, Vec3::ZERO));
        assert_eq!(detector.grab_candidate(InputMethod::Pinch), None);
        assert_eq!(detector.grab_candidate(InputMethod::Palm), Some(id));
    }

    #[test]
    fn test_candidates_frozen_while_selecting() {
        let mut host = FakeHost::default();
        let a = host.add_body(1, Vec3::new(0.5, 0.0, 0.0), small());
        let b = host.add_body(2, Vec3::new(-0.2, 0.0, 0.0), small());
        let mut registry = GrabbableRegistry::new();
        let a_id = registry.add_grabbable(a, GrabbableConfig::default());
        registry.add_grabbable(b, GrabbableConfig::default());
        host.kill(b);

        let mut detector = HandDetector::new(&HandDetectorConfig::default());
        let c = ctx(&host, &registry, Vec3::ZERO);
        detector.tick(&c);
        detector.select(InputMethod::Pinch, &c);
        drop(c);

        host.bodies.get_mut(&b).unwrap().alive = true;
        detector.tick(&ctx(&host, &registry, Vec3::ZERO));
        assert_eq!(detector.grab_candidate(InputMethod::Pinch), Some(a_id));
        assert_eq!(detector.hovered().len(), 2);
    }

    #[test]
    fn test_pinch_follows_thumb_until_attached_to_root() {
        let mut host = FakeHost::default();
        host.bones
            .insert(GrabberId(0), Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)));
        let mut detector = HandDetector::new(&HandDetectorConfig::default());
        let grabber = GrabberId(0);

        let root = Transform::IDENTITY;
        assert_eq!(
            detector.pinch_transform(&host, grabber, &root).translation,
            Vec3::new(0.0, 1.0, 0.0)
        );
        detector.attach_pinch_to_root(&host, grabber, &root);

        let moved = Transform::from_translation(Vec3::new(5.0, 0.0, 0.0));
        assert!(detector
            .pinch_transform(&host, grabber, &moved)
            .translation
            .abs_diff_eq(Vec3::new(5.0, 1.0, 0.0), 1e-5));

        detector.attach_pinch_to_thumb_tip();
        assert_eq!(detector.pinch_attachment(), PinchAttachment::ThumbTip);
        assert_eq!(
            detector.pinch_transform(&host, grabber, &moved).translation,
            Vec3::new(0.0, 1.0, 0.0)
        );
    }

    #[test]
    fn test_grown_pinch_volume_reaches_further() {
        let mut host = FakeHost::default();
        let far = host.add_body(1, Vec3::new(5.0, 0.0, 0.0), small());
        let mut registry = GrabbableRegistry::new();
        let far_id = registry.add_grabbable(far, GrabbableConfig::default());

        let mut detector = HandDetector::new(&HandDetectorConfig::default());
        detector.replace_palm_shape(ColliderShape::Sphere { radius: 0.1 });
        let root = Vec3::new(0.0, 0.0, 1.0);
        detector.tick(&ctx(&host, &registry, root));
        assert_eq!(detector.grab_candidate(InputMethod::Pinch), None);
        assert!(detector.hovered().is_empty());
        assert_eq!(detector.last_pinch_transform().translation, root);
        assert_eq!(detector.last_palm_transform().translation, root);

        detector.replace_pinch_shape(ColliderShape::Sphere { radius: 5.0 });
        let c = ctx(&host, &registry, root);
        detector.tick(&c);
        assert_eq!(detector.grab_candidate(InputMethod::Pinch), Some(far_id));
        detector.select(InputMethod::Pinch, &c);
        drop(c);

        // swapped again mid grab, the new volume still drives hover
        let later = host.add_body(2, Vec3::new(0.0, -7.0, 0.0), small());
        let later_id = registry.add_grabbable(later, GrabbableConfig::default());
        detector.replace_pinch_shape(ColliderShape::Sphere { radius: 8.0 });
        detector.tick(&ctx(&host, &registry, root));
        assert_eq!(detector.hovered(), &[far_id, later_id]);
        assert_eq!(detector.grab_candidate(InputMethod::Pinch), Some(far_id));
    }

    #[test]
    fn test_palm_offset_moves_volume() {
        let mut detector = HandDetector::new(&HandDetectorConfig::default());
        detector.set_palm_offset(Vec3::new(0.0, 0.0, -2.0));
        let root = Transform::from_translation(Vec3::X);
        assert_eq!(detector.palm_transform(&root).translation, Vec3::new(1.0, 0.0, -2.0));
        assert_eq!(detector.debug_shapes().len(), 2);
    }
}
