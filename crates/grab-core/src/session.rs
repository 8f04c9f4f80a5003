//! Interaction session
//!
//! The session owns every grabber, grabbable and transform coordinator and is
//! the only entry point a host calls per frame. Entities refer to each other
//! through ids; cancel notifications are routed here, synchronously, before
//! the call that triggered them returns.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::{DebugConfig, GrabberConfig, SessionConfig};
use crate::coordinator::{CoordinatorConfig, GrabTransformCoordinator};
use crate::detector::DebugShape;
use crate::error::{GrabError, GrabResult};
use crate::events::CancelGrabEvent;
use crate::grabbable::{Grabbable, GrabbableConfig};
use crate::grabber::{GrabContext, GrabCoordinator};
use crate::host::Host;
use crate::registry::GrabbableRegistry;
use crate::transform::Transform;
use crate::transformer::GrabTransformer;
use crate::types::{ComponentId, CoordinatorId, GrabbableId, GrabberId, InputMethod};

/// Owner of all interaction entities
#[derive(Debug, Default)]
pub struct InteractionSession {
    config: SessionConfig,
    grabbers: BTreeMap<GrabberId, GrabCoordinator>,
    registry: GrabbableRegistry,
    next_grabber: u32,
    time: f32,
}

impl InteractionSession {
    /// Create a session
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replace the debug switches
    pub fn set_debug_config(&mut self, debug: DebugConfig) {
        self.config.debug = debug;
    }

    /// Session clock in seconds
    pub fn time(&self) -> f32 {
        self.time
    }

    // ========== Registration ==========

    /// Add a grabber rooted at a host component
    pub fn add_grabber(&mut self, component: ComponentId, config: GrabberConfig) -> GrabberId {
        let id = GrabberId(self.next_grabber);
        self.next_grabber += 1;
        self.grabbers
            .insert(id, GrabCoordinator::new(id, component, config));
        info!("Registered {} on {}", id, component);
        id
    }

    /// Add a grabber with the session's default grabber configuration
    pub fn add_default_grabber(&mut self, component: ComponentId) -> GrabberId {
        let config = self.config.grabber.clone();
        self.add_grabber(component, config)
    }

    /// Remove a grabber, releasing and unhovering first
    pub fn remove_grabber(
        &mut self,
        id: GrabberId,
        host: &mut dyn Host,
    ) -> GrabResult<GrabCoordinator> {
        let mut grabber = self
            .grabbers
            .remove(&id)
            .ok_or(GrabError::UnknownGrabber(id))?;
        let mut cx = GrabContext {
            registry: &mut self.registry,
            host,
            time: self.time,
            debug: &self.config.debug,
        };
        grabber.deactivate(&mut cx);
        info!("Removed {}", id);
        Ok(grabber)
    }

    /// Register a grabbable around a host collider
    pub fn add_grabbable(&mut self, collider: ComponentId, config: GrabbableConfig) -> GrabbableId {
        self.registry.add_grabbable(collider, config)
    }

    /// Register a transform coordinator moving `target`
    pub fn add_coordinator(
        &mut self,
        target: Option<ComponentId>,
        config: &CoordinatorConfig,
    ) -> GrabResult<CoordinatorId> {
        self.registry.add_coordinator(target, config).inspect_err(|e| {
            warn!("Rejected coordinator: {}", e);
        })
    }

    /// Let a coordinator drive a grabbable
    pub fn attach_coordinator(
        &mut self,
        grabbable: GrabbableId,
        coordinator: CoordinatorId,
    ) -> GrabResult<()> {
        self.registry.attach(grabbable, coordinator)
    }

    /// Grabbable plus a coordinator moving its own collider
    pub fn add_grabbable_with_coordinator(
        &mut self,
        collider: ComponentId,
        config: GrabbableConfig,
        coordinator: &CoordinatorConfig,
    ) -> GrabResult<(GrabbableId, CoordinatorId)> {
        let c = self.add_coordinator(Some(collider), coordinator)?;
        let g = self.add_grabbable(collider, config);
        self.attach_coordinator(g, c)?;
        Ok((g, c))
    }

    /// Destroy a grabbable; grabbers holding it let go on their next tick
    pub fn destroy_grabbable(&mut self, id: GrabbableId, host: &mut dyn Host) -> GrabResult<()> {
        self.registry.remove_grabbable(id, host).map(|_| ())
    }

    // ========== Lookup ==========

    /// Look up a grabber
    pub fn grabber(&self, id: GrabberId) -> Option<&GrabCoordinator> {
        self.grabbers.get(&id)
    }

    /// Look up a grabber mutably, e.g. to swap detector volumes
    pub fn grabber_mut(&mut self, id: GrabberId) -> Option<&mut GrabCoordinator> {
        self.grabbers.get_mut(&id)
    }

    /// All grabbers in id order
    pub fn grabbers(&self) -> impl Iterator<Item = &GrabCoordinator> {
        self.grabbers.values()
    }

    /// Look up a grabbable
    pub fn grabbable(&self, id: GrabbableId) -> Option<&Grabbable> {
        self.registry.grabbable(id)
    }

    /// Look up a grabbable mutably
    pub fn grabbable_mut(&mut self, id: GrabbableId) -> Option<&mut Grabbable> {
        self.registry.grabbable_mut(id)
    }

    /// Look up a coordinator
    pub fn coordinator(&self, id: CoordinatorId) -> Option<&GrabTransformCoordinator> {
        self.registry.coordinator(id)
    }

    /// Look up a coordinator mutably, e.g. to add listeners
    pub fn coordinator_mut(&mut self, id: CoordinatorId) -> Option<&mut GrabTransformCoordinator> {
        self.registry.coordinator_mut(id)
    }

    /// Grabbables and coordinators
    pub fn registry(&self) -> &GrabbableRegistry {
        &self.registry
    }

    /// Whether a grabber holds something
    pub fn is_grabbing(&self, grabber: GrabberId) -> bool {
        self.grabbers
            .get(&grabber)
            .is_some_and(GrabCoordinator::is_grabbing)
    }

    /// Grabbable a grabber holds
    pub fn grabbed(&self, grabber: GrabberId) -> Option<GrabbableId> {
        self.grabbers.get(&grabber)?.grabbed()
    }

    /// Collider of the grabbable a grabber holds
    pub fn grabbed_component(&self, grabber: GrabberId) -> Option<ComponentId> {
        let id = self.grabbed(grabber)?;
        Some(self.registry.grabbable(id)?.collider())
    }

    /// Grabbables a grabber hovers
    pub fn hovered(&self, grabber: GrabberId) -> &[GrabbableId] {
        self.grabbers
            .get(&grabber)
            .map_or(&[], GrabCoordinator::hovered)
    }

    // ========== Frame ==========

    /// Advance one frame
    ///
    /// Grabbables whose collider is gone are pruned first, then every grabber
    /// ticks in id order, then throwables sample their pose.
    pub fn tick(&mut self, delta_time: f32, host: &mut dyn Host) {
        self.time += delta_time;
        self.prune_destroyed(host);

        let mut cx = GrabContext {
            registry: &mut self.registry,
            host: &mut *host,
            time: self.time,
            debug: &self.config.debug,
        };
        for grabber in self.grabbers.values_mut() {
            grabber.tick(delta_time, &mut cx);
        }

        for coordinator in self.registry.coordinators_mut() {
            coordinator.sample_throwable(self.time, &*host);
        }
    }

    fn prune_destroyed(&mut self, host: &mut dyn Host) {
        let dead: Vec<GrabbableId> = self
            .registry
            .grabbables()
            .filter(|g| !host.is_alive(g.collider()))
            .map(Grabbable::id)
            .collect();
        for id in dead {
            info!("Pruning {}, its collider is gone", id);
            // cannot fail, the id was just listed
            let _ = self.registry.remove_grabbable(id, host);
        }
    }

    // ========== Grabbing ==========

    /// Start or extend a grab with an input method
    pub fn grab(&mut self, grabber: GrabberId, method: InputMethod, host: &mut dyn Host) {
        let Some(mut g) = self.grabbers.remove(&grabber) else {
            return;
        };
        let cancels = {
            let mut cx = GrabContext {
                registry: &mut self.registry,
                host: &mut *host,
                time: self.time,
                debug: &self.config.debug,
            };
            g.try_select(method, &mut cx)
        };
        if let Some(cancels) = cancels {
            self.route_cancels(&cancels, host);
            let mut cx = GrabContext {
                registry: &mut self.registry,
                host,
                time: self.time,
                debug: &self.config.debug,
            };
            g.complete_select(&mut cx);
        }
        self.grabbers.insert(grabber, g);
    }

    /// Clear an input method; the grab ends with the last one
    pub fn release(&mut self, grabber: GrabberId, method: InputMethod, host: &mut dyn Host) {
        let Some(g) = self.grabbers.get_mut(&grabber) else {
            return;
        };
        let mut cx = GrabContext {
            registry: &mut self.registry,
            host,
            time: self.time,
            debug: &self.config.debug,
        };
        g.release(method, &mut cx);
    }

    /// Grab with pinch
    pub fn pinch_grab(&mut self, grabber: GrabberId, host: &mut dyn Host) {
        self.grab(grabber, InputMethod::Pinch, host);
    }

    /// Release pinch
    pub fn pinch_release(&mut self, grabber: GrabberId, host: &mut dyn Host) {
        self.release(grabber, InputMethod::Pinch, host);
    }

    /// Grab with palm
    pub fn palm_grab(&mut self, grabber: GrabberId, host: &mut dyn Host) {
        self.grab(grabber, InputMethod::Palm, host);
    }

    /// Release palm
    pub fn palm_release(&mut self, grabber: GrabberId, host: &mut dyn Host) {
        self.release(grabber, InputMethod::Palm, host);
    }

    /// Release everything, unhover and stop ticking a grabber
    pub fn deactivate_grabber(&mut self, grabber: GrabberId, host: &mut dyn Host) -> GrabResult<()> {
        let g = self
            .grabbers
            .get_mut(&grabber)
            .ok_or(GrabError::UnknownGrabber(grabber))?;
        let mut cx = GrabContext {
            registry: &mut self.registry,
            host,
            time: self.time,
            debug: &self.config.debug,
        };
        g.deactivate(&mut cx);
        Ok(())
    }

    /// Resume a deactivated grabber
    pub fn activate_grabber(&mut self, grabber: GrabberId) -> GrabResult<()> {
        self.grabbers
            .get_mut(&grabber)
            .ok_or(GrabError::UnknownGrabber(grabber))?
            .activate();
        Ok(())
    }

    /// Cancel every grab on a coordinator; holders release immediately
    pub fn force_cancel(&mut self, coordinator: CoordinatorId, host: &mut dyn Host) -> GrabResult<()> {
        let cancels = self.registry.force_cancel(coordinator, host)?;
        self.route_cancels(&cancels, host);
        Ok(())
    }

    fn route_cancels(&mut self, cancels: &[CancelGrabEvent], host: &mut dyn Host) {
        for event in cancels {
            let target = GrabberId(event.interactor_id);
            let subscribed = self
                .registry
                .coordinator(event.coordinator)
                .is_some_and(|c| c.is_cancel_subscriber(target));
            if !subscribed {
                continue;
            }
            let Some(grabber) = self.grabbers.get_mut(&target) else {
                continue;
            };
            let mut cx = GrabContext {
                registry: &mut self.registry,
                host: &mut *host,
                time: self.time,
                debug: &self.config.debug,
            };
            grabber.handle_cancel(event, &mut cx);
        }
    }

    // ========== Coordinator configuration ==========

    /// Snap a held object onto its grabber
    pub fn set_interactor_snap(
        &mut self,
        coordinator: CoordinatorId,
        offset: Transform,
        move_snap_duration: f32,
        host: &dyn Host,
    ) -> GrabResult<()> {
        let time = self.time;
        self.coordinator_or_err(coordinator)?
            .set_interactor_snap(offset, move_snap_duration, time, host);
        Ok(())
    }

    /// Replace a coordinator's single grab solver
    pub fn set_single_grab_transformer(
        &mut self,
        coordinator: CoordinatorId,
        transformer: Option<GrabTransformer>,
        host: &mut dyn Host,
    ) -> GrabResult<()> {
        let time = self.time;
        self.coordinator_or_err(coordinator)?
            .set_single_grab_transformer(transformer, time, host)
    }

    /// Replace a coordinator's multi grab solver
    pub fn set_multi_grab_transformer(
        &mut self,
        coordinator: CoordinatorId,
        transformer: Option<GrabTransformer>,
        host: &mut dyn Host,
    ) -> GrabResult<()> {
        let time = self.time;
        self.coordinator_or_err(coordinator)?
            .set_multi_grab_transformer(transformer, time, host)
            .inspect_err(|e| warn!("{}: {}", coordinator, e))
    }

    fn coordinator_or_err(&mut self, id: CoordinatorId) -> GrabResult<&mut GrabTransformCoordinator> {
        self.registry
            .coordinator_mut(id)
            .ok_or(GrabError::UnknownCoordinator(id))
    }

    // ========== Debug ==========

    /// Shapes a host renderer may draw, per the debug switches
    pub fn debug_shapes(&self, host: &dyn Host) -> Vec<DebugShape> {
        let mut shapes = Vec::new();
        if self.config.debug.draw_detectors {
            for grabber in self.grabbers.values().filter(|g| g.is_active()) {
                shapes.extend(grabber.debug_shapes());
            }
        }
        if self.config.debug.draw_collider_shapes {
            for grabbable in self.registry.grabbables() {
                if let Some(transform) = host.world_transform(grabbable.collider()) {
                    shapes.push(DebugShape::Collider {
                        shape: grabbable.collider_shape(),
                        transform,
                        state: grabbable.state(),
                    });
                }
            }
        }
        shapes
    }
}
