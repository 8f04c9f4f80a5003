//! Grabbable and coordinator stores
//!
//! Grabbables and coordinators refer to each other by id; the registry owns
//! both and routes pointer events from a grabbable to its coordinator.

use std::collections::{BTreeMap, HashMap};

use tracing::info;

use crate::coordinator::{CoordinatorConfig, GrabTransformCoordinator};
use crate::error::{GrabError, GrabResult};
use crate::events::{CancelGrabEvent, PointerEvent};
use crate::grabbable::{Grabbable, GrabbableConfig};
use crate::host::Host;
use crate::types::{ComponentId, CoordinatorId, GrabbableId, MultiGrabBehavior};

/// Id-keyed stores for grabbables and their transform coordinators
#[derive(Debug, Default)]
pub struct GrabbableRegistry {
    grabbables: BTreeMap<GrabbableId, Grabbable>,
    coordinators: BTreeMap<CoordinatorId, GrabTransformCoordinator>,
    by_collider: HashMap<ComponentId, GrabbableId>,
    next_grabbable: u32,
    next_coordinator: u32,
}

impl GrabbableRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a grabbable around `collider`
    pub fn add_grabbable(&mut self, collider: ComponentId, config: GrabbableConfig) -> GrabbableId {
        let id = GrabbableId(self.next_grabbable);
        self.next_grabbable += 1;
        self.grabbables.insert(id, Grabbable::new(id, collider, config));
        self.by_collider.insert(collider, id);
        info!("Registered {} on {}", id, collider);
        id
    }

    /// Register a transform coordinator moving `target`
    pub fn add_coordinator(
        &mut self,
        target: Option<ComponentId>,
        config: &CoordinatorConfig,
    ) -> GrabResult<CoordinatorId> {
        let id = CoordinatorId(self.next_coordinator);
        let coordinator = GrabTransformCoordinator::new(id, target, config)?;
        self.next_coordinator += 1;
        self.coordinators.insert(id, coordinator);
        info!("Registered {}", id);
        Ok(id)
    }

    /// Let `coordinator` drive `grabbable`
    pub fn attach(&mut self, grabbable: GrabbableId, coordinator: CoordinatorId) -> GrabResult<()> {
        if !self.coordinators.contains_key(&coordinator) {
            return Err(GrabError::UnknownCoordinator(coordinator));
        }
        let g = self
            .grabbables
            .get_mut(&grabbable)
            .ok_or(GrabError::UnknownGrabbable(grabbable))?;
        g.set_coordinator(Some(coordinator));
        Ok(())
    }

    /// Remove a grabbable
    ///
    /// Its coordinator goes with it unless another grabbable still uses it; a
    /// running transform is ended first.
    pub fn remove_grabbable(&mut self, id: GrabbableId, host: &mut dyn Host) -> GrabResult<Grabbable> {
        let grabbable = self
            .grabbables
            .remove(&id)
            .ok_or(GrabError::UnknownGrabbable(id))?;
        if self.by_collider.get(&grabbable.collider()) == Some(&id) {
            self.by_collider.remove(&grabbable.collider());
        }

        if let Some(coordinator_id) = grabbable.coordinator() {
            let shared = self
                .grabbables
                .values()
                .any(|g| g.coordinator() == Some(coordinator_id));
            if !shared {
                if let Some(mut coordinator) = self.coordinators.remove(&coordinator_id) {
                    coordinator.end_transform(host);
                }
            }
        }
        info!("Removed {}", id);
        Ok(grabbable)
    }

    /// Whether the grabbable still exists
    pub fn contains(&self, id: GrabbableId) -> bool {
        self.grabbables.contains_key(&id)
    }

    /// Look up a grabbable
    pub fn grabbable(&self, id: GrabbableId) -> Option<&Grabbable> {
        self.grabbables.get(&id)
    }

    /// Look up a grabbable mutably
    pub fn grabbable_mut(&mut self, id: GrabbableId) -> Option<&mut Grabbable> {
        self.grabbables.get_mut(&id)
    }

    /// Grabbable owning a host collider
    pub fn find_by_component(&self, component: ComponentId) -> Option<GrabbableId> {
        self.by_collider.get(&component).copied()
    }

    /// All grabbables in id order
    pub fn grabbables(&self) -> impl Iterator<Item = &Grabbable> {
        self.grabbables.values()
    }

    /// Look up a coordinator
    pub fn coordinator(&self, id: CoordinatorId) -> Option<&GrabTransformCoordinator> {
        self.coordinators.get(&id)
    }

    /// Look up a coordinator mutably
    pub fn coordinator_mut(&mut self, id: CoordinatorId) -> Option<&mut GrabTransformCoordinator> {
        self.coordinators.get_mut(&id)
    }

    /// All coordinators in id order
    pub fn coordinators(&self) -> impl Iterator<Item = &GrabTransformCoordinator> {
        self.coordinators.values()
    }

    /// All coordinators, mutably
    pub fn coordinators_mut(&mut self) -> impl Iterator<Item = &mut GrabTransformCoordinator> {
        self.coordinators.values_mut()
    }

    /// Coordinator driving a grabbable
    pub fn coordinator_of(&self, grabbable: GrabbableId) -> Option<&GrabTransformCoordinator> {
        let id = self.grabbables.get(&grabbable)?.coordinator()?;
        self.coordinators.get(&id)
    }

    /// Grab points currently holding a grabbable, 0 without a coordinator
    pub fn num_grabbers(&self, grabbable: GrabbableId) -> usize {
        self.coordinator_of(grabbable)
            .map_or(0, GrabTransformCoordinator::num_grabbers)
    }

    /// Multi grab policy of a grabbable's coordinator
    pub fn multi_grab_behavior(&self, grabbable: GrabbableId) -> Option<MultiGrabBehavior> {
        self.coordinator_of(grabbable)
            .map(GrabTransformCoordinator::multi_grab_behavior)
    }

    /// Deliver a pointer event to its grabbable, then to the coordinator
    pub fn post_event(&mut self, event: &PointerEvent, time: f32, host: &mut dyn Host) {
        let Some(grabbable) = self.grabbables.get_mut(&event.interactable) else {
            return;
        };
        grabbable.process_pointer_event(event);
        let Some(coordinator_id) = grabbable.coordinator() else {
            return;
        };
        if let Some(coordinator) = self.coordinators.get_mut(&coordinator_id) {
            coordinator.process_pointer_event(event, time, host);
        }
    }

    /// Force-cancel every grab on a coordinator
    pub fn force_cancel(
        &mut self,
        coordinator: CoordinatorId,
        host: &mut dyn Host,
    ) -> GrabResult<Vec<CancelGrabEvent>> {
        let c = self
            .coordinators
            .get_mut(&coordinator)
            .ok_or(GrabError::UnknownCoordinator(coordinator))?;
        Ok(c.force_cancel(host))
    }
}
