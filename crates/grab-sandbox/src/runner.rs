//! Scenario playback
//!
//! Builds a [`SimWorld`] and an [`InteractionSession`] from a scenario, then
//! plays its steps. Each frame ticks the session before integrating physics.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Quat, Vec3};
use serde::Serialize;
use tracing::{debug, info};

use grab_core::{
    ComponentId, CoordinatorId, DetectorKind, GrabbableId, GrabberId, InteractableState,
    InteractionSession, InteractorState, PointerEvent, PointerEventType, RigidBodyControl,
    SceneGraph, Transform,
};

use crate::scenario::{SandboxError, Scenario, Step};
use crate::world::SimWorld;

/// Scene object as seen by the runner
#[derive(Debug, Clone)]
pub struct ObjectHandle {
    pub name: String,
    pub component: ComponentId,
    pub grabbable: Option<GrabbableId>,
    pub coordinator: Option<CoordinatorId>,
}

/// Grabber as seen by the runner
#[derive(Debug, Clone)]
pub struct GrabberHandle {
    pub name: String,
    pub id: GrabberId,
    pub root: ComponentId,
}

/// One pointer event, by name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub kind: PointerEventType,
    pub grabber: String,
    pub object: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrabberReport {
    pub name: String,
    pub state: InteractorState,
    pub grabbing: bool,
    pub grabbed: Option<String>,
    pub hovered: Vec<String>,
    pub hover_detector: Option<DetectorKind>,
    pub grab_detector: Option<DetectorKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectReport {
    pub name: String,
    pub alive: bool,
    pub position: Option<Vec3>,
    pub state: Option<InteractableState>,
}

/// Snapshot taken after a frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub frame: u32,
    pub time: f32,
    pub grabbers: Vec<GrabberReport>,
    pub objects: Vec<ObjectReport>,
    /// Pointer events posted since the previous report
    pub events: Vec<EventRecord>,
}

type EventLog = Rc<RefCell<Vec<PointerEvent>>>;

fn look_rotation(forward: Vec3) -> Quat {
    forward
        .try_normalize()
        .map_or(Quat::IDENTITY, |dir| Quat::from_rotation_arc(Vec3::X, dir))
}

/// Plays a scenario against a simulated world
#[derive(Debug)]
pub struct Runner {
    world: SimWorld,
    session: InteractionSession,
    objects: Vec<ObjectHandle>,
    grabbers: Vec<GrabberHandle>,
    steps: Vec<Step>,
    delta_time: f32,
    frame: u32,
    log: EventLog,
}

impl Runner {
    /// Build the scene and register everything with a fresh session
    pub fn new(scenario: &Scenario) -> Result<Self, SandboxError> {
        let mut world = SimWorld::new();
        let mut session = InteractionSession::new(scenario.session.clone());
        let log: EventLog = Rc::default();
        let mut objects = Vec::with_capacity(scenario.objects.len());

        for spec in &scenario.objects {
            let component = world.spawn(
                spec.name.clone(),
                Transform::from_translation(spec.position),
                spec.shape,
            );
            world.set_simulate_physics(component, spec.simulate_physics);
            world.set_gravity_enabled(component, spec.gravity);

            let (grabbable, coordinator) = match &spec.grabbable {
                Some(config) => {
                    let config = config.clone().with_shape(spec.shape);
                    let (g, c) = match &spec.coordinator {
                        Some(coordinator) => {
                            let (g, c) =
                                session.add_grabbable_with_coordinator(component, config, coordinator)?;
                            (g, Some(c))
                        }
                        None => (session.add_grabbable(component, config), None),
                    };
                    if let Some(grabbable) = session.grabbable_mut(g) {
                        let log = Rc::clone(&log);
                        grabbable.on_pointer_event(move |event| log.borrow_mut().push(*event));
                    }
                    (Some(g), c)
                }
                None => (None, None),
            };

            objects.push(ObjectHandle {
                name: spec.name.clone(),
                component,
                grabbable,
                coordinator,
            });
        }

        for spec in &scenario.objects {
            let Some(parent) = &spec.parent else {
                continue;
            };
            let find = |name: &str| {
                objects
                    .iter()
                    .find(|o| o.name == name)
                    .map(|o| o.component)
                    .ok_or_else(|| SandboxError::UnknownObject(name.to_string()))
            };
            let child = find(&spec.name)?;
            let parent = find(parent)?;
            world.set_parent(child, Some(parent));
        }

        let mut grabbers = Vec::with_capacity(scenario.grabbers.len());
        for spec in &scenario.grabbers {
            let root = world.spawn_point(
                spec.name.clone(),
                Transform::from_rotation_translation(look_rotation(spec.forward), spec.position),
            );
            let id = session.add_grabber(root, spec.config.clone());
            world.track_hand(id, root);
            world.set_tracked(id, spec.tracked);
            world.set_thumb_tip(id, spec.thumb_tip);
            grabbers.push(GrabberHandle {
                name: spec.name.clone(),
                id,
                root,
            });
        }

        info!(
            "Loaded scenario '{}': {} objects, {} grabbers, {} steps",
            scenario.name,
            objects.len(),
            grabbers.len(),
            scenario.steps.len()
        );

        Ok(Self {
            world,
            session,
            objects,
            grabbers,
            steps: scenario.steps.clone(),
            delta_time: scenario.delta_time,
            frame: 0,
            log,
        })
    }

    pub fn world(&self) -> &SimWorld {
        &self.world
    }

    pub fn session(&self) -> &InteractionSession {
        &self.session
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Look up a scene object by name
    pub fn object(&self, name: &str) -> Result<&ObjectHandle, SandboxError> {
        self.objects
            .iter()
            .find(|o| o.name == name)
            .ok_or_else(|| SandboxError::UnknownObject(name.to_string()))
    }

    /// Look up a grabber by name
    pub fn grabber(&self, name: &str) -> Result<&GrabberHandle, SandboxError> {
        self.grabbers
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| SandboxError::UnknownGrabber(name.to_string()))
    }

    fn grabbable(&self, name: &str) -> Result<GrabbableId, SandboxError> {
        self.object(name)?
            .grabbable
            .ok_or_else(|| SandboxError::UnknownObject(name.to_string()))
    }

    // ========== Playback ==========

    /// Play every scripted step, returning one report per frame
    ///
    /// Events posted after the last tick are flushed into a trailing report.
    pub fn run(&mut self) -> Result<Vec<FrameReport>, SandboxError> {
        let steps = std::mem::take(&mut self.steps);
        let mut reports = Vec::new();
        for step in &steps {
            reports.extend(self.apply(step)?);
        }
        if !self.log.borrow().is_empty() {
            reports.push(self.report());
        }
        Ok(reports)
    }

    /// Apply one step
    pub fn apply(&mut self, step: &Step) -> Result<Vec<FrameReport>, SandboxError> {
        debug!("Step {:?}", step);
        match step {
            Step::Tick { frames } => return Ok(self.tick(*frames)),
            Step::MoveGrabber { grabber, position } => {
                let root = self.grabber(grabber)?.root;
                let rotation = self
                    .world
                    .world_transform(root)
                    .map_or(Quat::IDENTITY, |t| t.rotation);
                self.world
                    .set_world_transform(root, Transform::from_rotation_translation(rotation, *position));
            }
            Step::AimGrabber { grabber, forward } => {
                let root = self.grabber(grabber)?.root;
                let position = self.world.position(root).unwrap_or_default();
                self.world.set_world_transform(
                    root,
                    Transform::from_rotation_translation(look_rotation(*forward), position),
                );
            }
            Step::Grab { grabber, method } => {
                let id = self.grabber(grabber)?.id;
                self.session.grab(id, *method, &mut self.world);
            }
            Step::Release { grabber, method } => {
                let id = self.grabber(grabber)?.id;
                self.session.release(id, *method, &mut self.world);
            }
            Step::SetTracked { grabber, tracked } => {
                let id = self.grabber(grabber)?.id;
                self.world.set_tracked(id, *tracked);
            }
            Step::Destroy { object } => {
                let component = self.object(object)?.component;
                self.world.destroy(component);
            }
            Step::SetInputAllowed {
                object,
                method,
                allowed,
            } => {
                let id = self.grabbable(object)?;
                if let Some(grabbable) = self.session.grabbable_mut(id) {
                    grabbable.set_grab_input_method_allowed(*method, *allowed);
                }
            }
            Step::Deactivate { grabber } => {
                let id = self.grabber(grabber)?.id;
                self.session.deactivate_grabber(id, &mut self.world)?;
            }
            Step::Activate { grabber } => {
                let id = self.grabber(grabber)?.id;
                self.session.activate_grabber(id)?;
            }
            Step::ForceCancel { object } => {
                let coordinator = self
                    .object(object)?
                    .coordinator
                    .ok_or_else(|| SandboxError::UnknownObject(object.clone()))?;
                self.session.force_cancel(coordinator, &mut self.world)?;
            }
        }
        Ok(Vec::new())
    }

    /// Advance whole frames
    pub fn tick(&mut self, frames: u32) -> Vec<FrameReport> {
        (0..frames)
            .map(|_| {
                self.session.tick(self.delta_time, &mut self.world);
                self.world.step(self.delta_time);
                self.frame += 1;
                self.report()
            })
            .collect()
    }

    // ========== Reports ==========

    fn object_name(&self, id: GrabbableId) -> String {
        self.objects
            .iter()
            .find(|o| o.grabbable == Some(id))
            .map_or_else(|| id.to_string(), |o| o.name.clone())
    }

    fn grabber_name(&self, id: GrabberId) -> String {
        self.grabbers
            .iter()
            .find(|g| g.id == id)
            .map_or_else(|| id.to_string(), |g| g.name.clone())
    }

    /// Snapshot the current state, draining the event log
    pub fn report(&self) -> FrameReport {
        let events = std::mem::take(&mut *self.log.borrow_mut())
            .into_iter()
            .map(|e| EventRecord {
                kind: e.kind,
                grabber: self.grabber_name(e.interactor),
                object: self.object_name(e.interactable),
            })
            .collect();

        let grabbers = self
            .grabbers
            .iter()
            .filter_map(|handle| {
                let g = self.session.grabber(handle.id)?;
                Some(GrabberReport {
                    name: handle.name.clone(),
                    state: g.state(),
                    grabbing: g.is_grabbing(),
                    grabbed: g.grabbed().map(|id| self.object_name(id)),
                    hovered: g.hovered().iter().map(|id| self.object_name(*id)).collect(),
                    hover_detector: g.current_hover_detector(),
                    grab_detector: g.current_grab_detector(),
                })
            })
            .collect();

        let objects = self
            .objects
            .iter()
            .map(|handle| ObjectReport {
                name: handle.name.clone(),
                alive: self.world.is_alive(handle.component),
                position: self.world.position(handle.component),
                state: handle
                    .grabbable
                    .and_then(|id| self.session.grabbable(id))
                    .map(|g| g.state()),
            })
            .collect();

        FrameReport {
            frame: self.frame,
            time: self.session.time(),
            grabbers,
            objects,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{GrabberSpec, ObjectSpec};
    use grab_core::{ColliderShape, GrabberConfig, InputMethod};

    fn pick_scene() -> Scenario {
        let mut scenario = Scenario::new("Pick");
        scenario.objects.push(ObjectSpec::grabbable(
            "Ball",
            Vec3::ONE,
            ColliderShape::Sphere { radius: 10.0 },
        ));
        scenario.grabbers.push(GrabberSpec::new(
            "Hand",
            Vec3::splat(-1000.0),
            GrabberConfig::hand(),
        ));
        scenario
    }

    fn step(runner: &mut Runner, step: Step) -> Vec<FrameReport> {
        runner.apply(&step).unwrap()
    }

    fn move_hand(runner: &mut Runner, position: Vec3) {
        step(
            runner,
            Step::MoveGrabber {
                grabber: "Hand".into(),
                position,
            },
        );
    }

    fn press(runner: &mut Runner, method: InputMethod) {
        step(
            runner,
            Step::Grab {
                grabber: "Hand".into(),
                method,
            },
        );
    }

    #[test]
    fn test_pinch_grab_move_release() {
        let mut runner = Runner::new(&pick_scene()).unwrap();
        let hand = runner.grabber("Hand").unwrap().id;
        let ball = runner.object("Ball").unwrap().clone();

        runner.tick(1);
        assert!(runner.session().hovered(hand).is_empty());

        move_hand(&mut runner, Vec3::ONE);
        let report = runner.tick(1).remove(0);
        assert_eq!(report.grabbers[0].hovered, vec!["Ball".to_string()]);
        assert!(
            report
                .events
                .contains(&EventRecord {
                    kind: PointerEventType::Hover,
                    grabber: "Hand".into(),
                    object: "Ball".into(),
                })
        );

        press(&mut runner, InputMethod::Pinch);
        assert!(runner.session().is_grabbing(hand));
        assert_eq!(runner.session().grabbed_component(hand), Some(ball.component));

        move_hand(&mut runner, Vec3::splat(5.0));
        runner.tick(1);
        let position = runner.world().position(ball.component).unwrap();
        assert!(!position.abs_diff_eq(Vec3::ONE, 1e-4));
        assert!(position.abs_diff_eq(Vec3::splat(5.0), 1e-2));

        step(
            &mut runner,
            Step::Release {
                grabber: "Hand".into(),
                method: InputMethod::Pinch,
            },
        );
        assert!(!runner.session().is_grabbing(hand));
    }

    #[test]
    fn test_disallowed_method_never_grabs() {
        let mut runner = Runner::new(&pick_scene()).unwrap();
        let hand = runner.grabber("Hand").unwrap().id;
        step(
            &mut runner,
            Step::SetInputAllowed {
                object: "Ball".into(),
                method: InputMethod::Palm,
                allowed: false,
            },
        );
        move_hand(&mut runner, Vec3::ONE);
        runner.tick(1);
        assert!(!runner.session().hovered(hand).is_empty());

        press(&mut runner, InputMethod::Palm);
        assert!(!runner.session().is_grabbing(hand));
        runner.tick(1);
        assert!(!runner.session().is_grabbing(hand));

        press(&mut runner, InputMethod::Pinch);
        assert!(runner.session().is_grabbing(hand));
    }

    #[test]
    fn test_destroy_while_grabbed() {
        let mut runner = Runner::new(&pick_scene()).unwrap();
        let hand = runner.grabber("Hand").unwrap().id;
        move_hand(&mut runner, Vec3::ONE);
        runner.tick(1);
        press(&mut runner, InputMethod::Pinch);
        assert!(runner.session().is_grabbing(hand));

        step(&mut runner, Step::Destroy { object: "Ball".into() });
        move_hand(&mut runner, Vec3::splat(5.0));
        let reports = runner.tick(3);
        assert!(!runner.session().is_grabbing(hand));
        assert!(
            reports
                .iter()
                .flat_map(|r| &r.events)
                .all(|e| e.kind != PointerEventType::Move)
        );
        let last = reports.last().unwrap();
        assert!(!last.objects[0].alive);
        assert_eq!(last.objects[0].position, None);
        assert_eq!(last.grabbers[0].grabbed, None);
    }

    #[test]
    fn test_unknown_names_are_errors() {
        let mut runner = Runner::new(&pick_scene()).unwrap();
        assert!(matches!(
            runner.apply(&Step::Destroy { object: "Nope".into() }),
            Err(SandboxError::UnknownObject(_))
        ));
        assert!(matches!(
            runner.apply(&Step::Activate { grabber: "Nope".into() }),
            Err(SandboxError::UnknownGrabber(_))
        ));

        let mut scenario = pick_scene();
        scenario.objects[0].parent = Some("Missing".into());
        assert!(matches!(
            Runner::new(&scenario),
            Err(SandboxError::UnknownObject(_))
        ));
    }

    #[test]
    fn test_two_hand_carry_file() {
        let scenario: Scenario = include_str!("../scenarios/two_hand_carry.ron").parse().unwrap();
        let mut runner = Runner::new(&scenario).unwrap();
        let reports = runner.run().unwrap();

        let both_holding = reports.iter().any(|r| {
            r.grabbers
                .iter()
                .all(|g| g.grabbed.as_deref() == Some("Plank"))
        });
        assert!(both_holding);

        let plank = runner.object("Plank").unwrap().component;
        let body = runner.world().body(plank).unwrap();
        assert!(body.simulate);
        assert!(body.gravity);
        assert!(runner.world().position(plank).unwrap().z < 100.0);
    }

    #[test]
    fn test_demo_runs() {
        let mut runner = Runner::new(&Scenario::demo()).unwrap();
        let reports = runner.run().unwrap();
        assert!(!reports.is_empty());
        let last = reports.last().unwrap();
        assert!(last.grabbers.iter().all(|g| !g.grabbing));
        let events: Vec<_> = reports.iter().flat_map(|r| &r.events).collect();
        assert!(events.iter().any(|e| e.kind == PointerEventType::Select && e.object == "Apple"));
        assert!(serde_json::to_string(&reports).is_ok());
    }
}
