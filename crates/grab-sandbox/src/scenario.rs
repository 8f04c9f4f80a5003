//! Scenario file serialization
//!
//! A scenario lists the scene, the grabbers and a script of steps. Files are
//! RON; every section except the object and grabber names may be omitted.

use std::path::Path;
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use grab_core::{
    ColliderShape, CoordinatorConfig, GrabError, GrabbableConfig, GrabberConfig, InputMethod,
    InputMethods, MotionConfig, MultiGrabBehavior, SessionConfig, ThrowSettings,
};

/// Current scenario file version
pub const SCENARIO_VERSION: u32 = 1;

fn default_version() -> u32 {
    SCENARIO_VERSION
}

fn default_delta_time() -> f32 {
    1.0 / 60.0
}

fn default_forward() -> Vec3 {
    Vec3::X
}

fn default_coordinator() -> Option<CoordinatorConfig> {
    Some(CoordinatorConfig::default())
}

fn default_true() -> bool {
    true
}

/// Errors loading, saving or running a scenario
#[derive(Debug, Clone, thiserror::Error)]
pub enum SandboxError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
    #[error("Unknown object: {0}")]
    UnknownObject(String),
    #[error("Unknown grabber: {0}")]
    UnknownGrabber(String),
    #[error(transparent)]
    Grab(#[from] GrabError),
}

/// Scene object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectSpec {
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub shape: ColliderShape,
    /// Attach parent, by object name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// `None` for plain scenery
    #[serde(default = "default_grabbable")]
    pub grabbable: Option<GrabbableConfig>,
    /// Coordinator moving this object; ignored for scenery
    #[serde(default = "default_coordinator")]
    pub coordinator: Option<CoordinatorConfig>,
    #[serde(default)]
    pub simulate_physics: bool,
    #[serde(default)]
    pub gravity: bool,
}

fn default_grabbable() -> Option<GrabbableConfig> {
    Some(GrabbableConfig::default())
}

impl ObjectSpec {
    /// Grabbable sphere with default settings
    pub fn grabbable(name: impl Into<String>, position: Vec3, shape: ColliderShape) -> Self {
        Self {
            name: name.into(),
            position,
            shape,
            parent: None,
            grabbable: default_grabbable(),
            coordinator: default_coordinator(),
            simulate_physics: false,
            gravity: false,
        }
    }
}

/// Hand or controller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GrabberSpec {
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    /// Pointer direction
    #[serde(default = "default_forward")]
    pub forward: Vec3,
    #[serde(default)]
    pub config: GrabberConfig,
    /// Thumb tip offset from the hand root; pinch follows the root when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_tip: Option<Vec3>,
    /// Pointer tracking available
    #[serde(default = "default_true")]
    pub tracked: bool,
}

impl GrabberSpec {
    pub fn new(name: impl Into<String>, position: Vec3, config: GrabberConfig) -> Self {
        Self {
            name: name.into(),
            position,
            forward: Vec3::X,
            config,
            thumb_tip: None,
            tracked: true,
        }
    }
}

/// One scripted action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Step {
    /// Advance the session and the world
    Tick { frames: u32 },
    /// Teleport a grabber's root
    MoveGrabber { grabber: String, position: Vec3 },
    /// Point a grabber's forward axis along a direction
    AimGrabber { grabber: String, forward: Vec3 },
    /// Press an input
    Grab { grabber: String, method: InputMethod },
    /// Release an input
    Release { grabber: String, method: InputMethod },
    /// Toggle pointer tracking
    SetTracked { grabber: String, tracked: bool },
    /// Destroy a scene object
    Destroy { object: String },
    /// Allow or forbid an input method on a grabbable
    SetInputAllowed {
        object: String,
        method: InputMethod,
        allowed: bool,
    },
    /// Disable a grabber, dropping what it holds
    Deactivate { grabber: String },
    /// Re-enable a grabber
    Activate { grabber: String },
    /// Cancel every grab on an object's coordinator
    ForceCancel { object: String },
}

/// Complete scripted session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    #[serde(default = "default_version")]
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub session: SessionConfig,
    /// Seconds per frame
    #[serde(default = "default_delta_time")]
    pub delta_time: f32,
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
    #[serde(default)]
    pub grabbers: Vec<GrabberSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl Scenario {
    /// Empty scenario
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: SCENARIO_VERSION,
            name: name.into(),
            session: SessionConfig::default(),
            delta_time: default_delta_time(),
            objects: Vec::new(),
            grabbers: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Built-in demo: a near pinch, a far pull and a two hand carry
    pub fn demo() -> Self {
        let mut scenario = Self::new("Demo");
        let ball = ColliderShape::Sphere { radius: 5.0 };

        scenario
            .objects
            .push(ObjectSpec::grabbable("Apple", Vec3::new(20.0, 0.0, 100.0), ball));

        let mut crate_ = ObjectSpec::grabbable(
            "Crate",
            Vec3::new(300.0, 0.0, 100.0),
            ColliderShape::Box {
                extent: Vec3::splat(15.0),
            },
        );
        crate_.coordinator = Some(
            CoordinatorConfig::default()
                .with_multi_grab_behavior(MultiGrabBehavior::MultiGrab)
                .with_throwable(ThrowSettings::default()),
        );
        crate_.simulate_physics = true;
        scenario.objects.push(crate_);

        let mut lamp = ObjectSpec::grabbable("Lamp", Vec3::new(-200.0, 0.0, 100.0), ball);
        lamp.coordinator = Some(
            CoordinatorConfig::default().with_distance_grab_motion(Some(MotionConfig::RelativeToPointer)),
        );
        lamp.grabbable = Some(GrabbableConfig::default().with_input_methods(InputMethods::all()));
        scenario.objects.push(lamp);

        scenario.objects.push(ObjectSpec {
            grabbable: None,
            ..ObjectSpec::grabbable("Table", Vec3::new(100.0, 0.0, 50.0), ColliderShape::default_box())
        });

        scenario.grabbers.push(GrabberSpec::new(
            "Left",
            Vec3::new(0.0, 20.0, 100.0),
            GrabberConfig::hand(),
        ));
        scenario.grabbers.push(GrabberSpec::new(
            "Right",
            Vec3::new(0.0, -20.0, 100.0),
            GrabberConfig::controller(),
        ));

        let left = || "Left".to_string();
        let right = || "Right".to_string();
        scenario.steps = vec![
            Step::MoveGrabber {
                grabber: left(),
                position: Vec3::new(20.0, 0.0, 100.0),
            },
            Step::Tick { frames: 1 },
            Step::Grab {
                grabber: left(),
                method: InputMethod::Pinch,
            },
            Step::MoveGrabber {
                grabber: left(),
                position: Vec3::new(20.0, 40.0, 140.0),
            },
            Step::Tick { frames: 5 },
            Step::Release {
                grabber: left(),
                method: InputMethod::Pinch,
            },
            Step::AimGrabber {
                grabber: right(),
                forward: Vec3::new(300.0, 20.0, 0.0),
            },
            Step::Tick { frames: 1 },
            Step::Grab {
                grabber: right(),
                method: InputMethod::Palm,
            },
            Step::Tick { frames: 30 },
            Step::MoveGrabber {
                grabber: right(),
                position: Vec3::new(60.0, -20.0, 150.0),
            },
            Step::Tick { frames: 5 },
            Step::Release {
                grabber: right(),
                method: InputMethod::Palm,
            },
            Step::Tick { frames: 10 },
        ];
        scenario
    }

    /// Save to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SandboxError> {
        let content = self.to_ron()?;
        std::fs::write(path.as_ref(), content).map_err(|e| SandboxError::Io(e.to_string()))?;
        Ok(())
    }

    /// Pretty RON text
    pub fn to_ron(&self) -> Result<String, SandboxError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SandboxError::Serialize(e.to_string()))
    }

    /// Load from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SandboxError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| SandboxError::Io(e.to_string()))?;
        content.parse()
    }
}

impl FromStr for Scenario {
    type Err = SandboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ron::from_str(s).map_err(|e| SandboxError::Deserialize(e.to_string()))
    }
}
