//! Grabber-side motion for ray and distance grabs
//!
//! While a far grab is active the grabber reports the blender's transform as
//! its grab pose instead of its own, so the object travels to (or moves with)
//! the hand. Hand grabs never use a blender.

use glam::Quat;
use serde::{Deserialize, Serialize};

use crate::constants::{PULL_SPEED, PULL_TIME};
use crate::transform::Transform;

/// Keyframe of a [`ResponseCurve`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    /// Input
    pub time: f32,
    /// Output
    pub value: f32,
}

/// Piecewise linear curve, clamped at both ends
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseCurve {
    keys: Vec<CurveKey>,
}

impl ResponseCurve {
    /// Build a curve from `(time, value)` pairs; keys are sorted by time
    pub fn new(points: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut keys: Vec<CurveKey> = points
            .into_iter()
            .map(|(time, value)| CurveKey { time, value })
            .collect();
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    /// Sample the curve. An empty curve is the identity.
    pub fn evaluate(&self, time: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return time;
        };
        if time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }
        for pair in self.keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if time <= b.time {
                let span = b.time - a.time;
                if span <= f32::EPSILON {
                    return b.value;
                }
                return a.value + (b.value - a.value) * (time - a.time) / span;
            }
        }
        last.value
    }
}

/// Pull-to-hand settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullToHandConfig {
    /// Arrive after `pull_time` seconds instead of travelling at `pull_speed`
    pub use_absolute_time: bool,
    /// Travel speed in units per second
    pub pull_speed: f32,
    /// Travel duration in seconds
    pub pull_time: f32,
    /// Shapes alpha (absolute time) or scales speed by elapsed time
    pub curve: Option<ResponseCurve>,
}

impl Default for PullToHandConfig {
    fn default() -> Self {
        Self {
            use_absolute_time: false,
            pull_speed: PULL_SPEED,
            pull_time: PULL_TIME,
            curve: None,
        }
    }
}

/// Which blender a coordinator uses for far grabs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotionConfig {
    /// Fly the object into the hand
    PullToHand(PullToHandConfig),
    /// Keep the object glued to the pointer ray
    RelativeToPointer,
    /// Move the object by the grabber's motion, in place
    ManipulateInPlace,
}

impl Default for MotionConfig {
    fn default() -> Self {
        MotionConfig::PullToHand(PullToHandConfig::default())
    }
}

/// Per-frame inputs for a blender
#[derive(Debug, Clone, Copy)]
pub struct MotionInputs {
    /// World transform of the grabbed object, `None` once it is gone
    pub grabbable: Option<Transform>,
    /// Grabber transform for the current input method
    pub grabber: Transform,
    /// Pointer pose, if tracked
    pub pointer: Option<Transform>,
    /// Session clock in seconds
    pub time: f32,
    /// Frame time in seconds
    pub delta_time: f32,
}

/// Active pull-to-hand state
#[derive(Debug, Clone)]
pub struct PullToHand {
    config: PullToHandConfig,
    start_time: f32,
    start: Transform,
    rotation_offset: Quat,
    reached_target: bool,
    transform: Transform,
}

impl PullToHand {
    fn start(config: PullToHandConfig, object: Transform, inputs: &MotionInputs) -> Self {
        Self {
            config,
            start_time: inputs.time,
            start: object,
            rotation_offset: inputs.grabber.rotation.inverse() * object.rotation,
            reached_target: false,
            transform: object,
        }
    }

    /// Whether the object has arrived at the grabber
    pub fn has_reached_target(&self) -> bool {
        self.reached_target
    }

    fn tick(&mut self, inputs: &MotionInputs) {
        let grabber = inputs.grabber;
        let elapsed = inputs.time - self.start_time;
        if self.reached_target {
            self.transform.translation = grabber.translation;
        } else if self.config.use_absolute_time {
            let mut alpha = if self.config.pull_time > 0.0 {
                (elapsed / self.config.pull_time).clamp(0.0, 1.0)
            } else {
                1.0
            };
            if let Some(curve) = &self.config.curve {
                alpha = curve.evaluate(alpha);
            }
            self.transform = self.start.lerp(&grabber, alpha);
            if (alpha - 1.0).abs() <= 1e-4 {
                self.reached_target = true;
            }
        } else {
            let speed = match &self.config.curve {
                Some(curve) => curve.evaluate(elapsed) * self.config.pull_speed,
                None => self.config.pull_speed,
            };
            let remaining = grabber.translation - self.transform.translation;
            let step = remaining.normalize_or_zero() * speed * inputs.delta_time;
            if step.length_squared() >= remaining.length_squared() {
                self.transform.translation = grabber.translation;
                self.reached_target = true;
            } else {
                self.transform.translation += step;
            }
        }
        self.transform.rotation = (grabber.rotation * self.rotation_offset).normalize();
    }
}

/// Active relative-to-pointer state
#[derive(Debug, Clone)]
pub struct RelativeToPointer {
    object_from_pointer: Transform,
    transform: Transform,
}

/// Active manipulate-in-place state
#[derive(Debug, Clone)]
pub struct ManipulateInPlace {
    object_start: Transform,
    grabber_start: Transform,
    transform: Transform,
}

impl ManipulateInPlace {
    fn tick(&mut self, inputs: &MotionInputs) {
        let grabber = inputs.grabber;
        let delta_rotation = grabber.rotation * self.grabber_start.rotation.inverse();
        self.transform = Transform::new(
            self.object_start.translation + (grabber.translation - self.grabber_start.translation),
            (delta_rotation * self.object_start.rotation).normalize(),
            self.object_start.scale,
        );
    }
}

/// Running blender
#[derive(Debug, Clone)]
pub enum GrabMotion {
    /// See [`PullToHand`]
    PullToHand(PullToHand),
    /// See [`RelativeToPointer`]
    RelativeToPointer(RelativeToPointer),
    /// See [`ManipulateInPlace`]
    ManipulateInPlace(ManipulateInPlace),
}

impl GrabMotion {
    /// Start a blender. Returns `None` when its dependencies are missing.
    pub fn start(config: &MotionConfig, inputs: &MotionInputs) -> Option<Self> {
        let object = inputs.grabbable?;
        let motion = match config {
            MotionConfig::PullToHand(c) => {
                GrabMotion::PullToHand(PullToHand::start(c.clone(), object, inputs))
            }
            MotionConfig::RelativeToPointer => {
                let pointer = inputs.pointer?;
                GrabMotion::RelativeToPointer(RelativeToPointer {
                    object_from_pointer: object.relative_to(&pointer),
                    transform: object,
                })
            }
            MotionConfig::ManipulateInPlace => GrabMotion::ManipulateInPlace(ManipulateInPlace {
                object_start: object,
                grabber_start: inputs.grabber,
                transform: object,
            }),
        };
        Some(motion)
    }

    /// Advance one frame. Returns false when the blender lost its object and
    /// must be stopped.
    pub fn tick(&mut self, inputs: &MotionInputs) -> bool {
        if inputs.grabbable.is_none() {
            return false;
        }
        match self {
            GrabMotion::PullToHand(m) => m.tick(inputs),
            GrabMotion::RelativeToPointer(m) => {
                // hold the last pose through tracking loss
                if let Some(pointer) = inputs.pointer {
                    m.transform = m.object_from_pointer.then(&pointer);
                }
            }
            GrabMotion::ManipulateInPlace(m) => m.tick(inputs),
        }
        true
    }

    /// Transform the grabber reports while this blender runs
    pub fn transform(&self) -> Transform {
        match self {
            GrabMotion::PullToHand(m) => m.transform,
            GrabMotion::RelativeToPointer(m) => m.transform,
            GrabMotion::ManipulateInPlace(m) => m.transform,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use glam::Vec3;

    fn inputs(object: Vec3, grabber: Transform, time: f32) -> MotionInputs {
        MotionInputs {
            grabbable: Some(Transform::from_translation(object)),
            grabber,
            pointer: Some(grabber),
            time,
            delta_time: 0.1,
        }
    }

    #[test]
    fn test_curve_evaluate() {
        let curve = ResponseCurve::new([(1.0, 10.0), (0.0, 0.0)]);
        assert_abs_diff_eq!(curve.evaluate(0.5), 5.0);
        assert_abs_diff_eq!(curve.evaluate(-1.0), 0.0);
        assert_abs_diff_eq!(curve.evaluate(3.0), 10.0);
        assert_abs_diff_eq!(ResponseCurve::default().evaluate(0.3), 0.3);
    }

    #[test]
    fn test_pull_at_speed_snaps_on_arrival() {
        let config = MotionConfig::PullToHand(PullToHandConfig {
            pull_speed: 10.0,
            ..Default::default()
        });
        let hand = Transform::from_translation(Vec3::new(2.5, 0.0, 0.0));
        let mut motion = GrabMotion::start(&config, &inputs(Vec3::ZERO, hand, 0.0)).unwrap();

        assert!(motion.tick(&inputs(Vec3::ZERO, hand, 0.1)));
        assert_abs_diff_eq!(motion.transform().translation.x, 1.0, epsilon = 1e-5);
        motion.tick(&inputs(Vec3::ZERO, hand, 0.2));
        motion.tick(&inputs(Vec3::ZERO, hand, 0.3));
        assert_abs_diff_eq!(motion.transform().translation.x, 2.5, epsilon = 1e-5);
        let GrabMotion::PullToHand(pull) = &motion else {
            panic!("expected pull to hand");
        };
        assert!(pull.has_reached_target());

        // afterwards it tracks the hand exactly
        let moved = Transform::from_translation(Vec3::new(9.0, 1.0, 0.0));
        motion.tick(&inputs(Vec3::ZERO, moved, 0.4));
        assert_eq!(motion.transform().translation, moved.translation);
    }

    #[test]
    fn test_pull_absolute_time() {
        let config = MotionConfig::PullToHand(PullToHandConfig {
            use_absolute_time: true,
            pull_time: 1.0,
            ..Default::default()
        });
        let hand = Transform::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let mut motion = GrabMotion::start(&config, &inputs(Vec3::ZERO, hand, 0.0)).unwrap();
        motion.tick(&inputs(Vec3::ZERO, hand, 0.5));
        assert_abs_diff_eq!(motion.transform().translation.x, 5.0, epsilon = 1e-4);
        motion.tick(&inputs(Vec3::ZERO, hand, 1.5));
        assert_abs_diff_eq!(motion.transform().translation.x, 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_pull_keeps_rotation_offset() {
        let config = MotionConfig::default();
        let hand = Transform::from_rotation_translation(Quat::from_rotation_z(0.5), Vec3::X);
        let mut motion = GrabMotion::start(&config, &inputs(Vec3::ZERO, hand, 0.0)).unwrap();
        let turned = Transform::from_rotation_translation(Quat::from_rotation_z(1.5), Vec3::X);
        motion.tick(&inputs(Vec3::ZERO, turned, 0.1));
        // object started unrotated, so it lags the hand by the initial 0.5 rad
        let (_, angle) = motion.transform().rotation.to_axis_angle();
        assert_abs_diff_eq!(angle, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_relative_to_pointer() {
        let pointer = Transform::from_translation(Vec3::new(0.0, 0.0, 0.0));
        let object = Vec3::new(5.0, 0.0, 0.0);
        let mut motion =
            GrabMotion::start(&MotionConfig::RelativeToPointer, &inputs(object, pointer, 0.0))
                .unwrap();
        let turned = Transform::from_rotation_translation(
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::new(1.0, 0.0, 0.0),
        );
        motion.tick(&inputs(object, turned, 0.1));
        let p = motion.transform().translation;
        assert!(p.abs_diff_eq(Vec3::new(1.0, 5.0, 0.0), 1e-4), "{p}");
    }

    #[test]
    fn test_manipulate_in_place_moves_by_delta() {
        let grabber = Transform::from_translation(Vec3::new(0.0, 0.0, 0.0));
        let object = Vec3::new(100.0, 0.0, 0.0);
        let mut motion =
            GrabMotion::start(&MotionConfig::ManipulateInPlace, &inputs(object, grabber, 0.0))
                .unwrap();
        let moved = Transform::from_translation(Vec3::new(0.0, 2.0, 0.0));
        motion.tick(&inputs(object, moved, 0.1));
        let p = motion.transform().translation;
        assert!(p.abs_diff_eq(Vec3::new(100.0, 2.0, 0.0), 1e-5), "{p}");
    }

    #[test]
    fn test_missing_object_stops() {
        let hand = Transform::IDENTITY;
        let mut motion =
            GrabMotion::start(&MotionConfig::default(), &inputs(Vec3::ZERO, hand, 0.0)).unwrap();
        let mut gone = inputs(Vec3::ZERO, hand, 0.1);
        gone.grabbable = None;
        assert!(!motion.tick(&gone));
        assert!(GrabMotion::start(&MotionConfig::default(), &gone).is_none());
    }
}
