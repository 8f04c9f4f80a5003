//! Release velocity estimation for thrown objects
//!
//! Samples the grabbed object's pose once per tick while it is held, then
//! turns the recent history into a linear and angular velocity on release.

use std::collections::VecDeque;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::*;

/// How linear release velocity is estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VelocityEstimator {
    /// Least-squares slope over outlier-filtered samples
    #[default]
    LeastSquares,
    /// Constant-velocity Kalman filter updated every sample
    Kalman,
}

/// Throw tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThrowSettings {
    /// Samples kept in the history
    pub sample_size: usize,
    /// Samples further than this many standard deviations from the mean are dropped
    pub zscore_threshold: f32,
    /// Multiplier on the release angular velocity
    pub angular_scale: f32,
    /// Samples closer than this to the previous one are skipped
    pub min_sample_distance: f32,
    /// Samples further than this from the previous one are skipped
    pub max_sample_distance: f32,
    /// Release speed limit
    pub max_speed: f32,
    /// Release angular speed limit per axis, degrees per second
    pub max_angular_speed: f32,
    /// Estimator
    pub estimator: VelocityEstimator,
    /// Restore the pre-grab gravity flag on release, instead of inverting it
    pub retain_gravity: bool,
}

impl Default for ThrowSettings {
    fn default() -> Self {
        Self {
            sample_size: THROW_SAMPLE_SIZE,
            zscore_threshold: THROW_ZSCORE_THRESHOLD,
            angular_scale: THROW_ANGULAR_SCALE,
            min_sample_distance: THROW_MIN_SAMPLE_DISTANCE,
            max_sample_distance: THROW_MAX_SAMPLE_DISTANCE,
            max_speed: THROW_MAX_SPEED,
            max_angular_speed: THROW_MAX_ANGULAR_SPEED,
            estimator: VelocityEstimator::LeastSquares,
            retain_gravity: true,
        }
    }
}

impl ThrowSettings {
    /// Default settings with the Kalman estimator
    pub fn kalman() -> Self {
        Self {
            estimator: VelocityEstimator::Kalman,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct KalmanState {
    position: Vec3,
    velocity: Vec3,
    covariance: f32,
    last_time: f32,
}

impl KalmanState {
    fn new(position: Vec3, time: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            covariance: KALMAN_INITIAL_COVARIANCE,
            last_time: time,
        }
    }

    fn update(&mut self, measured: Vec3, time: f32, max_speed: f32) {
        let dt = time - self.last_time;
        self.last_time = time;
        if dt <= 0.0 || dt >= KALMAN_MAX_DT {
            return;
        }
        self.position += self.velocity * dt;
        self.covariance += KALMAN_PROCESS_NOISE;
        let gain = self.covariance / (self.covariance + KALMAN_MEASUREMENT_NOISE);
        let residual = measured - self.position;
        self.position += residual * gain;
        self.velocity += residual * gain / dt;
        self.covariance *= 1.0 - gain;
        self.velocity = self.velocity.clamp(Vec3::splat(-max_speed), Vec3::splat(max_speed));
    }
}

/// Pose history of a held object
#[derive(Debug, Clone)]
pub struct VelocityTracker {
    settings: ThrowSettings,
    positions: VecDeque<(Vec3, f32)>,
    rotations: VecDeque<(Quat, f32)>,
    kalman: Option<KalmanState>,
    tracking: bool,
}

impl Default for VelocityTracker {
    fn default() -> Self {
        Self::new(ThrowSettings::default())
    }
}

impl VelocityTracker {
    /// Create an idle tracker
    pub fn new(settings: ThrowSettings) -> Self {
        Self {
            settings,
            positions: VecDeque::new(),
            rotations: VecDeque::new(),
            kalman: None,
            tracking: false,
        }
    }

    /// Current settings
    pub fn settings(&self) -> &ThrowSettings {
        &self.settings
    }

    /// Replace settings; takes effect on the next `start_tracking`
    pub fn set_settings(&mut self, settings: ThrowSettings) {
        self.settings = settings;
    }

    /// Clear history and begin sampling
    pub fn start_tracking(&mut self, position: Vec3, time: f32) {
        self.positions.clear();
        self.rotations.clear();
        self.kalman = Some(KalmanState::new(position, time));
        self.tracking = true;
    }

    /// Stop sampling; the history is kept until the next start
    pub fn stop_tracking(&mut self) {
        self.tracking = false;
    }

    /// Whether samples are being recorded
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Number of recorded samples
    pub fn sample_count(&self) -> usize {
        self.positions.len()
    }

    /// Record the object's pose for this tick
    ///
    /// Rotation is always recorded. Returns false if the position was rejected
    /// as stationary or erratic.
    pub fn sample(&mut self, position: Vec3, rotation: Quat, time: f32) -> bool {
        if !self.tracking {
            return false;
        }
        let capacity = self.settings.sample_size.max(2);
        push_bounded(&mut self.rotations, (rotation, time), capacity);
        if let Some((last, _)) = self.positions.back() {
            let distance = last.distance(position);
            if distance < self.settings.min_sample_distance
                || distance > self.settings.max_sample_distance
            {
                if distance > self.settings.max_sample_distance {
                    tracing::debug!(
                        "Throw sample rejected, moved {:.2} between ticks",
                        distance
                    );
                }
                return false;
            }
        }
        if self.settings.estimator == VelocityEstimator::Kalman {
            if let Some(kalman) = &mut self.kalman {
                kalman.update(position, time, self.settings.max_speed);
            }
        }
        push_bounded(&mut self.positions, (position, time), capacity);
        true
    }

    /// Linear release velocity
    pub fn velocity(&self) -> Vec3 {
        if self.positions.len() <= 1 {
            return Vec3::ZERO;
        }
        let velocity = match self.settings.estimator {
            VelocityEstimator::LeastSquares => least_squares(&self.filtered_positions()),
            VelocityEstimator::Kalman => self.kalman.map(|k| k.velocity).unwrap_or(Vec3::ZERO),
        };
        velocity.clamp_length_max(self.settings.max_speed)
    }

    /// Angular release velocity in radians per second
    pub fn angular_velocity(&self) -> Vec3 {
        let mut sum = Vec3::ZERO;
        let mut count = 0;
        for (a, b) in self.rotations.iter().zip(self.rotations.iter().skip(1)) {
            let dt = b.1 - a.1;
            if dt <= 0.0 {
                continue;
            }
            let (axis, mut angle) = (b.0 * a.0.inverse()).to_axis_angle();
            if angle > std::f32::consts::PI {
                angle -= std::f32::consts::TAU;
            }
            sum += axis * angle / dt;
            count += 1;
        }
        if count == 0 {
            return Vec3::ZERO;
        }
        let limit = self.settings.max_angular_speed.to_radians();
        let average = (sum / count as f32).clamp(Vec3::splat(-limit), Vec3::splat(limit));
        average * self.settings.angular_scale
    }

    fn filtered_positions(&self) -> Vec<(Vec3, f32)> {
        let n = self.positions.len() as f32;
        let mean = self.positions.iter().map(|(p, _)| *p).sum::<Vec3>() / n;
        let variance = self
            .positions
            .iter()
            .map(|(p, _)| (*p - mean) * (*p - mean))
            .sum::<Vec3>()
            / n;
        let std_dev = Vec3::new(variance.x.sqrt(), variance.y.sqrt(), variance.z.sqrt());
        let z = |d: f32, s: f32| if s > f32::EPSILON { (d / s).abs() } else { 0.0 };
        self.positions
            .iter()
            .filter(|(p, _)| {
                let d = *p - mean;
                let score = z(d.x, std_dev.x).max(z(d.y, std_dev.y)).max(z(d.z, std_dev.z));
                score <= self.settings.zscore_threshold
            })
            .copied()
            .collect()
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, value: T, capacity: usize) {
    while queue.len() >= capacity {
        queue.pop_front();
    }
    queue.push_back(value);
}

/// Least-squares slope of position over time
fn least_squares(samples: &[(Vec3, f32)]) -> Vec3 {
    let Some((_, t0)) = samples.first() else {
        return Vec3::ZERO;
    };
    let n = samples.len() as f32;
    let (mut sum_t, mut sum_tt) = (0.0f32, 0.0f32);
    let (mut sum_p, mut sum_tp) = (Vec3::ZERO, Vec3::ZERO);
    for (p, t) in samples {
        // shift time for precision, slope is unchanged
        let t = t - t0;
        sum_t += t;
        sum_tt += t * t;
        sum_p += *p;
        sum_tp += *p * t;
    }
    let denominator = n * sum_tt - sum_t * sum_t;
    if denominator.abs() <= f32::EPSILON {
        return Vec3::ZERO;
    }
    (sum_tp * n - sum_p * sum_t) / denominator
}
