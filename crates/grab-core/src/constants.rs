//! Global constants for grab-core

/// Squared length below which a reference vector is treated as degenerate
pub const DEGENERATE_EPSILON: f32 = 1e-6;

/// Tolerance used when comparing floating point values for equality
pub const KINDA_SMALL_NUMBER: f32 = 1e-4;

/// Default pinch volume radius
pub const PINCH_RADIUS: f32 = 1.2;

/// Default palm volume radius
pub const PALM_RADIUS: f32 = 4.0;

/// Default palm volume offset from the hand root
pub const PALM_OFFSET: [f32; 3] = [0.0, 0.0, 0.0];

/// Default skeletal socket the pinch volume follows while idle
pub const THUMB_TIP_SOCKET: &str = "thumb_tip";

/// Default ray grab trace length
pub const RAY_LENGTH: f32 = 1000.0;

/// Default distance grab proximity sphere radius
pub const DISTANCE_FRUSTUM_RADIUS: f32 = 1000.0;

/// Default distance grab cone angle in degrees (full angle, not half angle)
pub const DISTANCE_FRUSTUM_ANGLE: f32 = 25.0;

/// Default pull-to-hand speed (units per second)
pub const PULL_SPEED: f32 = 500.0;

/// Default pull-to-hand duration in seconds when using absolute time
pub const PULL_TIME: f32 = 0.13;

/// Default grabbable sphere collider radius
pub const GRABBABLE_SPHERE_RADIUS: f32 = 10.0;

/// Default grabbable box collider half extent
pub const GRABBABLE_BOX_EXTENT: f32 = 10.0;

/// Default number of throw samples kept in the ring buffer
pub const THROW_SAMPLE_SIZE: usize = 8;

/// Default z-score beyond which a throw sample is discarded
pub const THROW_ZSCORE_THRESHOLD: f32 = 2.0;

/// Default multiplier applied to the release angular velocity
pub const THROW_ANGULAR_SCALE: f32 = 2.0;

/// Default minimum movement between recorded throw samples
pub const THROW_MIN_SAMPLE_DISTANCE: f32 = 0.002;

/// Default maximum movement between recorded throw samples
pub const THROW_MAX_SAMPLE_DISTANCE: f32 = 100.0;

/// Default maximum release speed
pub const THROW_MAX_SPEED: f32 = 1000.0;

/// Default maximum release angular speed in degrees per second
pub const THROW_MAX_ANGULAR_SPEED: f32 = 720.0;

/// Kalman process noise
pub const KALMAN_PROCESS_NOISE: f32 = 0.1;

/// Kalman measurement noise
pub const KALMAN_MEASUREMENT_NOISE: f32 = 0.01;

/// Kalman initial estimate covariance
pub const KALMAN_INITIAL_COVARIANCE: f32 = 1000.0;

/// Largest time step fed to the Kalman filter
pub const KALMAN_MAX_DT: f32 = 0.03;
