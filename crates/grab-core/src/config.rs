//! Grabber, detector and debug configuration
//!
//! All structures can be serialized and loaded from scenario or settings files.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::types::{DetectorKinds, InputMethods};

/// Hand proximity detector configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HandDetectorConfig {
    /// Pinch volume radius
    pub pinch_radius: f32,
    /// Palm volume radius
    pub palm_radius: f32,
    /// Palm volume offset from the hand root
    pub palm_offset: Vec3,
    /// Skeletal socket the pinch volume follows while idle
    pub thumb_tip_socket: String,
}

impl Default for HandDetectorConfig {
    fn default() -> Self {
        Self {
            pinch_radius: PINCH_RADIUS,
            palm_radius: PALM_RADIUS,
            palm_offset: Vec3::from(PALM_OFFSET),
            thumb_tip_socket: THUMB_TIP_SOCKET.to_string(),
        }
    }
}

/// Ray detector configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RayDetectorConfig {
    /// Trace length
    pub length: f32,
}

impl Default for RayDetectorConfig {
    fn default() -> Self {
        Self { length: RAY_LENGTH }
    }
}

/// Distance detector configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DistanceDetectorConfig {
    /// Radius of the coarse proximity sphere
    pub frustum_radius: f32,
    /// Full cone angle in degrees
    pub frustum_angle: f32,
}

impl Default for DistanceDetectorConfig {
    fn default() -> Self {
        Self {
            frustum_radius: DISTANCE_FRUSTUM_RADIUS,
            frustum_angle: DISTANCE_FRUSTUM_ANGLE,
        }
    }
}

/// Per grabber configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GrabberConfig {
    /// Input methods this grabber may grab with
    pub allowed_input_methods: InputMethods,
    /// Detectors this grabber runs
    pub allowed_detectors: DetectorKinds,
    /// Hand detector settings
    pub hand: HandDetectorConfig,
    /// Ray detector settings
    pub ray: RayDetectorConfig,
    /// Distance detector settings
    pub distance: DistanceDetectorConfig,
}

impl Default for GrabberConfig {
    fn default() -> Self {
        Self::hand()
    }
}

impl GrabberConfig {
    /// Tracked hand with near and far detection
    pub fn hand() -> Self {
        Self {
            allowed_input_methods: InputMethods::hand(),
            allowed_detectors: DetectorKinds::all(),
            hand: HandDetectorConfig::default(),
            ray: RayDetectorConfig::default(),
            distance: DistanceDetectorConfig::default(),
        }
    }

    /// Tracked controller: trigger, grip and custom buttons
    pub fn controller() -> Self {
        Self {
            allowed_input_methods: InputMethods::all(),
            ..Self::hand()
        }
    }

    /// Near-field grabbing only
    pub fn near_only() -> Self {
        Self {
            allowed_detectors: DetectorKinds::hand_only(),
            ..Self::hand()
        }
    }

    /// Set allowed input methods
    pub fn with_input_methods(mut self, methods: InputMethods) -> Self {
        self.allowed_input_methods = methods;
        self
    }

    /// Set allowed detectors
    pub fn with_detectors(mut self, detectors: DetectorKinds) -> Self {
        self.allowed_detectors = detectors;
        self
    }
}

/// Debug switches, all disabled by default
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Report detector volumes from `debug_shapes`
    pub draw_detectors: bool,
    /// Report grabbable collider shapes from `debug_shapes`
    pub draw_collider_shapes: bool,
    /// Trace every posted pointer event
    pub log_pointer_events: bool,
}

impl DebugConfig {
    /// Everything on
    pub fn verbose() -> Self {
        Self {
            draw_detectors: true,
            draw_collider_shapes: true,
            log_pointer_events: true,
        }
    }
}

/// Session wide settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Debug switches
    pub debug: DebugConfig,
    /// Configuration used by `add_default_grabber`
    pub grabber: GrabberConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DetectorKind;

    #[test]
    fn test_defaults_match_constants() {
        let config = GrabberConfig::default();
        assert_eq!(config.hand.pinch_radius, 1.2);
        assert_eq!(config.hand.palm_radius, 4.0);
        assert_eq!(config.ray.length, 1000.0);
        assert_eq!(config.distance.frustum_angle, 25.0);
        assert!(config.allowed_detectors.allows(DetectorKind::Distance));
    }

    #[test]
    fn test_near_only_preset() {
        let config = GrabberConfig::near_only();
        assert!(config.allowed_detectors.allows(DetectorKind::Hand));
        assert!(!config.allowed_detectors.allows(DetectorKind::Ray));
    }

    #[test]
    fn test_debug_disabled_by_default() {
        let debug = DebugConfig::default();
        assert!(!debug.draw_detectors && !debug.draw_collider_shapes && !debug.log_pointer_events);
    }
}
