//! Identifiers and small value types shared across the interaction core

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $repr:ty, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $repr);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Handle to a grabber (one per hand or controller grab channel)
    GrabberId,
    u32,
    "grabber"
);
id_type!(
    /// Handle to a grabbable registered with the session
    GrabbableId,
    u32,
    "grabbable"
);
id_type!(
    /// Handle to a grab transform coordinator registered with the session
    CoordinatorId,
    u32,
    "coordinator"
);
id_type!(
    /// Host-side scene component handle (colliders, transform targets)
    ComponentId,
    u64,
    "component"
);

/// Input method used to grab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InputMethod {
    /// No specific method; used for forced releases
    #[default]
    Unknown,
    /// Thumb and index pinch (or controller trigger)
    Pinch,
    /// Whole hand grip (or controller grip button)
    Palm,
    /// Host defined input
    Custom,
}

impl InputMethod {
    /// Bit used in an [`InputMethods`] set
    pub fn bit(self) -> u8 {
        match self {
            InputMethod::Unknown => 0,
            InputMethod::Pinch => 1 << 0,
            InputMethod::Palm => 1 << 1,
            InputMethod::Custom => 1 << 2,
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            InputMethod::Unknown => "Unknown",
            InputMethod::Pinch => "Pinch",
            InputMethod::Palm => "Palm",
            InputMethod::Custom => "Custom",
        }
    }
}

/// Set of input methods
///
/// Adding a method twice is the same as adding it once; a grab stays alive
/// while any bit remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct InputMethods(u8);

impl InputMethods {
    /// Empty set
    pub const NONE: Self = Self(0);

    /// Pinch and palm, the methods a grabbable allows by default
    pub fn hand() -> Self {
        Self::NONE.with(InputMethod::Pinch).with(InputMethod::Palm)
    }

    /// Every method including custom input
    pub fn all() -> Self {
        Self::hand().with(InputMethod::Custom)
    }

    /// Builder variant of [`Self::insert`]
    pub fn with(mut self, method: InputMethod) -> Self {
        self.insert(method);
        self
    }

    /// Add a method
    pub fn insert(&mut self, method: InputMethod) {
        self.0 |= method.bit();
    }

    /// Remove a method
    pub fn remove(&mut self, method: InputMethod) {
        self.0 &= !method.bit();
    }

    /// Add or remove a method
    pub fn set(&mut self, method: InputMethod, enabled: bool) {
        if enabled {
            self.insert(method);
        } else {
            self.remove(method);
        }
    }

    /// Whether the method is in the set. `Unknown` is never contained.
    pub fn contains(&self, method: InputMethod) -> bool {
        method.bit() != 0 && self.0 & method.bit() != 0
    }

    /// Whether any method of `other` is also in this set
    pub fn intersects(&self, other: InputMethods) -> bool {
        self.0 & other.0 != 0
    }

    /// Methods present in both sets
    pub fn intersection(&self, other: InputMethods) -> InputMethods {
        Self(self.0 & other.0)
    }

    /// True when no method is set
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Clear every method
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

/// Grab detection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectorKind {
    /// Proximity volumes on the hand
    Hand,
    /// Line trace along the pointer
    Ray,
    /// Wide sphere narrowed to a cone around the pointer
    Distance,
}

impl DetectorKind {
    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            DetectorKind::Hand => "Hand",
            DetectorKind::Ray => "Ray",
            DetectorKind::Distance => "Distance",
        }
    }

    /// All detector kinds in hover priority order (Hand > Ray > Distance)
    pub fn priority_order() -> &'static [DetectorKind] {
        &[DetectorKind::Hand, DetectorKind::Ray, DetectorKind::Distance]
    }
}

/// Which detector kinds are allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorKinds {
    /// Hand proximity grabs
    pub hand: bool,
    /// Ray grabs
    pub ray: bool,
    /// Distance grabs
    pub distance: bool,
}

impl Default for DetectorKinds {
    fn default() -> Self {
        Self::all()
    }
}

impl DetectorKinds {
    /// Every detector allowed
    pub fn all() -> Self {
        Self {
            hand: true,
            ray: true,
            distance: true,
        }
    }

    /// Only the hand detector
    pub fn hand_only() -> Self {
        Self {
            hand: true,
            ray: false,
            distance: false,
        }
    }

    /// Whether the kind is allowed
    pub fn allows(&self, kind: DetectorKind) -> bool {
        match kind {
            DetectorKind::Hand => self.hand,
            DetectorKind::Ray => self.ray,
            DetectorKind::Distance => self.distance,
        }
    }

    /// Allow or disallow a kind
    pub fn set(&mut self, kind: DetectorKind, allowed: bool) {
        match kind {
            DetectorKind::Hand => self.hand = allowed,
            DetectorKind::Ray => self.ray = allowed,
            DetectorKind::Distance => self.distance = allowed,
        }
    }
}

/// Policy for a second grabber grabbing an object that is already held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MultiGrabBehavior {
    /// The first grabber keeps the object; later grabs are ignored
    SingleGrabFirstRetained,
    /// Later grabs evict the current grabbers
    SingleGrabTransferToSecond,
    /// Hand grabs accumulate; ray/distance grabs behave like a transfer
    #[default]
    MultiGrab,
}

/// Interaction state of a grabbable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InteractableState {
    /// Nothing hovers or selects it
    #[default]
    Normal,
    /// At least one grabber hovers it
    Hover,
    /// At least one grabber selects it
    Select,
}

/// Interaction state of a grabber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InteractorState {
    /// Idle
    #[default]
    Normal,
    /// Hovering at least one grabbable
    Hover,
    /// Holding a grabbable
    Select,
    /// Deactivated by the host
    Disabled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_methods_are_a_set() {
        let mut methods = InputMethods::NONE;
        methods.insert(InputMethod::Pinch);
        methods.insert(InputMethod::Pinch);
        assert!(methods.contains(InputMethod::Pinch));
        methods.remove(InputMethod::Pinch);
        assert!(methods.is_empty());
    }

    #[test]
    fn test_intersection() {
        let pinch = InputMethods::NONE.with(InputMethod::Pinch);
        assert_eq!(InputMethods::all().intersection(pinch), pinch);
        assert!(!pinch.intersects(InputMethods::NONE.with(InputMethod::Palm)));
    }

    #[test]
    fn test_unknown_is_never_contained() {
        assert!(!InputMethods::all().contains(InputMethod::Unknown));
        let mut methods = InputMethods::hand();
        methods.remove(InputMethod::Unknown);
        assert_eq!(methods, InputMethods::hand());
    }

    #[test]
    fn test_detector_kinds() {
        let mut kinds = DetectorKinds::hand_only();
        assert!(!kinds.allows(DetectorKind::Ray));
        kinds.set(DetectorKind::Ray, true);
        assert!(kinds.allows(DetectorKind::Ray));
        assert_eq!(DetectorKind::priority_order()[0], DetectorKind::Hand);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(GrabberId(3).to_string(), "grabber#3");
        assert_eq!(ComponentId(7).to_string(), "component#7");
    }
}
