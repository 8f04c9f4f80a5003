//! Grab Sandbox
//!
//! Headless host for grab-core:
//! - In-memory scene with parenting, collision queries and simple rigid bodies
//! - RON scenario files describing objects, grabbers and scripted input
//! - Runner producing per-frame JSON reports

pub mod collision;
pub mod runner;
pub mod scenario;
pub mod world;

// Re-exports for convenience
pub use runner::{EventRecord, FrameReport, Runner};
pub use scenario::{GrabberSpec, ObjectSpec, SandboxError, Scenario, Step};
pub use world::SimWorld;
