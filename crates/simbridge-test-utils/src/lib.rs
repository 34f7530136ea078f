//! Shared test fixtures and utilities for simbridge crates.
//!
//! Provides headless environments, sample setups and scenarios, and helpers
//! for scripting sensor outputs on the headless engine.

pub mod env;
pub mod scenario;
pub mod sensors;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use env::{headless, headless_environment, headless_mut, journal};
pub use scenario::{TwoVehicles, full_throttle, sample_path, two_vehicles, vehicle_setup};
pub use sensors::{air_detection, script_output};
