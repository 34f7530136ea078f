// simbridge-core: Value types, sentinel convention, catalog, errors and
// configuration shared by every simbridge crate.
//
// Nothing in here talks to the simulation engine. The crates above it
// (`simbridge-engine`, `simbridge-model`, ...) build the lifecycle on top of
// these definitions.

pub mod catalog;
pub mod config;
pub mod data;
pub mod error;
pub mod flat;
pub mod lifecycle;
pub mod types;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        catalog::ObjectType,
        config::ScenarioConfig,
        data::{
            Acceleration, AngularVelocity, CenterOfGravityOffset, Orientation, Pose, Position,
            Sentinel, Velocity, UNSET,
        },
        error::{
            ConfigError, EngineError, InputError, LifecycleError, ResourceError, SimbridgeError,
        },
        flat::FlatVector,
        lifecycle::{Lifecycle, UnitStage},
        types::{
            Gear, LogLevel, SensorDetectability, SensorType, SkyLightPollution, SkyType,
            WeatherType,
        },
    };
}

pub use error::SimbridgeError;

/// Convenience alias used across the workspace.
pub type Result<T, E = SimbridgeError> = std::result::Result<T, E>;
