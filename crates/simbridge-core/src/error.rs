use thiserror::Error;

use crate::types::SensorType;

/// Top-level error type for every simbridge crate.
#[derive(Debug, Error)]
pub enum SimbridgeError {
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Lifecycle-order violations. These always indicate a caller bug.
///
/// `unit` names the kind of participant that rejected the call
/// (`"model"`, `"sensor"`, `"entity"`, `"simulation"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("{unit} is already linked to an object")]
    AlreadyLinked { unit: &'static str },

    #[error("{unit} is not linked to an object")]
    NotLinked { unit: &'static str },

    #[error("{unit} is already registered")]
    AlreadyRegistered { unit: &'static str },

    #[error("{unit} is not registered")]
    NotRegistered { unit: &'static str },

    #[error("{unit} was already created")]
    AlreadyCreated { unit: &'static str },

    #[error("{unit} is already bound to an object")]
    AlreadyIdentified { unit: &'static str },

    #[error("{unit} is not bound to an object")]
    NotIdentified { unit: &'static str },

    #[error("{unit} has been terminated")]
    Terminated { unit: &'static str },

    #[error("Simulation is already initialised")]
    SimulationAlreadyInitialised,

    #[error("Simulation is not initialised")]
    SimulationNotInitialised,

    #[error("Simulation has been terminated")]
    SimulationTerminated,

    #[error("Simulation driver cannot mix run() and step()")]
    ModeConflict,
}

/// Argument-shape errors.
///
/// Copy + static messages for cheap propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("{target} expects {expected} values, got {got}")]
    ArityMismatch {
        target: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{sensor} setup expects {expected} values, got {got}")]
    SensorSetupMismatch {
        sensor: SensorType,
        expected: usize,
        got: usize,
    },

    #[error("Sensor type {0} is not supported")]
    UnsupportedSensor(SensorType),

    #[error("Invalid gear code: {0}")]
    InvalidGear(i64),

    #[error("Number of segments must be greater than zero")]
    ZeroSegments,

    #[error("Simulated duration must be a number")]
    UndefinedDuration,

    #[error("Path needs at least two points, got {0}")]
    PathTooShort(usize),
}

/// Missing or conflicting scenario resources.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Entity has a pre-existing type; add it by name instead")]
    PreExistingType,

    #[error("Entity has no concrete object type; add it with add_entity")]
    NotPreExistingType,

    #[error("Scenario already contains roads")]
    RoadAlreadyPresent,

    #[error("Failed to import road network {path}: {reason}")]
    NetworkImport { path: String, reason: String },

    #[error("Model not found: {0}")]
    ModelNotFound(usize),

    #[error("Sensor not found: {0}")]
    SensorNotFound(usize),

    #[error("Model {0} already drives another participant")]
    ModelInUse(usize),

    #[error("Model {id} is not a {expected}")]
    ModelTypeMismatch { id: usize, expected: &'static str },

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Object has no {sensor} sensor with index {index}")]
    NoAttachedSensor { sensor: SensorType, index: usize },

    #[error("Object {0} has no active trajectory")]
    TrajectoryMissing(String),
}

/// Failures reported by the engine itself.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown {kind} handle: {id}")]
    UnknownHandle { kind: &'static str, id: u64 },

    #[error("Unknown object type: {0}")]
    UnknownObjectType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed scenario file: {0}")]
    Malformed(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid {field} frequency: {value} (must be > 0)")]
    InvalidFrequency { field: &'static str, value: f64 },

    #[error("integration frequency must be >= simulation frequency")]
    IntegrationSlowerThanSimulation,

    #[error("Invalid scheduler speed: {0} (must be > 0)")]
    InvalidSpeed(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simbridge_error_from_lifecycle_error() {
        let err = LifecycleError::NotRegistered { unit: "model" };
        let top: SimbridgeError = err.into();
        assert!(matches!(top, SimbridgeError::Lifecycle(_)));
        assert!(top.to_string().contains("model is not registered"));
    }

    #[test]
    fn simbridge_error_from_input_error() {
        let err = InputError::ArityMismatch {
            target: "AmesimDynamicalModel",
            expected: 4,
            got: 3,
        };
        let top: SimbridgeError = err.into();
        assert!(matches!(top, SimbridgeError::Input(_)));
        assert!(top.to_string().contains("expects 4 values, got 3"));
    }

    #[test]
    fn simbridge_error_from_resource_error() {
        let top: SimbridgeError = ResourceError::ObjectNotFound("Car_1".into()).into();
        assert!(matches!(top, SimbridgeError::Resource(_)));
        assert!(top.to_string().contains("Car_1"));
    }

    #[test]
    fn simbridge_error_from_config_error() {
        let top: SimbridgeError = ConfigError::InvalidSpeed(-1.0).into();
        assert!(matches!(top, SimbridgeError::Config(_)));
        assert!(top.to_string().contains("-1"));
    }

    #[test]
    fn engine_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EngineError = io_err.into();
        assert!(matches!(err, EngineError::Io(_)));
    }

    #[test]
    fn input_error_is_copy() {
        let err = InputError::ZeroSegments;
        let err2 = err;
        assert_eq!(err, err2);
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            InputError::UnsupportedSensor(SensorType::Radar).to_string(),
            "Sensor type RADAR is not supported"
        );
        assert_eq!(
            InputError::SensorSetupMismatch {
                sensor: SensorType::Air,
                expected: 10,
                got: 7,
            }
            .to_string(),
            "AIR setup expects 10 values, got 7"
        );
        assert_eq!(
            LifecycleError::ModeConflict.to_string(),
            "Simulation driver cannot mix run() and step()"
        );
        assert_eq!(
            ResourceError::NoAttachedSensor {
                sensor: SensorType::Brs,
                index: 1,
            }
            .to_string(),
            "Object has no BRS sensor with index 1"
        );
    }
}
