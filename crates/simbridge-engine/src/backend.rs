//! The call surface of the wrapped simulation engine.
//!
//! Everything above this crate talks to the engine exclusively through
//! [`Engine`]. The trait mirrors what the engine offers: an object factory
//! keyed by catalog type name, per-tick units keyed by object identity,
//! sensors keyed by `(object, kind, index)`, trajectory and road primitives,
//! scenario settings and scenario persistence.

use std::any::Any;
use std::path::Path;

use simbridge_core::data::{CenterOfGravityOffset, Pose, Position};
use simbridge_core::error::EngineError;
use simbridge_core::types::{LogLevel, SensorDetectability, SensorType, SkyLightPollution, SkyType};

use crate::handles::{
    ObjectHandle, PathHandle, RoadHandle, SensorHandle, SpeedProfileHandle, Trajectory,
    UnitHandle, ViewerHandle,
};
use crate::io::{
    MotionState, ObjectFlags, SchedulerSettings, SelfSensorOutput, SensorOutput, SensorParameter,
    StateActuatorInput, VehicleControlInput, WeatherSettings,
};
use crate::road::RoadDescription;

/// Trait that concrete engines must implement.
///
/// Setters are absolute: the caller resolves the unset-sentinel convention
/// before calling in.
pub trait Engine: Send + 'static {
    /// Human-readable engine name.
    fn name(&self) -> &str;

    // -- World objects --

    /// Create a new object from its catalog type name.
    fn create_object(&mut self, type_name: &str) -> Result<ObjectHandle, EngineError>;

    /// Look up an object by its unique scenario name.
    fn find_object(&self, name: &str) -> Option<ObjectHandle>;

    /// Delete an object and everything attached to it.
    fn remove_object(&mut self, object: ObjectHandle) -> Result<(), EngineError>;

    fn object_name(&self, object: ObjectHandle) -> Result<String, EngineError>;

    fn object_pose(&self, object: ObjectHandle) -> Result<Pose, EngineError>;

    fn set_object_pose(&mut self, object: ObjectHandle, pose: &Pose) -> Result<(), EngineError>;

    fn cog_offset(&self, object: ObjectHandle) -> Result<CenterOfGravityOffset, EngineError>;

    fn set_cog_offset(
        &mut self,
        object: ObjectHandle,
        offset: &CenterOfGravityOffset,
    ) -> Result<(), EngineError>;

    fn object_flags(&self, object: ObjectHandle) -> Result<ObjectFlags, EngineError>;

    fn set_collision_detectable(&mut self, object: ObjectHandle, value: bool) -> Result<(), EngineError>;

    fn set_movable(&mut self, object: ObjectHandle, value: bool) -> Result<(), EngineError>;

    fn set_sensor_detectability(
        &mut self,
        object: ObjectHandle,
        value: SensorDetectability,
    ) -> Result<(), EngineError>;

    // -- Per-tick units --

    /// Bind a unit that imposes kinematic state on `object` every tick.
    fn register_state_actuator(&mut self, object: ObjectHandle) -> Result<UnitHandle, EngineError>;

    fn state_actuator_input(&mut self, unit: UnitHandle) -> Result<&mut StateActuatorInput, EngineError>;

    /// Bind a unit that reads back the state of `object`.
    fn register_self_sensor(&mut self, object: ObjectHandle) -> Result<UnitHandle, EngineError>;

    fn self_sensor_output(&self, unit: UnitHandle) -> Result<SelfSensorOutput, EngineError>;

    /// Release any per-tick unit.
    fn unregister_unit(&mut self, unit: UnitHandle) -> Result<(), EngineError>;

    // -- Vehicle dynamics --

    /// Attach a preconfigured vehicle-dynamics model to `object`.
    fn create_vehicle_dynamics(
        &mut self,
        object: ObjectHandle,
        flat_ground: bool,
        initial_velocity: f64,
    ) -> Result<(), EngineError>;

    fn has_vehicle_dynamics(&self, object: ObjectHandle) -> bool;

    /// Bind the dynamics attached to `object`. When `use_simulation_path` is
    /// set the dynamics sample terrain height from the loaded scenario.
    fn register_vehicle_dynamics(
        &mut self,
        object: ObjectHandle,
        use_simulation_path: bool,
    ) -> Result<UnitHandle, EngineError>;

    fn vehicle_control_input(&mut self, unit: UnitHandle) -> Result<&mut VehicleControlInput, EngineError>;

    /// Kinematic state computed by the dynamics during the last tick.
    fn vehicle_state_output(&self, unit: UnitHandle) -> Result<StateActuatorInput, EngineError>;

    // -- Trajectories --

    fn create_fitted_path(&mut self, points: &[Position], tolerance: f64) -> Result<PathHandle, EngineError>;

    fn create_constant_speed_profile(&mut self, speed: f64) -> Result<SpeedProfileHandle, EngineError>;

    /// Attach a trajectory to `object` and make it the active one.
    fn create_trajectory(
        &mut self,
        object: ObjectHandle,
        path: PathHandle,
        speed_profile: SpeedProfileHandle,
    ) -> Result<Trajectory, EngineError>;

    fn active_trajectory(&self, object: ObjectHandle) -> Option<Trajectory>;

    fn path_length(&self, path: PathHandle) -> Result<f64, EngineError>;

    fn pose_at_distance(&self, path: PathHandle, distance: f64) -> Result<Pose, EngineError>;

    fn register_speed_profile(&mut self, profile: SpeedProfileHandle) -> Result<UnitHandle, EngineError>;

    fn motion_output(&self, unit: UnitHandle) -> Result<MotionState, EngineError>;

    fn register_path(&mut self, path: PathHandle, object: ObjectHandle) -> Result<UnitHandle, EngineError>;

    fn set_path_motion_input(&mut self, unit: UnitHandle, motion: MotionState) -> Result<(), EngineError>;

    fn path_state_output(&self, unit: UnitHandle) -> Result<StateActuatorInput, EngineError>;

    // -- Sensors --

    fn create_sensor(&mut self, object: ObjectHandle, kind: SensorType) -> Result<SensorHandle, EngineError>;

    /// Sensors of `kind` attached to `object`, in attachment order.
    fn attached_sensors(&self, object: ObjectHandle, kind: SensorType) -> Vec<SensorHandle>;

    fn sensor_pose(&self, sensor: SensorHandle) -> Result<Pose, EngineError>;

    fn set_sensor_pose(&mut self, sensor: SensorHandle, pose: &Pose) -> Result<(), EngineError>;

    fn set_sensor_parameter(
        &mut self,
        sensor: SensorHandle,
        parameter: SensorParameter,
    ) -> Result<(), EngineError>;

    fn register_sensor(&mut self, sensor: SensorHandle) -> Result<UnitHandle, EngineError>;

    fn sensor_output(&self, unit: UnitHandle) -> Result<SensorOutput, EngineError>;

    // -- Scenario --

    fn has_roads(&self) -> bool;

    fn add_road(&mut self, road: &RoadDescription) -> Result<RoadHandle, EngineError>;

    fn import_open_drive(&mut self, path: &Path) -> Result<(), EngineError>;

    fn set_weather(&mut self, weather: WeatherSettings);

    fn set_sky(&mut self, sky: SkyType, light_pollution: SkyLightPollution);

    fn scheduler(&self) -> SchedulerSettings;

    fn set_scheduler_frequencies(&mut self, simulation_frequency: f64, integration_frequency: f64);

    fn set_scheduler_speed(&mut self, speed: f64, ignore_frame_overrun: bool);

    fn add_free_viewer(&mut self) -> ViewerHandle;

    fn remove_all_viewers(&mut self);

    /// Persist the scenario.
    fn save(&self, path: &Path) -> Result<(), EngineError>;

    /// Replace the scenario with one previously saved.
    fn load(&mut self, path: &Path) -> Result<(), EngineError>;

    // -- Simulation --

    fn begin_simulation(&mut self) -> Result<(), EngineError>;

    /// Advance one tick. Returns the simulated seconds elapsed.
    fn advance(&mut self) -> Result<f64, EngineError>;

    fn end_simulation(&mut self) -> Result<(), EngineError>;

    fn set_log_level(&mut self, level: LogLevel);

    /// Concrete engine access for engine-specific inspection.
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessEngine;

    /// Verify the trait is object-safe (can be used as `dyn Engine`).
    #[test]
    fn trait_is_object_safe() {
        fn _accepts_boxed(_: Box<dyn Engine>) {}
    }

    #[test]
    fn trait_is_send() {
        fn _assert_send<T: Send>() {}
        _assert_send::<Box<dyn Engine>>();
    }

    #[test]
    fn headless_can_be_boxed() {
        let engine: Box<dyn Engine> = Box::new(HeadlessEngine::new());
        assert_eq!(engine.name(), "headless");
        assert!(!engine.has_roads());
        assert!(engine.as_any().downcast_ref::<HeadlessEngine>().is_some());
    }
}
