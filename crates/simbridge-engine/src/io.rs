//! Data exchanged with the engine each tick and during scenario setup.

use serde::{Deserialize, Serialize};
use simbridge_core::data::{
    Acceleration, AngularVelocity, Orientation, Position, Sentinel, Velocity,
};
use simbridge_core::types::{Gear, SensorDetectability};

// ---------------------------------------------------------------------------
// Per-tick state
// ---------------------------------------------------------------------------

/// Input of a state-actuator unit: the full kinematic state the engine
/// imposes on the object at the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateActuatorInput {
    pub position: Position,
    pub orientation: Orientation,
    pub velocity: Velocity,
    pub acceleration: Acceleration,
    pub angular_velocity: AngularVelocity,
}

impl Default for StateActuatorInput {
    fn default() -> Self {
        Self {
            position: Position::zeroed(),
            orientation: Orientation::zeroed(),
            velocity: Velocity::zeroed(),
            acceleration: Acceleration::zeroed(),
            angular_velocity: AngularVelocity::zeroed(),
        }
    }
}

/// Output of a self-sensor unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelfSensorOutput {
    pub position: Position,
    pub orientation: Orientation,
    /// Scalar speed in m/s.
    pub velocity: f64,
    /// Yaw rate in rad/s.
    pub yaw_rate: f64,
}

/// Control input of a vehicle-dynamics unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleControlInput {
    /// Pedal position in `[0, 1]`.
    pub throttle: f64,
    /// Pedal position in `[0, 1]`.
    pub brake: f64,
    /// Steering wheel angle in radians.
    pub steering_wheel_angle: f64,
    pub gear: Gear,
}

impl Default for VehicleControlInput {
    fn default() -> Self {
        Self {
            throttle: 0.0,
            brake: 0.0,
            steering_wheel_angle: 0.0,
            gear: Gear::Forward,
        }
    }
}

/// Longitudinal motion along a path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    pub velocity: f64,
    pub acceleration: f64,
    pub distance: f64,
}

/// Per-object flags pushed as part of an entity setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFlags {
    pub collision_detectable: bool,
    pub movable: bool,
    pub detectability: SensorDetectability,
}

impl Default for ObjectFlags {
    fn default() -> Self {
        Self {
            collision_detectable: true,
            movable: true,
            detectability: SensorDetectability::Detectable,
        }
    }
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// A single sensor configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SensorParameter {
    DetectionType(i32),
    Fov(f64),
    FovHorizontal(f64),
    FovVertical(f64),
    Frequency(i32),
    FrameRate(i32),
    MaxDetectableObjects(i32),
    MaxLines(i32),
    MaxPointsPerLine(i32),
    PointSpacing(f64),
    Range(f64),
    ResolutionX(i32),
    ResolutionY(i32),
}

/// One object seen by an antenna-and-receiver sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirDetection {
    pub range: f64,
    pub azimuth: f64,
    pub elevation: f64,
    pub id: u32,
    pub velocity: f64,
    pub heading: f64,
}

/// One bounding rectangle reported by a bounding-rectangle sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrsDetection {
    pub object_id: u32,
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

/// One lane-marker point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LmsPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub curvature: f64,
}

/// RGB8 camera frame, row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl CameraImage {
    /// Black frame of the given size.
    #[must_use]
    pub fn black(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 3],
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Latest output of a sensor unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SensorOutput {
    Air(Vec<AirDetection>),
    Brs(Vec<BrsDetection>),
    /// One inner vector per detected line.
    Lms(Vec<Vec<LmsPoint>>),
    Camera(CameraImage),
}

// ---------------------------------------------------------------------------
// Scenario settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precipitation {
    #[default]
    Disabled,
    Rain,
    Snow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSettings {
    pub precipitation: Precipitation,
    /// Fog visibility in metres; `None` disables fog.
    pub fog_visibility: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    pub simulation_frequency: f64,
    pub integration_frequency: f64,
    pub speed: f64,
    pub ignore_frame_overrun: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            simulation_frequency: 20.0,
            integration_frequency: 100.0,
            speed: 1.0,
            ignore_frame_overrun: false,
        }
    }
}

impl SchedulerSettings {
    /// Simulated seconds per tick.
    pub fn tick_seconds(&self) -> f64 {
        self.simulation_frequency.recip()
    }
}
