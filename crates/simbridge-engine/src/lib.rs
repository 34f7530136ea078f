// simbridge-engine: The boundary between the simbridge lifecycle and the
// wrapped simulation engine.
//
// [`Engine`] is the only seam the upper crates see. [`HeadlessEngine`] is the
// in-memory implementation used by the tests and the demos; a binding to a
// real engine implements the same trait.

pub mod backend;
pub mod handles;
pub mod headless;
pub mod io;
pub mod road;

pub use backend::Engine;
pub use headless::HeadlessEngine;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        backend::Engine,
        handles::{
            ObjectHandle, PathHandle, RoadHandle, SensorHandle, SpeedProfileHandle, Trajectory,
            UnitHandle, ViewerHandle,
        },
        headless::{EngineCall, HeadlessEngine, Journal},
        io::{
            AirDetection, BrsDetection, CameraImage, LmsPoint, MotionState, ObjectFlags,
            Precipitation, SchedulerSettings, SelfSensorOutput, SensorOutput, SensorParameter,
            StateActuatorInput, VehicleControlInput, WeatherSettings,
        },
        road::{
            AsphaltSettings, LaneDescription, ParkingSpaceDescription, RoadDescription,
            RoadSection, SpeedLimit,
        },
    };
}
