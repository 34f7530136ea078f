// simbridge-sensor: Sensors attached to entities, configured from flat setup
// vectors and read back as flat state vectors.
//
// Supported kinds are AIR, BRS, LMS and CAMERA; see [`setup`] for the setup
// layouts and [`output`] for the state layouts.

pub mod output;
pub mod registry;
pub mod sensor;
pub mod setup;

pub use registry::{SensorId, SensorRegistry};
pub use sensor::Sensor;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        output::{AIR_VALUES, BRS_VALUES, LMS_VALUES, air_detections, brs_detections, lms_points},
        registry::{SensorId, SensorRegistry},
        sensor::Sensor,
        setup::{AirSetup, BrsSetup, CameraSetup, LmsSetup, SensorSetup, setup_arity},
    };
}
