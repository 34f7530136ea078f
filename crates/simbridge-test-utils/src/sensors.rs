//! Scripted sensor outputs on the headless engine.

use simbridge_core::Result;
use simbridge_core::error::LifecycleError;
use simbridge_engine::io::{AirDetection, SensorOutput};
use simbridge_env::Environment;
use simbridge_sensor::SensorId;

use crate::env::headless_mut;

/// An AIR detection straight ahead at `range`.
pub const fn air_detection(range: f64, id: u32) -> AirDetection {
    AirDetection {
        range,
        azimuth: 0.0,
        elevation: 0.0,
        id,
        velocity: 0.0,
        heading: 0.0,
    }
}

/// Make sensor `id` report `output` from the next tick on. The sensor must
/// already be created on the engine.
pub fn script_output(env: &mut Environment, id: SensorId, output: SensorOutput) -> Result<()> {
    let handle = env
        .sensor(id)?
        .handle()
        .ok_or(LifecycleError::NotLinked { unit: "sensor" })?;
    headless_mut(env).script_sensor_output(handle, output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use simbridge_core::types::SensorType;
    use simbridge_sensor::Sensor;

    use crate::scenario::two_vehicles;

    #[test]
    fn scripting_requires_a_created_sensor() {
        let mut env = crate::headless_environment();
        let id = env.insert_sensor(Sensor::new(SensorType::Air, Vec::new(), false).unwrap());
        assert!(script_output(&mut env, id, SensorOutput::Air(vec![])).is_err());
    }

    #[test]
    fn scripting_created_sensor() {
        let mut scenario = two_vehicles();
        let id = scenario
            .env
            .add_sensor_to(
                &scenario.controlled,
                Sensor::new(SensorType::Air, Vec::new(), false).unwrap(),
            )
            .unwrap();
        let output = SensorOutput::Air(vec![air_detection(12.0, 2)]);
        script_output(&mut scenario.env, id, output).unwrap();
    }
}
