//! One sensor mounted on an entity.

use std::fmt;

use simbridge_core::Result;
use simbridge_core::data::Sentinel;
use simbridge_core::error::{InputError, LifecycleError, ResourceError};
use simbridge_core::flat::FlatVector;
use simbridge_core::lifecycle::{Lifecycle, UnitStage};
use simbridge_core::types::SensorType;
use simbridge_engine::Engine;
use simbridge_engine::handles::{ObjectHandle, SensorHandle, UnitHandle};
use simbridge_engine::io::CameraImage;
use tracing::debug;

use crate::output;
use crate::setup::{self, SensorSetup};

const UNIT: &str = "sensor";

/// A sensor of one supported [`SensorType`].
///
/// The engine-side sensor is created (or looked up, for `existing` sensors)
/// by [`create_sensor`](Self::create_sensor) once the host object is known.
/// After registration each [`step`](Self::step) copies the latest output into
/// [`state`](Self::state), or into [`image`](Self::image) for cameras.
#[derive(Debug, Clone)]
pub struct Sensor {
    kind: SensorType,
    setup: Vec<f64>,
    existing: bool,
    lifecycle: Lifecycle,
    handle: Option<SensorHandle>,
    index: Option<usize>,
    unit: Option<UnitHandle>,
    state: Vec<f64>,
    image: CameraImage,
}

impl Sensor {
    /// Fails for unsupported kinds and for a setup that is neither empty nor
    /// of the kind's exact arity.
    pub fn new(kind: SensorType, setup: Vec<f64>, existing: bool) -> Result<Self, InputError> {
        setup::validate_setup(kind, &setup)?;
        Ok(Self {
            kind,
            setup,
            existing,
            lifecycle: Lifecycle::new(UNIT),
            handle: None,
            index: None,
            unit: None,
            state: Vec::new(),
            image: CameraImage::default(),
        })
    }

    /// A new engine-side sensor with the typed setup `setup`.
    pub fn from_setup<S: SensorSetup>(setup: &S) -> Result<Self, InputError> {
        Self::new(S::KIND, setup.to_flat(), false)
    }

    /// Bind to a sensor of `kind` already attached to the host in the
    /// loaded scenario.
    pub fn existing(kind: SensorType) -> Result<Self, InputError> {
        Self::new(kind, Vec::new(), true)
    }

    #[must_use]
    pub const fn kind(&self) -> SensorType {
        self.kind
    }

    #[must_use]
    pub fn setup(&self) -> &[f64] {
        &self.setup
    }

    #[must_use]
    pub const fn is_existing(&self) -> bool {
        self.existing
    }

    #[must_use]
    pub const fn stage(&self) -> UnitStage {
        self.lifecycle.stage()
    }

    #[must_use]
    pub const fn is_created(&self) -> bool {
        self.handle.is_some()
    }

    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.lifecycle.is_registered()
    }

    #[must_use]
    pub const fn handle(&self) -> Option<SensorHandle> {
        self.handle
    }

    /// Per-kind index on the host object.
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.index
    }

    /// Latest flat output. Empty before the first step and for cameras.
    #[must_use]
    pub fn state(&self) -> &[f64] {
        &self.state
    }

    /// Latest camera frame. Empty for every other kind.
    #[must_use]
    pub const fn image(&self) -> &CameraImage {
        &self.image
    }

    // -- Lifecycle --

    /// Create (or look up) the engine-side sensor as the `index`-th sensor of
    /// this kind on `object`, then apply the setup.
    pub fn create_sensor(
        &mut self,
        engine: &mut dyn Engine,
        object: ObjectHandle,
        index: usize,
    ) -> Result<()> {
        if self.handle.is_some() {
            return Err(LifecycleError::AlreadyCreated { unit: UNIT }.into());
        }
        let handle = if self.existing {
            engine
                .attached_sensors(object, self.kind)
                .get(index)
                .copied()
                .ok_or(ResourceError::NoAttachedSensor {
                    sensor: self.kind,
                    index,
                })?
        } else {
            engine.create_sensor(object, self.kind)?
        };
        debug!(kind = %self.kind, index, %handle, existing = self.existing, "sensor created");
        self.apply_setup(engine, handle)?;
        self.lifecycle.attach()?;
        self.handle = Some(handle);
        self.index = Some(index);
        Ok(())
    }

    fn apply_setup(&self, engine: &mut dyn Engine, handle: SensorHandle) -> Result<()> {
        if self.setup.is_empty() {
            return Ok(());
        }
        let (patch, parameters) = setup::decode(self.kind, &self.setup)?;
        if !patch.is_unset() {
            let pose = engine.sensor_pose(handle)?.merged(&patch);
            engine.set_sensor_pose(handle, &pose)?;
        }
        for parameter in parameters {
            engine.set_sensor_parameter(handle, parameter)?;
        }
        Ok(())
    }

    pub fn register_unit(&mut self, engine: &mut dyn Engine) -> Result<()> {
        let mut next = self.lifecycle;
        next.register()?;
        let handle = self.handle.ok_or(LifecycleError::NotLinked { unit: UNIT })?;
        self.unit = Some(engine.register_sensor(handle)?);
        self.lifecycle = next;
        Ok(())
    }

    pub fn initialise(&mut self, _engine: &mut dyn Engine) -> Result<()> {
        self.lifecycle.initialise()?;
        Ok(())
    }

    pub fn step(&mut self, engine: &mut dyn Engine) -> Result<()> {
        self.lifecycle.step()?;
        let unit = self.unit.ok_or(LifecycleError::NotRegistered { unit: UNIT })?;
        let latest = engine.sensor_output(unit)?;
        output::decode(latest, &mut self.state, &mut self.image);
        Ok(())
    }

    pub fn terminate(&mut self, engine: &mut dyn Engine) -> Result<()> {
        self.lifecycle.terminate()?;
        if let Some(unit) = self.unit.take() {
            engine.unregister_unit(unit)?;
        }
        Ok(())
    }

    /// Forget the engine-side sensor once its host object is gone. A
    /// registered sensor must be terminated first.
    pub fn detach(&mut self) -> Result<(), LifecycleError> {
        self.lifecycle.detach()?;
        self.handle = None;
        self.index = None;
        self.state.clear();
        Ok(())
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sensor({}", self.kind)?;
        if let Some(index) = self.index {
            write!(f, " #{index}")?;
        }
        if self.existing {
            f.write_str(", existing")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use simbridge_core::data::{Pose, UNSET};
    use simbridge_core::error::SimbridgeError;
    use simbridge_engine::HeadlessEngine;
    use simbridge_engine::headless::EngineCall;
    use simbridge_engine::io::{AirDetection, SensorOutput};

    use super::*;
    use crate::setup::{AirSetup, CameraSetup};

    fn host(engine: &mut HeadlessEngine) -> ObjectHandle {
        engine.create_object("Audi_A3").unwrap()
    }

    #[test]
    fn unsupported_kind_fails_fast() {
        assert_eq!(
            Sensor::new(SensorType::Radar, Vec::new(), false).unwrap_err(),
            InputError::UnsupportedSensor(SensorType::Radar)
        );
    }

    #[test]
    fn setup_arity_is_checked() {
        assert!(Sensor::new(SensorType::Air, vec![0.0; 10], false).is_ok());
        assert!(Sensor::new(SensorType::Air, Vec::new(), false).is_ok());
        assert!(matches!(
            Sensor::new(SensorType::Lms, vec![0.0; 10], false),
            Err(InputError::SensorSetupMismatch { expected: 11, got: 10, .. })
        ));
    }

    #[test]
    fn create_applies_setup_with_unset_skip() {
        let mut engine = HeadlessEngine::new();
        let object = host(&mut engine);
        let setup = AirSetup {
            pose: Pose::new(2.0, UNSET, 1.0, UNSET, UNSET, UNSET),
            range: 40.0,
            ..AirSetup::default()
        };
        let mut sensor = Sensor::from_setup(&setup).unwrap();
        sensor.create_sensor(&mut engine, object, 0).unwrap();

        let handle = sensor.handle().unwrap();
        assert_eq!(
            engine.sensor_pose(handle).unwrap(),
            Pose::new(2.0, 0.0, 1.0, 0.0, 0.0, 0.0)
        );
        let configured = engine
            .journal()
            .count(|c| matches!(c, EngineCall::ConfigureSensor { .. }));
        assert_eq!(configured, 2);
        assert_eq!(sensor.index(), Some(0));
    }

    #[test]
    fn create_twice_fails() {
        let mut engine = HeadlessEngine::new();
        let object = host(&mut engine);
        let mut sensor = Sensor::new(SensorType::Brs, Vec::new(), false).unwrap();
        sensor.create_sensor(&mut engine, object, 0).unwrap();
        assert!(matches!(
            sensor.create_sensor(&mut engine, object, 0),
            Err(SimbridgeError::Lifecycle(LifecycleError::AlreadyCreated { .. }))
        ));
    }

    #[test]
    fn existing_sensor_is_looked_up_by_index() {
        let mut engine = HeadlessEngine::new();
        let object = host(&mut engine);
        let first = engine.create_sensor(object, SensorType::Lms).unwrap();
        let second = engine.create_sensor(object, SensorType::Lms).unwrap();

        let mut sensor = Sensor::existing(SensorType::Lms).unwrap();
        sensor.create_sensor(&mut engine, object, 1).unwrap();
        assert_eq!(sensor.handle(), Some(second));
        assert_ne!(sensor.handle(), Some(first));

        let mut missing = Sensor::existing(SensorType::Lms).unwrap();
        assert!(matches!(
            missing.create_sensor(&mut engine, object, 2),
            Err(SimbridgeError::Resource(ResourceError::NoAttachedSensor { index: 2, .. }))
        ));
    }

    #[test]
    fn register_before_create_fails() {
        let mut engine = HeadlessEngine::new();
        let mut sensor = Sensor::new(SensorType::Air, Vec::new(), false).unwrap();
        assert!(sensor.register_unit(&mut engine).is_err());
        assert!(sensor.step(&mut engine).is_err());
    }

    #[test]
    fn step_copies_scripted_output() {
        let mut engine = HeadlessEngine::new();
        let object = host(&mut engine);
        let mut sensor = Sensor::new(SensorType::Air, Vec::new(), false).unwrap();
        sensor.create_sensor(&mut engine, object, 0).unwrap();
        engine
            .script_sensor_output(
                sensor.handle().unwrap(),
                SensorOutput::Air(vec![AirDetection {
                    range: 12.0,
                    azimuth: 0.0,
                    elevation: 0.0,
                    id: 5,
                    velocity: 1.0,
                    heading: 0.0,
                }]),
            )
            .unwrap();
        sensor.register_unit(&mut engine).unwrap();
        sensor.initialise(&mut engine).unwrap();
        sensor.step(&mut engine).unwrap();
        assert_eq!(sensor.state(), &[12.0, 0.0, 0.0, 5.0, 1.0, 0.0]);
    }

    #[test]
    fn camera_step_fills_image() {
        let mut engine = HeadlessEngine::new();
        let object = host(&mut engine);
        let setup = CameraSetup {
            resolution_x: 8.0,
            resolution_y: 4.0,
            ..CameraSetup::default()
        };
        let mut sensor = Sensor::from_setup(&setup).unwrap();
        sensor.create_sensor(&mut engine, object, 0).unwrap();
        sensor.register_unit(&mut engine).unwrap();
        sensor.initialise(&mut engine).unwrap();
        sensor.step(&mut engine).unwrap();
        assert!(sensor.state().is_empty());
        assert_eq!((sensor.image().width, sensor.image().height), (8, 4));
    }

    #[test]
    fn terminate_releases_unit_and_blocks_step() {
        let mut engine = HeadlessEngine::new();
        let object = host(&mut engine);
        let mut sensor = Sensor::new(SensorType::Air, Vec::new(), false).unwrap();
        sensor.create_sensor(&mut engine, object, 0).unwrap();
        sensor.register_unit(&mut engine).unwrap();
        assert_eq!(engine.unit_count(), 1);
        sensor.terminate(&mut engine).unwrap();
        assert_eq!(engine.unit_count(), 0);
        assert!(sensor.step(&mut engine).is_err());
        assert_eq!(sensor.stage(), UnitStage::Terminated);
    }

    #[test]
    fn terminate_before_register_fails() {
        let mut engine = HeadlessEngine::new();
        let object = host(&mut engine);
        let mut sensor = Sensor::new(SensorType::Air, Vec::new(), false).unwrap();
        assert!(matches!(
            sensor.terminate(&mut engine),
            Err(SimbridgeError::Lifecycle(LifecycleError::NotRegistered { unit: "sensor" }))
        ));
        sensor.create_sensor(&mut engine, object, 0).unwrap();
        assert!(matches!(
            sensor.terminate(&mut engine),
            Err(SimbridgeError::Lifecycle(LifecycleError::NotRegistered { unit: "sensor" }))
        ));
        assert_eq!(sensor.stage(), UnitStage::Attached);
    }

    #[test]
    fn detach_allows_recreation() {
        let mut engine = HeadlessEngine::new();
        let object = host(&mut engine);
        let mut sensor = Sensor::new(SensorType::Air, Vec::new(), false).unwrap();
        assert!(matches!(sensor.detach(), Err(LifecycleError::NotLinked { .. })));

        sensor.create_sensor(&mut engine, object, 0).unwrap();
        sensor.register_unit(&mut engine).unwrap();
        assert!(matches!(
            sensor.detach(),
            Err(LifecycleError::AlreadyRegistered { .. })
        ));
        sensor.terminate(&mut engine).unwrap();
        sensor.detach().unwrap();
        assert_eq!(sensor.handle(), None);
        assert_eq!(sensor.stage(), UnitStage::Detached);

        let other = host(&mut engine);
        sensor.create_sensor(&mut engine, other, 0).unwrap();
        assert!(sensor.is_created());
    }

    #[test]
    fn display() {
        let sensor = Sensor::existing(SensorType::Brs).unwrap();
        assert_eq!(sensor.to_string(), "Sensor(BRS, existing)");
    }
}
