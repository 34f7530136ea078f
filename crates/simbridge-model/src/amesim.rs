//! Vehicle driven through a preconfigured vehicle-dynamics unit.

use std::any::Any;
use std::fmt;

use simbridge_core::Result;
use simbridge_core::data::{Sentinel, UNSET, merge_field, write_if_set};
use simbridge_core::error::{InputError, LifecycleError};
use simbridge_core::flat::{FlatVector, check_arity};
use simbridge_core::types::Gear;
use simbridge_engine::Engine;
use simbridge_engine::handles::UnitHandle;
use tracing::debug;

use crate::model::{EntityModel, ModelCore};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Driver controls. Flat layout: throttle, brake, steering wheel angle, gear.
///
/// [`Gear::Undefined`] is the gear's unset value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmesimDynamicalModelInput {
    pub throttle: f64,
    pub brake: f64,
    pub steering_wheel_angle: f64,
    pub gear: Gear,
}

impl AmesimDynamicalModelInput {
    #[must_use]
    pub const fn new(throttle: f64, brake: f64, steering_wheel_angle: f64, gear: Gear) -> Self {
        Self {
            throttle,
            brake,
            steering_wheel_angle,
            gear,
        }
    }
}

impl Default for AmesimDynamicalModelInput {
    fn default() -> Self {
        Self::unset()
    }
}

impl Sentinel for AmesimDynamicalModelInput {
    fn unset() -> Self {
        Self::new(UNSET, UNSET, UNSET, Gear::Undefined)
    }

    fn zeroed() -> Self {
        Self::new(0.0, 0.0, 0.0, Gear::Neutral)
    }

    fn merge(&mut self, patch: &Self) {
        merge_field(&mut self.throttle, patch.throttle);
        merge_field(&mut self.brake, patch.brake);
        merge_field(&mut self.steering_wheel_angle, patch.steering_wheel_angle);
        if !patch.gear.is_undefined() {
            self.gear = patch.gear;
        }
    }

    fn is_unset(&self) -> bool {
        self.throttle.is_nan()
            && self.brake.is_nan()
            && self.steering_wheel_angle.is_nan()
            && self.gear.is_undefined()
    }

    fn is_fully_set(&self) -> bool {
        !self.throttle.is_nan()
            && !self.brake.is_nan()
            && !self.steering_wheel_angle.is_nan()
            && !self.gear.is_undefined()
    }
}

impl FlatVector for AmesimDynamicalModelInput {
    const ARITY: usize = 4;
    const NAME: &'static str = "AmesimDynamicalModel";

    fn from_flat(values: &[f64]) -> Result<Self, InputError> {
        check_arity(Self::NAME, Self::ARITY, values)?;
        Ok(Self::new(
            values[0],
            values[1],
            values[2],
            Gear::from_value(values[3])?,
        ))
    }

    fn write_flat(&self, out: &mut Vec<f64>) {
        out.extend_from_slice(&[
            self.throttle,
            self.brake,
            self.steering_wheel_angle,
            self.gear.to_value(),
        ]);
    }
}

impl fmt::Display for AmesimDynamicalModelInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AmesimDynamicalModelInput: (throttle: {}, brake: {}, steering_wheel_angle: {}, gear: {})",
            self.throttle, self.brake, self.steering_wheel_angle, self.gear
        )
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmesimDynamicalModelSetup {
    pub existing: bool,
    pub active: bool,
    /// Flat ground skips terrain sampling in the dynamics.
    pub is_flat_ground: bool,
    /// m/s.
    pub initial_velocity: f64,
}

impl Default for AmesimDynamicalModelSetup {
    fn default() -> Self {
        Self {
            existing: false,
            active: true,
            is_flat_ground: true,
            initial_velocity: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Feeds driver controls to the engine's vehicle dynamics and imposes the
/// resulting state on the object.
#[derive(Debug, Clone)]
pub struct AmesimDynamicalModel {
    core: ModelCore,
    setup: AmesimDynamicalModelSetup,
    input: AmesimDynamicalModelInput,
    dynamics: Option<UnitHandle>,
}

impl AmesimDynamicalModel {
    #[must_use]
    pub fn new(setup: AmesimDynamicalModelSetup) -> Self {
        Self {
            core: ModelCore::new(setup.existing, setup.active),
            setup,
            input: AmesimDynamicalModelInput::unset(),
            dynamics: None,
        }
    }

    #[must_use]
    pub const fn setup(&self) -> &AmesimDynamicalModelSetup {
        &self.setup
    }

    #[must_use]
    pub const fn input(&self) -> &AmesimDynamicalModelInput {
        &self.input
    }

    pub fn set_input(&mut self, input: AmesimDynamicalModelInput) {
        self.input = input;
    }

    pub fn update_input(&mut self, patch: &AmesimDynamicalModelInput) {
        self.input.merge(patch);
    }
}

impl Default for AmesimDynamicalModel {
    fn default() -> Self {
        Self::new(AmesimDynamicalModelSetup::default())
    }
}

impl EntityModel for AmesimDynamicalModel {
    fn name(&self) -> &'static str {
        "AmesimDynamicalModel"
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn input_arity(&self) -> usize {
        AmesimDynamicalModelInput::ARITY
    }

    fn set_flat_input(&mut self, values: &[f64]) -> Result<(), InputError> {
        self.input = AmesimDynamicalModelInput::from_flat(values)?;
        Ok(())
    }

    fn update_flat_input(&mut self, values: &[f64]) -> Result<(), InputError> {
        let patch = AmesimDynamicalModelInput::from_flat(values)?;
        self.input.merge(&patch);
        Ok(())
    }

    fn flat_input(&self) -> Vec<f64> {
        self.input.to_flat()
    }

    fn create_if_not_exists(&mut self, engine: &mut dyn Engine) -> Result<()> {
        if self.core.claim_creation()? {
            let object = self.core.object()?;
            debug!(%object, flat_ground = self.setup.is_flat_ground, "create vehicle dynamics");
            engine.create_vehicle_dynamics(
                object,
                self.setup.is_flat_ground,
                self.setup.initial_velocity,
            )?;
        }
        Ok(())
    }

    fn register_unit(&mut self, engine: &mut dyn Engine) -> Result<()> {
        if self.core.register(engine)? {
            let object = self.core.object()?;
            let unit = engine.register_vehicle_dynamics(object, !self.setup.is_flat_ground)?;
            self.dynamics = Some(unit);
        }
        Ok(())
    }

    fn apply(&mut self, engine: &mut dyn Engine) -> Result<()> {
        let dynamics = self
            .dynamics
            .ok_or(LifecycleError::NotRegistered { unit: "model" })?;
        let control = engine.vehicle_control_input(dynamics)?;
        write_if_set(&mut control.throttle, self.input.throttle);
        write_if_set(&mut control.brake, self.input.brake);
        write_if_set(&mut control.steering_wheel_angle, self.input.steering_wheel_angle);
        if !self.input.gear.is_undefined() {
            control.gear = self.input.gear;
        }

        let state = engine.vehicle_state_output(dynamics)?;
        *engine.state_actuator_input(self.core.actuator()?)? = state;
        Ok(())
    }

    fn terminate(&mut self, engine: &mut dyn Engine) -> Result<()> {
        if self.core.release(engine)? {
            if let Some(unit) = self.dynamics.take() {
                engine.unregister_unit(unit)?;
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use simbridge_engine::headless::EngineCall;
    use simbridge_engine::HeadlessEngine;

    use super::*;

    fn registered(setup: AmesimDynamicalModelSetup) -> (HeadlessEngine, AmesimDynamicalModel) {
        let mut engine = HeadlessEngine::new();
        let object = engine.create_object("Audi_A3").unwrap();
        let mut model = AmesimDynamicalModel::new(setup);
        model.link_entity(object).unwrap();
        model.create_if_not_exists(&mut engine).unwrap();
        model.register_unit(&mut engine).unwrap();
        (engine, model)
    }

    #[test]
    fn zeroed_input_is_neutral() {
        let input = AmesimDynamicalModelInput::zeroed();
        assert_eq!(input.gear, Gear::Neutral);
        assert_eq!(input.to_flat(), vec![0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn default_input_is_unset() {
        let input = AmesimDynamicalModelInput::default();
        assert!(input.is_unset());
        assert!(input.to_flat().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn flat_gear_codes() {
        let input = AmesimDynamicalModelInput::from_flat(&[0.5, 0.0, 0.1, -1.0]).unwrap();
        assert_eq!(input.gear, Gear::Reverse);
        assert_eq!(
            AmesimDynamicalModelInput::from_flat(&[0.0, 0.0, 0.0, 7.0]),
            Err(InputError::InvalidGear(7))
        );
        let undefined = AmesimDynamicalModelInput::from_flat(&[0.0, 0.0, 0.0, 2.0]).unwrap();
        assert!(undefined.gear.is_undefined());
    }

    #[test]
    fn arity_is_four() {
        let mut model = AmesimDynamicalModel::default();
        assert_eq!(model.input_arity(), 4);
        assert!(model.set_flat_input(&[0.0; 3]).is_err());
        assert!(model.set_flat_input(&[0.0; 5]).is_err());
        assert!(model.set_flat_input(&[0.0; 4]).is_ok());
    }

    #[test]
    fn update_skips_undefined_gear() {
        let mut model = AmesimDynamicalModel::default();
        model.set_input(AmesimDynamicalModelInput::new(0.2, 0.0, 0.0, Gear::Forward));
        model.update_flat_input(&[0.8, UNSET, UNSET, UNSET]).unwrap();
        assert_eq!(
            *model.input(),
            AmesimDynamicalModelInput::new(0.8, 0.0, 0.0, Gear::Forward)
        );
    }

    #[test]
    fn create_is_skipped_for_existing_dynamics() {
        let mut engine = HeadlessEngine::new();
        let object = engine.create_object("Audi_A3").unwrap();
        engine.create_vehicle_dynamics(object, true, 0.0).unwrap();
        let mut model = AmesimDynamicalModel::new(AmesimDynamicalModelSetup {
            existing: true,
            ..AmesimDynamicalModelSetup::default()
        });
        model.link_entity(object).unwrap();
        model.create_if_not_exists(&mut engine).unwrap();
        let created = engine
            .journal()
            .count(|c| matches!(c, EngineCall::CreateVehicleDynamics { .. }));
        assert_eq!(created, 1);
    }

    #[test]
    fn create_once() {
        let (mut engine, mut model) = registered(AmesimDynamicalModelSetup::default());
        model.create_if_not_exists(&mut engine).unwrap();
        let created = engine
            .journal()
            .count(|c| matches!(c, EngineCall::CreateVehicleDynamics { .. }));
        assert_eq!(created, 1);
    }

    #[test]
    fn throttle_drives_state_actuator() {
        let (mut engine, mut model) = registered(AmesimDynamicalModelSetup::default());
        model.set_input(AmesimDynamicalModelInput::new(1.0, 0.0, 0.0, Gear::Forward));
        engine.begin_simulation().unwrap();
        model.initialise(&mut engine).unwrap();

        let actuator = model.core().actuator().unwrap();
        let mut last = 0.0;
        for _ in 0..5 {
            engine.advance().unwrap();
            model.step(&mut engine).unwrap();
            let vx = engine.state_actuator_input(actuator).unwrap().velocity.x;
            assert!(vx >= last);
            last = vx;
        }
        assert!(last > 0.0);
    }

    #[test]
    fn terminate_releases_both_units() {
        let (mut engine, mut model) = registered(AmesimDynamicalModelSetup::default());
        assert_eq!(engine.unit_count(), 2);
        model.initialise(&mut engine).unwrap();
        model.terminate(&mut engine).unwrap();
        assert_eq!(engine.unit_count(), 0);
    }

    #[test]
    fn inactive_model_registers_nothing() {
        let (engine, model) = registered(AmesimDynamicalModelSetup {
            active: false,
            ..AmesimDynamicalModelSetup::default()
        });
        assert_eq!(engine.unit_count(), 0);
        assert!(!model.core().is_registered());
    }
}
