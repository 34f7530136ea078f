//! A model whose input is the kinematic state itself.

use std::any::Any;
use std::fmt;

use simbridge_core::Result;
use simbridge_core::data::{
    Acceleration, AngularVelocity, Orientation, Position, Sentinel, Velocity,
};
use simbridge_core::error::InputError;
use simbridge_core::flat::{FlatVector, check_arity};
use simbridge_engine::Engine;

use crate::model::{EntityModel, ModelCore};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Kinematic state written into the state actuator every tick.
///
/// Flat layout (15 values): position, orientation, acceleration, velocity,
/// angular velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CustomDynamicalModelInput {
    pub position: Position,
    pub orientation: Orientation,
    pub acceleration: Acceleration,
    pub velocity: Velocity,
    pub angular_velocity: AngularVelocity,
}

impl Sentinel for CustomDynamicalModelInput {
    fn unset() -> Self {
        Self {
            position: Position::unset(),
            orientation: Orientation::unset(),
            acceleration: Acceleration::unset(),
            velocity: Velocity::unset(),
            angular_velocity: AngularVelocity::unset(),
        }
    }

    fn zeroed() -> Self {
        Self {
            position: Position::zeroed(),
            orientation: Orientation::zeroed(),
            acceleration: Acceleration::zeroed(),
            velocity: Velocity::zeroed(),
            angular_velocity: AngularVelocity::zeroed(),
        }
    }

    fn merge(&mut self, patch: &Self) {
        self.position.merge(&patch.position);
        self.orientation.merge(&patch.orientation);
        self.acceleration.merge(&patch.acceleration);
        self.velocity.merge(&patch.velocity);
        self.angular_velocity.merge(&patch.angular_velocity);
    }

    fn is_unset(&self) -> bool {
        self.position.is_unset()
            && self.orientation.is_unset()
            && self.acceleration.is_unset()
            && self.velocity.is_unset()
            && self.angular_velocity.is_unset()
    }

    fn is_fully_set(&self) -> bool {
        self.position.is_fully_set()
            && self.orientation.is_fully_set()
            && self.acceleration.is_fully_set()
            && self.velocity.is_fully_set()
            && self.angular_velocity.is_fully_set()
    }
}

impl FlatVector for CustomDynamicalModelInput {
    const ARITY: usize = 15;
    const NAME: &'static str = "CustomDynamicalModel";

    fn from_flat(values: &[f64]) -> Result<Self, InputError> {
        check_arity(Self::NAME, Self::ARITY, values)?;
        Ok(Self {
            position: Position::from_flat(&values[0..3])?,
            orientation: Orientation::from_flat(&values[3..6])?,
            acceleration: Acceleration::from_flat(&values[6..9])?,
            velocity: Velocity::from_flat(&values[9..12])?,
            angular_velocity: AngularVelocity::from_flat(&values[12..15])?,
        })
    }

    fn write_flat(&self, out: &mut Vec<f64>) {
        self.position.write_flat(out);
        self.orientation.write_flat(out);
        self.acceleration.write_flat(out);
        self.velocity.write_flat(out);
        self.angular_velocity.write_flat(out);
    }
}

impl fmt::Display for CustomDynamicalModelInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CustomDynamicalModelInput: (position: {}, orientation: {}, acceleration: {}, \
             velocity: {}, angular_velocity: {})",
            self.position, self.orientation, self.acceleration, self.velocity, self.angular_velocity
        )
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomDynamicalModelSetup {
    pub existing: bool,
    pub active: bool,
}

impl Default for CustomDynamicalModelSetup {
    fn default() -> Self {
        Self {
            existing: false,
            active: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Writes caller-provided kinematic state straight into the engine.
///
/// Fields left unset keep whatever the actuator held on the previous tick.
#[derive(Debug, Clone)]
pub struct CustomDynamicalModel {
    core: ModelCore,
    input: CustomDynamicalModelInput,
}

impl CustomDynamicalModel {
    #[must_use]
    pub fn new(setup: CustomDynamicalModelSetup) -> Self {
        Self {
            core: ModelCore::new(setup.existing, setup.active),
            input: CustomDynamicalModelInput::unset(),
        }
    }

    #[must_use]
    pub const fn input(&self) -> &CustomDynamicalModelInput {
        &self.input
    }

    pub fn set_input(&mut self, input: CustomDynamicalModelInput) {
        self.input = input;
    }

    pub fn update_input(&mut self, patch: &CustomDynamicalModelInput) {
        self.input.merge(patch);
    }
}

impl Default for CustomDynamicalModel {
    fn default() -> Self {
        Self::new(CustomDynamicalModelSetup::default())
    }
}

impl EntityModel for CustomDynamicalModel {
    fn name(&self) -> &'static str {
        "CustomDynamicalModel"
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn input_arity(&self) -> usize {
        CustomDynamicalModelInput::ARITY
    }

    fn set_flat_input(&mut self, values: &[f64]) -> Result<(), InputError> {
        self.input = CustomDynamicalModelInput::from_flat(values)?;
        Ok(())
    }

    fn update_flat_input(&mut self, values: &[f64]) -> Result<(), InputError> {
        let patch = CustomDynamicalModelInput::from_flat(values)?;
        self.input.merge(&patch);
        Ok(())
    }

    fn flat_input(&self) -> Vec<f64> {
        self.input.to_flat()
    }

    fn apply(&mut self, engine: &mut dyn Engine) -> Result<()> {
        let actuator = engine.state_actuator_input(self.core.actuator()?)?;
        actuator.position.merge(&self.input.position);
        actuator.orientation.merge(&self.input.orientation);
        actuator.acceleration.merge(&self.input.acceleration);
        actuator.velocity.merge(&self.input.velocity);
        actuator.angular_velocity.merge(&self.input.angular_velocity);
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
    use simbridge_core::data::UNSET;
    use simbridge_core::lifecycle::UnitStage;
    use simbridge_engine::HeadlessEngine;

    use super::*;

    fn registered() -> (HeadlessEngine, CustomDynamicalModel) {
        let mut engine = HeadlessEngine::new();
        let object = engine.create_object("Box").unwrap();
        let mut model = CustomDynamicalModel::default();
        model.link_entity(object).unwrap();
        model.create_if_not_exists(&mut engine).unwrap();
        model.register_unit(&mut engine).unwrap();
        (engine, model)
    }

    #[test]
    fn default_input_is_unset() {
        let model = CustomDynamicalModel::default();
        assert!(model.input().is_unset());
        assert!(model.flat_input().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn flat_layout_order() {
        let values: Vec<f64> = (0..15).map(f64::from).collect();
        let input = CustomDynamicalModelInput::from_flat(&values).unwrap();
        assert_eq!(input.position, Position::new(0.0, 1.0, 2.0));
        assert_eq!(input.acceleration, Acceleration::new(6.0, 7.0, 8.0));
        assert_eq!(input.velocity, Velocity::new(9.0, 10.0, 11.0));
        assert_eq!(input.to_flat(), values);
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let mut model = CustomDynamicalModel::default();
        assert_eq!(
            model.set_flat_input(&[0.0; 14]),
            Err(InputError::ArityMismatch {
                target: "CustomDynamicalModel",
                expected: 15,
                got: 14
            })
        );
        assert!(model.update_flat_input(&[0.0; 16]).is_err());
    }

    #[test]
    fn update_with_all_unset_is_noop() {
        let mut model = CustomDynamicalModel::default();
        model.set_flat_input(&[1.0; 15]).unwrap();
        model.update_flat_input(&[UNSET; 15]).unwrap();
        assert_eq!(model.flat_input(), vec![1.0; 15]);
    }

    #[test]
    fn step_writes_only_set_fields() {
        let (mut engine, mut model) = registered();
        let unit = model.core().actuator().unwrap();
        engine.state_actuator_input(unit).unwrap().position = Position::new(5.0, 5.0, 5.0);

        let mut input = CustomDynamicalModelInput::unset();
        input.velocity = Velocity::new(2.0, 0.0, 0.0);
        input.position.x = 1.0;
        model.set_input(input);
        model.initialise(&mut engine).unwrap();
        model.step(&mut engine).unwrap();

        let actuator = *engine.state_actuator_input(unit).unwrap();
        assert_eq!(actuator.position, Position::new(1.0, 5.0, 5.0));
        assert_eq!(actuator.velocity, Velocity::new(2.0, 0.0, 0.0));
        assert_eq!(model.core().stage(), UnitStage::Active);
    }

    #[test]
    fn step_before_register_fails() {
        let mut engine = HeadlessEngine::new();
        let mut model = CustomDynamicalModel::default();
        model.link_entity(engine.create_object("Box").unwrap()).unwrap();
        assert!(model.step(&mut engine).is_err());
        assert!(model.initialise(&mut engine).is_err());
    }

    #[test]
    fn step_after_terminate_fails() {
        let (mut engine, mut model) = registered();
        model.initialise(&mut engine).unwrap();
        model.terminate(&mut engine).unwrap();
        assert!(model.step(&mut engine).is_err());
        assert!(model.terminate(&mut engine).is_err());
        assert_eq!(engine.unit_count(), 0);
    }

    #[test]
    fn display_names_every_part() {
        let text = CustomDynamicalModelInput::zeroed().to_string();
        assert!(text.starts_with("CustomDynamicalModelInput: (position: Position"));
        assert!(text.contains("angular_velocity: AngularVelocity"));
    }
}
