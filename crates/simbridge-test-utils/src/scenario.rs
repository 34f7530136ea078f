//! Sample setups and ready-made scenarios.

use simbridge_core::catalog::ObjectType;
use simbridge_core::data::{Pose, Position};
use simbridge_core::types::Gear;
use simbridge_env::{Entity, EntitySetup, Environment};
use simbridge_model::{AmesimDynamicalModel, AmesimDynamicalModelInput, ModelId};

use crate::env::headless_environment;

/// Setup placing a vehicle at `(x, y)` facing +x.
pub fn vehicle_setup(x: f64, y: f64) -> EntitySetup {
    EntitySetup::at(Pose::new(x, y, 0.0, 0.0, 0.0, 0.0))
}

/// An L-shaped path: 10 m along +x, then 10 m along +y.
pub fn sample_path() -> Vec<Position> {
    vec![
        Position::new(0.0, 0.0, 0.0),
        Position::new(10.0, 0.0, 0.0),
        Position::new(10.0, 10.0, 0.0),
    ]
}

/// Full throttle, no brake, wheel straight, forward gear.
pub const fn full_throttle() -> AmesimDynamicalModelInput {
    AmesimDynamicalModelInput::new(1.0, 0.0, 0.0, Gear::Forward)
}

/// A vehicle driven by vehicle dynamics next to an uncontrolled one.
#[derive(Debug)]
pub struct TwoVehicles {
    pub env: Environment,
    /// Name of the vehicle carrying `model`.
    pub controlled: String,
    /// Name of the vehicle without a model.
    pub idle: String,
    pub model: ModelId,
}

/// Build [`TwoVehicles`] with the controlled vehicle at the origin and the
/// idle one at `(0, 5)`. The model input is [`full_throttle`].
///
/// # Panics
///
/// Panics if the headless engine rejects the setup.
pub fn two_vehicles() -> TwoVehicles {
    let mut env = headless_environment();
    let mut dynamics = AmesimDynamicalModel::default();
    dynamics.set_input(full_throttle());
    let model = env.insert_model(dynamics);

    let controlled = env
        .add_entity(Entity::new(ObjectType::AudiA3, vehicle_setup(0.0, 0.0)).with_model(model))
        .expect("controlled vehicle");
    let idle = env
        .add_entity(Entity::new(ObjectType::TeslaModel3, vehicle_setup(0.0, 5.0)))
        .expect("idle vehicle");
    TwoVehicles {
        env,
        controlled,
        idle,
        model,
    }
}
