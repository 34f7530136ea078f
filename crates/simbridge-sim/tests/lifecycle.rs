//! Ordering rules of the unit lifecycle, exercised through whole environments.

use std::ops::ControlFlow;

use simbridge_core::SimbridgeError;
use simbridge_core::catalog::ObjectType;
use simbridge_core::data::Pose;
use simbridge_core::error::{LifecycleError, ResourceError};
use simbridge_core::lifecycle::UnitStage;
use simbridge_engine::HeadlessEngine;
use simbridge_engine::headless::EngineCall;
use simbridge_env::{Entity, EntitySetup, Environment};
use simbridge_model::{CustomDynamicalModel, EntityModel};
use simbridge_sim::{Simulation, SimulationState, simulation_model};
use simbridge_test_utils::{headless_environment, journal, vehicle_setup};

fn lifecycle_error(err: SimbridgeError) -> LifecycleError {
    match err {
        SimbridgeError::Lifecycle(inner) => inner,
        other => panic!("expected lifecycle error, got {other}"),
    }
}

#[test]
fn phases_before_registration_fail() {
    let mut env = headless_environment();
    env.add_entity(Entity::new(ObjectType::Box, EntitySetup::default()))
        .unwrap();
    let err = simulation_model::initialise(&mut env).unwrap_err();
    assert_eq!(lifecycle_error(err), LifecycleError::NotRegistered { unit: "entity" });
}

#[test]
fn registering_twice_fails() {
    let mut env = headless_environment();
    env.add_entity(Entity::new(ObjectType::Box, EntitySetup::default()))
        .unwrap();
    simulation_model::register_units(&mut env).unwrap();
    let err = simulation_model::register_units(&mut env).unwrap_err();
    assert_eq!(lifecycle_error(err), LifecycleError::AlreadyRegistered { unit: "entity" });
}

#[test]
fn terminated_units_can_register_again() {
    let mut env = headless_environment();
    let id = env.insert_model(CustomDynamicalModel::default());
    env.add_entity(Entity::new(ObjectType::AudiA3, vehicle_setup(1.0, 1.0)).with_model(id))
        .unwrap();

    let mut sim = Simulation::new(&mut env);
    sim.run(0.1).unwrap();
    drop(sim);
    assert_eq!(env.entities()[0].stage(), UnitStage::Terminated);
    assert_eq!(env.models().get(id).unwrap().core().stage(), UnitStage::Terminated);

    simulation_model::register_units(&mut env).unwrap();
    assert_eq!(env.entities()[0].stage(), UnitStage::Registered);
    assert!(env.entities()[0].is_registered());
}

#[test]
fn manual_stepping_walks_every_stage() {
    let mut env = headless_environment();
    env.add_entity(Entity::new(ObjectType::Box, EntitySetup::default()))
        .unwrap();
    let mut sim = Simulation::new(&mut env);
    assert_eq!(sim.state(), SimulationState::Uninitialised);

    sim.initialise().unwrap();
    assert_eq!(sim.state(), SimulationState::Initialised);
    assert_eq!(sim.environment().entities()[0].stage(), UnitStage::Active);

    assert_eq!(sim.step().unwrap(), ControlFlow::Continue(()));
    assert_eq!(sim.state(), SimulationState::Stepping);

    sim.terminate().unwrap();
    assert!(sim.state().is_terminated());
    let err = sim.step().unwrap_err();
    assert_eq!(lifecycle_error(err), LifecycleError::SimulationTerminated);
}

#[test]
fn unidentified_entity_cannot_bind_setup() {
    let mut engine = HeadlessEngine::new();
    let mut entity = Entity::new(ObjectType::Box, EntitySetup::default());
    let err = entity
        .apply_setup(EntitySetup::default(), &mut engine)
        .unwrap_err();
    assert_eq!(lifecycle_error(err), LifecycleError::NotIdentified { unit: "entity" });
}

#[test]
fn add_entity_is_idempotent() {
    let mut env = headless_environment();
    let name = env
        .add_entity(Entity::new(ObjectType::AudiA3, vehicle_setup(0.0, 0.0)))
        .unwrap();
    let creates = |env: &Environment| {
        journal(env).count(|c| matches!(c, EngineCall::CreateObject { .. }))
    };
    assert_eq!(creates(&env), 1);

    // Adding an entity that is already bound to that name changes nothing.
    let again = env.entity(&name).unwrap().clone();
    let second = env.add_entity(again).unwrap();
    assert_eq!(second, name);
    assert_eq!(env.entities().len(), 1);
    assert_eq!(creates(&env), 1);
}

#[test]
fn existing_entities_are_left_untouched() {
    let mut engine = HeadlessEngine::new();
    let start = Pose::new(12.0, -3.0, 0.0, 0.0, 0.0, 0.5);
    engine.insert_existing_object("Ego", "Audi_A3", start);
    let mut env = Environment::new(engine);
    let object = Entity::existing("Ego", &mut env).unwrap().object().unwrap();

    Simulation::new(&mut env).run(0.5).unwrap();

    let headless = simbridge_test_utils::headless(&env);
    let writes = headless.journal().count(|c| {
        matches!(
            c,
            EngineCall::SetObjectPose { object: o }
                | EngineCall::SetCogOffset { object: o }
                | EngineCall::SetObjectFlags { object: o }
                if *o == object
        )
    });
    assert_eq!(writes, 0);
    let state = env.entity("Ego").unwrap().state().unwrap();
    assert!((state.position.x - 12.0).abs() < 1e-9);
    assert!((state.orientation.yaw - 0.5).abs() < 1e-9);
}

#[test]
fn existing_name_must_be_present() {
    let mut env = headless_environment();
    let err = Entity::existing("Ghost", &mut env).unwrap_err();
    assert!(matches!(
        err,
        SimbridgeError::Resource(ResourceError::ObjectNotFound(ref name)) if name == "Ghost"
    ));
}
