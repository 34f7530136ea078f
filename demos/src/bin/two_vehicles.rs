//! Two vehicles on an open plane: one driven through vehicle dynamics with a
//! fixed control input, one left idle. An AIR sensor on the driven vehicle
//! reports what it sees.
//!
//! Usage:
//!   cargo run -p simbridge-demos --bin two_vehicles -- --seconds 5 --throttle 0.6
//!   cargo run -p simbridge-demos --bin two_vehicles -- --steering 90 --scenario scenario.toml

use std::ops::ControlFlow;
use std::path::PathBuf;

use clap::Parser;
use simbridge_core::catalog::ObjectType;
use simbridge_core::data::Pose;
use simbridge_core::types::{Gear, SensorType};
use simbridge_env::{Entity, EntitySetup};
use simbridge_model::{AmesimDynamicalModel, AmesimDynamicalModelInput};
use simbridge_sensor::Sensor;
use simbridge_sensor::output::air_detections;
use simbridge_sim::Simulation;
use tracing::info;

#[derive(Parser)]
#[command(about = "Drive one vehicle past another on the headless engine")]
struct Args {
    /// Simulated duration in seconds; negative runs until interrupted
    #[arg(long, default_value_t = 3.0, allow_negative_numbers = true)]
    seconds: f64,

    /// Throttle in [0, 1]
    #[arg(long, default_value_t = 1.0)]
    throttle: f64,

    /// Steering wheel angle in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    steering: f64,

    /// Lateral gap between the two vehicles (m)
    #[arg(long, default_value_t = 4.0)]
    gap: f64,

    /// Scenario TOML (scheduler, weather, sky)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Print the state every N ticks
    #[arg(long, default_value_t = 10)]
    every: u64,

    /// Logging verbosity
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

const fn ground_pose(x: f64, y: f64) -> Pose {
    Pose::new(x, y, 0.0, 0.0, 0.0, 0.0)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    simbridge_demos::init_logging(&args.log_level)?;

    let mut env = simbridge_demos::environment(args.scenario.as_deref())?;

    // ---------------------------------------------------------------
    // 1. Entities
    // ---------------------------------------------------------------
    let mut dynamics = AmesimDynamicalModel::default();
    dynamics.set_input(AmesimDynamicalModelInput::new(
        args.throttle,
        0.0,
        args.steering.to_radians(),
        Gear::Forward,
    ));
    let model = env.insert_model(dynamics);

    let ego = env.add_entity(
        Entity::new(ObjectType::AudiA3, EntitySetup::at(ground_pose(0.0, 0.0))).with_model(model),
    )?;
    let idle = env.add_entity(Entity::new(
        ObjectType::TeslaModel3,
        EntitySetup::at(ground_pose(20.0, args.gap)),
    ))?;
    let radar = env.add_sensor_to(&ego, Sensor::new(SensorType::Air, Vec::new(), false)?)?;
    info!(%ego, %idle, "scenario ready");

    // ---------------------------------------------------------------
    // 2. Run
    // ---------------------------------------------------------------
    let mut tick = 0_u64;
    let stats = Simulation::new(&mut env)
        .with_post_step(|env| {
            tick += 1;
            if args.every == 0 || tick % args.every != 0 {
                return ControlFlow::Continue(());
            }
            if let Some(state) = env.entity(&ego).and_then(|e| e.state().ok()) {
                println!("tick {tick:>4}  {ego}: {state}");
            }
            if let Ok(sensor) = env.sensor(radar) {
                for detection in air_detections(sensor.state()) {
                    println!(
                        "           radar: id {} at {:.1} m, azimuth {:.2} rad",
                        detection.id, detection.range, detection.azimuth
                    );
                }
            }
            ControlFlow::Continue(())
        })
        .run(args.seconds)?;

    // ---------------------------------------------------------------
    // 3. Report
    // ---------------------------------------------------------------
    println!(
        "\nticks={}, simulated={:.2}s",
        stats.ticks, stats.simulated_seconds
    );
    for entity in [&ego, &idle].into_iter().filter_map(|name| env.entity(name)) {
        println!("{entity}");
    }
    Ok(())
}
