//! A pedestrian following a rectangular path with a speed profile, scaled at
//! runtime through the track model input.
//!
//! Usage:
//!   cargo run -p simbridge-demos --bin track_follower -- --speed 1.5
//!   cargo run -p simbridge-demos --bin track_follower -- --side 20 --boost-after 4

use std::cell::Cell;
use std::ops::ControlFlow;
use std::path::PathBuf;

use clap::Parser;
use simbridge_core::catalog::ObjectType;
use simbridge_core::data::{Pose, Position, Sentinel};
use simbridge_env::{Entity, EntitySetup};
use simbridge_model::{TrackModel, TrackModelInput, TrackModelSetup};
use simbridge_sim::Simulation;
use tracing::{info, warn};

#[derive(Parser)]
#[command(about = "Follow a square path with a track model")]
struct Args {
    /// Simulated duration in seconds
    #[arg(long, default_value_t = 10.0)]
    seconds: f64,

    /// Side length of the square path (m)
    #[arg(long, default_value_t = 10.0)]
    side: f64,

    /// Nominal speed along the path (m/s)
    #[arg(long, default_value_t = 1.4)]
    speed: f64,

    /// Double the velocity after this many seconds
    #[arg(long)]
    boost_after: Option<f64>,

    /// Scenario TOML (scheduler, weather, sky)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Logging verbosity
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn square(side: f64) -> Vec<Position> {
    vec![
        Position::new(0.0, 0.0, 0.0),
        Position::new(side, 0.0, 0.0),
        Position::new(side, side, 0.0),
        Position::new(0.0, side, 0.0),
        Position::new(0.0, 0.0, 0.0),
    ]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    simbridge_demos::init_logging(&args.log_level)?;

    let mut env = simbridge_demos::environment(args.scenario.as_deref())?;
    let track = TrackModel::new(
        TrackModelSetup::default()
            .with_path(square(args.side))
            .with_speed(args.speed),
    );
    let model = env.insert_model(track);
    let start = EntitySetup::at(Pose::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0));
    let walker = env.add_entity(Entity::new(ObjectType::Male, start).with_model(model))?;
    info!(%walker, side = args.side, speed = args.speed, "track ready");

    let elapsed = Cell::new(0.0);
    let mut boosted = false;
    let stats = Simulation::new(&mut env)
        .with_pre_step(|env| {
            let Some(after) = args.boost_after else {
                return ControlFlow::Continue(());
            };
            if !boosted && elapsed.get() >= after {
                let mut patch = TrackModelInput::unset();
                patch.velocity_multiplier = 2.0;
                match env.model_mut::<TrackModel>(model) {
                    Ok(track) => {
                        track.update_input(&patch);
                        info!(elapsed = elapsed.get(), "velocity doubled");
                    }
                    Err(err) => warn!(%err, "track model missing"),
                }
                boosted = true;
            }
            ControlFlow::Continue(())
        })
        .with_post_step(|env| {
            elapsed.set(elapsed.get() + env.engine().scheduler().tick_seconds());
            if let Some(state) = env.entity(&walker).and_then(|e| e.state().ok()) {
                println!("t={:>5.2}s  {state}", elapsed.get());
            }
            ControlFlow::Continue(())
        })
        .run(args.seconds)?;

    println!(
        "\nticks={}, simulated={:.2}s",
        stats.ticks, stats.simulated_seconds
    );
    Ok(())
}
