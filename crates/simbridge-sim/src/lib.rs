// simbridge-sim: The simulation driver.
//
// [`Simulation`] owns the tick loop over an [`Environment`]: it registers and
// initialises every entity and standalone model, steps them in a fixed order
// each tick and terminates them once.
//
// [`Environment`]: simbridge_env::Environment

pub mod guard;
pub mod simulation;
pub mod simulation_model;
pub mod stats;

pub use guard::ExperimentGuard;
pub use simulation::{Simulation, SimulationState, StepCallback};
pub use stats::RunStats;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        guard::ExperimentGuard,
        simulation::{Simulation, SimulationState, StepCallback},
        stats::RunStats,
    };
}
