//! The simulation driver.
//!
//! [`Simulation`] borrows an [`Environment`] and runs its participants
//! through the lifecycle in a fixed order:
//!
//! ```text
//! Uninitialised --initialise / first run tick--> Initialised --step--> Stepping
//!       |                                             |                  |
//!       +--------------------- terminate -------------+------------------+--> Terminated
//! ```
//!
//! Per tick: pre-step callback, engine advance, every entity then every
//! standalone model `step`, post-step callback. A driver is either run with
//! [`run`](Simulation::run) or stepped manually with
//! [`initialise`](Simulation::initialise) and [`step`](Simulation::step),
//! never both.

use std::ops::ControlFlow;
use std::path::PathBuf;

use simbridge_core::Result;
use simbridge_core::error::{InputError, LifecycleError, SimbridgeError};
use simbridge_core::types::LogLevel;
use simbridge_env::Environment;
use tracing::{debug, info, warn};

use crate::guard::ExperimentGuard;
use crate::simulation_model;
use crate::stats::RunStats;

/// Callback invoked around every tick. Returning `Break` stops a run.
pub type StepCallback<'env> = Box<dyn FnMut(&mut Environment) -> ControlFlow<()> + 'env>;

// ---------------------------------------------------------------------------
// SimulationState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SimulationState {
    #[default]
    Uninitialised,
    /// Units registered and initialised, no tick advanced yet.
    Initialised,
    Stepping,
    Terminated,
}

impl SimulationState {
    pub const fn is_uninitialised(self) -> bool {
        matches!(self, Self::Uninitialised)
    }

    /// `true` once initialised and until terminated.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Initialised | Self::Stepping)
    }

    pub const fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriveMode {
    Run,
    Manual,
}

#[derive(Debug, Clone)]
enum GuardLocation {
    CurrentDir,
    Dir(PathBuf),
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Drives an [`Environment`] through register, initialise, step and
/// terminate.
///
/// # Example
///
/// ```
/// use std::ops::ControlFlow;
///
/// use simbridge_core::catalog::ObjectType;
/// use simbridge_engine::HeadlessEngine;
/// use simbridge_env::{Entity, EntitySetup, Environment};
/// use simbridge_sim::Simulation;
///
/// let mut env = Environment::new(HeadlessEngine::new());
/// env.add_entity(Entity::new(ObjectType::AudiA3, EntitySetup::default())).unwrap();
///
/// let stats = Simulation::new(&mut env)
///     .with_post_step(|_env| ControlFlow::Continue(()))
///     .run(1.0)
///     .unwrap();
/// assert_eq!(stats.ticks, 20);
/// ```
pub struct Simulation<'env> {
    env: &'env mut Environment,
    state: SimulationState,
    mode: Option<DriveMode>,
    pre_step: Option<StepCallback<'env>>,
    post_step: Option<StepCallback<'env>>,
    guard_location: Option<GuardLocation>,
    guard: Option<ExperimentGuard>,
    stats: RunStats,
}

impl<'env> Simulation<'env> {
    pub fn new(env: &'env mut Environment) -> Self {
        Self {
            env,
            state: SimulationState::Uninitialised,
            mode: None,
            pre_step: None,
            post_step: None,
            guard_location: None,
            guard: None,
            stats: RunStats::new(),
        }
    }

    /// Builder: callback run before each tick.
    #[must_use]
    pub fn with_pre_step(mut self, callback: impl FnMut(&mut Environment) -> ControlFlow<()> + 'env) -> Self {
        self.pre_step = Some(Box::new(callback));
        self
    }

    /// Builder: callback run after each tick.
    #[must_use]
    pub fn with_post_step(mut self, callback: impl FnMut(&mut Environment) -> ControlFlow<()> + 'env) -> Self {
        self.post_step = Some(Box::new(callback));
        self
    }

    /// Builder: keep the scenario saved as `<cwd-name>.pb` in the working
    /// directory while the simulation is live.
    #[must_use]
    pub fn with_experiment_guard(mut self) -> Self {
        self.guard_location = Some(GuardLocation::CurrentDir);
        self
    }

    /// Builder: like [`with_experiment_guard`](Self::with_experiment_guard)
    /// but in `dir`.
    #[must_use]
    pub fn with_experiment_guard_in(mut self, dir: impl Into<PathBuf>) -> Self {
        self.guard_location = Some(GuardLocation::Dir(dir.into()));
        self
    }

    pub const fn state(&self) -> SimulationState {
        self.state
    }

    pub const fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn environment(&self) -> &Environment {
        &*self.env
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut *self.env
    }

    /// Forward `level` to the engine's own logger.
    pub fn set_log_level(&mut self, level: LogLevel) {
        self.env.set_log_level(level);
    }

    fn claim_mode(&mut self, mode: DriveMode) -> Result<(), LifecycleError> {
        match self.mode {
            Some(current) if current != mode => Err(LifecycleError::ModeConflict),
            _ => {
                self.mode = Some(mode);
                Ok(())
            }
        }
    }

    const fn require_uninitialised(&self) -> Result<(), LifecycleError> {
        match self.state {
            SimulationState::Uninitialised => Ok(()),
            SimulationState::Terminated => Err(LifecycleError::SimulationTerminated),
            SimulationState::Initialised | SimulationState::Stepping => {
                Err(LifecycleError::SimulationAlreadyInitialised)
            }
        }
    }

    const fn require_live(&self) -> Result<(), LifecycleError> {
        match self.state {
            SimulationState::Initialised | SimulationState::Stepping => Ok(()),
            SimulationState::Terminated => Err(LifecycleError::SimulationTerminated),
            SimulationState::Uninitialised => Err(LifecycleError::SimulationNotInitialised),
        }
    }

    /// Start the engine run, then register and initialise every participant.
    fn begin(&mut self) -> Result<()> {
        if let Some(location) = &self.guard_location {
            let guard = match location {
                GuardLocation::CurrentDir => ExperimentGuard::new(&*self.env)?,
                GuardLocation::Dir(dir) => ExperimentGuard::in_dir(&*self.env, dir)?,
            };
            self.guard = Some(guard);
        }
        self.env.engine_mut().begin_simulation()?;
        self.state = SimulationState::Initialised;
        simulation_model::register_units(self.env)?;
        simulation_model::initialise(self.env)?;
        debug!("simulation initialised");
        Ok(())
    }

    /// Register and initialise every participant for manual stepping.
    pub fn initialise(&mut self) -> Result<()> {
        self.require_uninitialised()?;
        self.claim_mode(DriveMode::Manual)?;
        self.begin()
    }

    fn tick(&mut self) -> Result<ControlFlow<()>> {
        if let Some(pre_step) = self.pre_step.as_mut() {
            if pre_step(self.env).is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
        if self.state.is_uninitialised() {
            self.begin()?;
        }
        let dt = self.env.engine_mut().advance()?;
        simulation_model::step(self.env)?;
        self.stats.record(dt);
        self.state = SimulationState::Stepping;
        match self.post_step.as_mut() {
            Some(post_step) => Ok(post_step(self.env)),
            None => Ok(ControlFlow::Continue(())),
        }
    }

    /// Advance one tick. `Break` reports that a callback asked to stop.
    pub fn step(&mut self) -> Result<ControlFlow<()>> {
        self.claim_mode(DriveMode::Manual)?;
        self.require_live()?;
        self.tick()
    }

    /// Run for `seconds` of simulated time, or until a callback breaks when
    /// `seconds` is negative. Participants are initialised on the first tick
    /// and always terminated at the end. A NaN duration is rejected before
    /// anything starts.
    pub fn run(&mut self, seconds: f64) -> Result<RunStats> {
        if seconds.is_nan() {
            return Err(InputError::UndefinedDuration.into());
        }
        self.claim_mode(DriveMode::Run)?;
        self.require_uninitialised()?;

        let dt = self.env.engine().scheduler().tick_seconds();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let ticks = (seconds >= 0.0).then(|| (seconds / dt).round() as u64);
        info!(seconds, ?ticks, "simulation run started");

        let outcome = self.run_ticks(ticks);
        let terminated = if self.state.is_live() {
            self.terminate()
        } else {
            self.state = SimulationState::Terminated;
            Ok(())
        };
        outcome?;
        terminated?;
        info!(ticks = self.stats.ticks, seconds = self.stats.simulated_seconds, "simulation run finished");
        Ok(self.stats)
    }

    fn run_ticks(&mut self, ticks: Option<u64>) -> Result<()> {
        let mut done = 0_u64;
        while ticks.is_none_or(|limit| done < limit) {
            if self.tick()?.is_break() {
                debug!(tick = done, "run stopped by callback");
                break;
            }
            done += 1;
        }
        Ok(())
    }

    /// Release every participant's units and end the engine run. Every
    /// participant is attempted; the first failure is returned.
    pub fn terminate(&mut self) -> Result<()> {
        self.require_live()?;
        self.state = SimulationState::Terminated;
        let participants = simulation_model::terminate(self.env);
        let engine = self.env.engine_mut().end_simulation().map_err(SimbridgeError::from);
        self.guard = None;
        debug!("simulation terminated");
        participants.and(engine)
    }
}

impl Drop for Simulation<'_> {
    fn drop(&mut self) {
        if self.state.is_live() {
            warn!("simulation dropped without terminate, engine units stay bound");
        }
    }
}

impl std::fmt::Debug for Simulation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("stats", &self.stats)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use simbridge_core::catalog::ObjectType;
    use simbridge_engine::HeadlessEngine;
    use simbridge_engine::headless::EngineCall;
    use simbridge_env::{Entity, EntitySetup};

    fn env() -> Environment {
        let mut env = Environment::new(HeadlessEngine::new());
        env.add_entity(Entity::new(ObjectType::AudiA3, EntitySetup::default()))
            .unwrap();
        env
    }

    fn calls(env: &Environment, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        env.engine_as::<HeadlessEngine>().unwrap().journal().count(predicate)
    }

    fn lifecycle_error(err: SimbridgeError) -> LifecycleError {
        match err {
            SimbridgeError::Lifecycle(inner) => inner,
            other => panic!("expected lifecycle error, got {other}"),
        }
    }

    #[test]
    fn run_advances_whole_ticks() {
        let mut env = env();
        let mut sim = Simulation::new(&mut env);
        let stats = sim.run(0.5).unwrap();
        assert_eq!(stats.ticks, 10);
        assert!((stats.simulated_seconds - 0.5).abs() < 1e-9);
        assert_eq!(sim.state(), SimulationState::Terminated);
        drop(sim);
        assert_eq!(calls(&env, |c| matches!(c, EngineCall::EndSimulation)), 1);
    }

    #[test]
    fn negative_duration_runs_until_break() {
        let mut env = env();
        let mut count = 0;
        let stats = Simulation::new(&mut env)
            .with_post_step(|_| {
                count += 1;
                if count == 7 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .run(-1.0)
            .unwrap();
        assert_eq!(stats.ticks, 7);
    }

    #[test]
    fn nan_duration_is_rejected_up_front() {
        let mut env = env();
        let mut sim = Simulation::new(&mut env);
        assert!(matches!(
            sim.run(f64::NAN),
            Err(SimbridgeError::Input(InputError::UndefinedDuration))
        ));
        assert_eq!(sim.state(), SimulationState::Uninitialised);
        // The drive mode is still free.
        sim.initialise().unwrap();
        sim.step().unwrap();
        sim.terminate().unwrap();
        drop(sim);
        assert_eq!(calls(&env, |c| matches!(c, EngineCall::BeginSimulation)), 1);
    }

    #[test]
    fn pre_step_break_before_first_tick_skips_initialisation() {
        let mut env = env();
        let stats = Simulation::new(&mut env)
            .with_pre_step(|_| ControlFlow::Break(()))
            .run(1.0)
            .unwrap();
        assert_eq!(stats.ticks, 0);
        assert_eq!(calls(&env, |c| matches!(c, EngineCall::BeginSimulation)), 0);
    }

    #[test]
    fn pre_step_runs_before_initialisation() {
        let mut env = env();
        let mut seen = Vec::new();
        Simulation::new(&mut env)
            .with_pre_step(|env| {
                seen.push(env.entities()[0].is_registered());
                ControlFlow::Continue(())
            })
            .run(0.1)
            .unwrap();
        assert_eq!(seen, [false, true]);
    }

    #[test]
    fn manual_stepping() {
        let mut env = env();
        let mut sim = Simulation::new(&mut env);
        let err = sim.step().unwrap_err();
        assert_eq!(lifecycle_error(err), LifecycleError::SimulationNotInitialised);

        sim.initialise().unwrap();
        assert_eq!(sim.state(), SimulationState::Initialised);
        assert!(sim.step().unwrap().is_continue());
        assert!(sim.step().unwrap().is_continue());
        assert_eq!(sim.state(), SimulationState::Stepping);
        assert_eq!(sim.stats().ticks, 2);

        sim.terminate().unwrap();
        let err = sim.step().unwrap_err();
        assert_eq!(lifecycle_error(err), LifecycleError::SimulationTerminated);
        let err = sim.terminate().unwrap_err();
        assert_eq!(lifecycle_error(err), LifecycleError::SimulationTerminated);
    }

    #[test]
    fn initialise_twice_fails() {
        let mut env = env();
        let mut sim = Simulation::new(&mut env);
        sim.initialise().unwrap();
        let err = sim.initialise().unwrap_err();
        assert_eq!(lifecycle_error(err), LifecycleError::SimulationAlreadyInitialised);
        sim.terminate().unwrap();
    }

    #[test]
    fn run_and_step_do_not_mix() {
        let mut env = env();
        let mut sim = Simulation::new(&mut env);
        sim.initialise().unwrap();
        let err = sim.run(1.0).unwrap_err();
        assert_eq!(lifecycle_error(err), LifecycleError::ModeConflict);
        sim.terminate().unwrap();

        let mut env = self::env();
        let mut sim = Simulation::new(&mut env);
        sim.run(0.1).unwrap();
        let err = sim.step().unwrap_err();
        assert_eq!(lifecycle_error(err), LifecycleError::ModeConflict);
        let err = sim.run(0.1).unwrap_err();
        assert_eq!(lifecycle_error(err), LifecycleError::SimulationTerminated);
    }

    #[test]
    fn terminate_before_initialise_fails() {
        let mut env = env();
        let mut sim = Simulation::new(&mut env);
        let err = sim.terminate().unwrap_err();
        assert_eq!(lifecycle_error(err), LifecycleError::SimulationNotInitialised);
    }

    #[test]
    fn experiment_guard_spans_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let scenario_dir = dir.path().join("demo");
        std::fs::create_dir(&scenario_dir).unwrap();
        let file = scenario_dir.join("demo.pb");

        let mut env = env();
        let mut existed = false;
        let saved = file.clone();
        Simulation::new(&mut env)
            .with_experiment_guard_in(&scenario_dir)
            .with_post_step(|_| {
                existed = saved.is_file();
                ControlFlow::Continue(())
            })
            .run(0.05)
            .unwrap();
        assert!(existed);
        assert!(!file.exists());
    }

    #[test]
    fn log_level_is_forwarded() {
        let mut env = env();
        let mut sim = Simulation::new(&mut env);
        sim.set_log_level(LogLevel::Debug);
        drop(sim);
        assert_eq!(
            env.engine_as::<HeadlessEngine>().unwrap().log_level(),
            LogLevel::Debug
        );
    }
}
