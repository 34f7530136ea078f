//! Headless environment helpers.

use simbridge_engine::HeadlessEngine;
use simbridge_engine::headless::Journal;
use simbridge_env::Environment;

/// Empty environment on a fresh [`HeadlessEngine`].
pub fn headless_environment() -> Environment {
    Environment::new(HeadlessEngine::new())
}

/// The headless engine behind `env`.
///
/// # Panics
///
/// Panics if `env` runs on another engine.
pub fn headless(env: &Environment) -> &HeadlessEngine {
    env.engine_as::<HeadlessEngine>()
        .expect("environment is not backed by the headless engine")
}

/// # Panics
///
/// Panics if `env` runs on another engine.
pub fn headless_mut(env: &mut Environment) -> &mut HeadlessEngine {
    env.engine_as_mut::<HeadlessEngine>()
        .expect("environment is not backed by the headless engine")
}

/// Engine calls recorded so far.
pub fn journal(env: &Environment) -> &Journal {
    headless(env).journal()
}
