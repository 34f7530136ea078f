//! Shared setup for the simbridge demo binaries.
//!
//! Each binary under `src/bin/` builds a scenario on the headless engine,
//! runs it and prints what the entities did.

use std::path::Path;

use simbridge_core::Result;
use simbridge_core::config::ScenarioConfig;
use simbridge_engine::HeadlessEngine;
use simbridge_env::Environment;
use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::FmtSubscriber;

/// Map a CLI verbosity name onto a tracing level. Unknown names fall back to
/// `info`.
pub fn parse_level(name: &str) -> Level {
    match name.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global `fmt` subscriber.
pub fn init_logging(level: &str) -> std::result::Result<(), SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

/// Headless environment, optionally configured from a scenario TOML file.
pub fn environment(config: Option<&Path>) -> Result<Environment> {
    let mut env = Environment::new(HeadlessEngine::new());
    if let Some(path) = config {
        let config = ScenarioConfig::from_file(path)?;
        env.apply_config(&config)?;
    }
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_scenario(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("scenario.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn level_names() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("loud"), Level::INFO);
    }

    #[test]
    fn environment_reads_scenario_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_scenario(
            dir.path(),
            "[scheduler]\nsimulation_frequency = 50.0\nintegration_frequency = 200.0\n",
        );
        let env = environment(Some(&path)).unwrap();
        assert!((env.engine().scheduler().simulation_frequency - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_scenario_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_scenario(
            dir.path(),
            "[scheduler]\nsimulation_frequency = 100.0\nintegration_frequency = 10.0\n",
        );
        assert!(environment(Some(&path)).is_err());
    }
}
