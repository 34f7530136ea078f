use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{SkyLightPollution, SkyType, WeatherType};

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_simulation_frequency() -> f64 {
    20.0
}
const fn default_integration_frequency() -> f64 {
    100.0
}
const fn default_speed() -> f64 {
    1.0
}
const fn default_fog_visibility() -> f64 {
    -1.0
}

// ---------------------------------------------------------------------------
// SchedulerConfig
// ---------------------------------------------------------------------------

/// Engine scheduler rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Simulation (tick) rate in Hz (default: 20).
    #[serde(default = "default_simulation_frequency")]
    pub simulation_frequency: f64,

    /// Physics integration rate in Hz (default: 100).
    /// Must be >= `simulation_frequency`.
    #[serde(default = "default_integration_frequency")]
    pub integration_frequency: f64,

    /// Wall-clock speed factor; 1.0 is real time.
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Keep going when a frame takes longer than its time slot.
    #[serde(default)]
    pub ignore_frame_overrun: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            simulation_frequency: default_simulation_frequency(),
            integration_frequency: default_integration_frequency(),
            speed: default_speed(),
            ignore_frame_overrun: false,
        }
    }
}

impl SchedulerConfig {
    /// Simulated seconds per tick.
    pub fn tick_seconds(&self) -> f64 {
        self.simulation_frequency.recip()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation_frequency <= 0.0 {
            return Err(ConfigError::InvalidFrequency {
                field: "simulation",
                value: self.simulation_frequency,
            });
        }
        if self.integration_frequency <= 0.0 {
            return Err(ConfigError::InvalidFrequency {
                field: "integration",
                value: self.integration_frequency,
            });
        }
        if self.integration_frequency < self.simulation_frequency {
            return Err(ConfigError::IntegrationSlowerThanSimulation);
        }
        if self.speed <= 0.0 {
            return Err(ConfigError::InvalidSpeed(self.speed));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WeatherConfig / SkyConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub kind: WeatherType,

    /// Fog visibility in metres; negative disables fog.
    #[serde(default = "default_fog_visibility")]
    pub fog_visibility: f64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            kind: WeatherType::default(),
            fog_visibility: default_fog_visibility(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkyConfig {
    #[serde(default)]
    pub kind: SkyType,

    #[serde(default)]
    pub light_pollution: SkyLightPollution,
}

// ---------------------------------------------------------------------------
// ScenarioConfig
// ---------------------------------------------------------------------------

/// Scenario-wide settings, loadable from TOML.
///
/// ```toml
/// [scheduler]
/// simulation_frequency = 20.0
/// integration_frequency = 100.0
///
/// [weather]
/// kind = "rainy"
/// fog_visibility = 150.0
///
/// [sky]
/// kind = "night"
/// light_pollution = "city"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub sky: SkyConfig,
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
