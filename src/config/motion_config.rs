use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::errors::{ConfigError, ConfigResult};

/// Root configuration, loaded from `motion.toml`
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MotionConfig {
    pub poll: PollConfig,
    pub health: HealthConfig,
    pub simulator: SimulatorConfig,
}

/// `[poll]` section
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollConfig {
    pub frequency_hz: u32,
    pub run_for_secs: Option<u64>,
    pub summary_interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 60,
            run_for_secs: None,
            summary_interval_secs: 5,
        }
    }
}

impl PollConfig {
    pub fn frame_period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.frequency_hz.max(1)))
    }
}

/// `[health]` section
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct HealthConfig {
    pub degraded_after: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { degraded_after: 30 }
    }
}

/// `[simulator]` section, used when no motion hardware is present
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    pub sample_rate_hz: u32,
    pub tick_origin: u32,
    pub fail_every: Option<u32>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 250,
            tick_origin: 0,
            fail_every: None,
        }
    }
}

impl MotionConfig {
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let parsed: MotionConfig = toml::from_str(content)?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.poll.frequency_hz == 0 || self.poll.frequency_hz > 1000 {
            return Err(invalid("poll.frequency_hz", "must be between 1 and 1000"));
        }
        if self.poll.summary_interval_secs == 0 {
            return Err(invalid("poll.summary_interval_secs", "must be at least 1"));
        }
        if self.health.degraded_after == 0 {
            return Err(invalid("health.degraded_after", "must be at least 1"));
        }
        if self.simulator.sample_rate_hz == 0 || self.simulator.sample_rate_hz > 1_000_000 {
            return Err(invalid(
                "simulator.sample_rate_hz",
                "must be between 1 and 1000000",
            ));
        }
        if self.simulator.fail_every == Some(0) {
            return Err(invalid("simulator.fail_every", "must be at least 1 when set"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Loads config from TOML file
pub fn load_motion_config(path: &str) -> ConfigResult<MotionConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.to_string(),
        source,
    })?;
    MotionConfig::from_toml_str(&content)
}
