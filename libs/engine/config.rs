//! YAML + `.env` configuration loading.
//!
//! Grounded on the teacher's `config/mod.rs` (`ConfigError` shape,
//! `load`/`validate` split, `.env`-sourced secrets skipped by serde).

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub tick: TickConfig,
    pub live_sync: LiveSyncConfig,
    pub latency: LatencyConfig,
    pub slippage: SlippageConfig,
    pub logging: LoggingConfig,

    /// From `.env`, not the YAML file.
    #[serde(skip)]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickConfig {
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSyncConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyConfig {
    pub mean_latency_ns: i64,
    pub std_dev_ns: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlippageConfig {
    pub fixed_bps: f64,
    /// Carried from the original source, never applied to a fill price
    /// there either — documented dead, see `SPEC_FULL.md` §9.
    pub vol_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl EngineConfig {
    /// Loads the YAML file and overlays `API_KEY` from `.env`/the
    /// environment; `.env` missing entirely is not an error.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config: EngineConfig = serde_yaml::from_str(&yaml_content)?;

        dotenv::dotenv().ok();
        config.api_key = std::env::var("API_KEY").map_err(|_| ConfigError::EnvVarMissing("API_KEY".to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tick.interval_ms == 0 {
            return Err(ConfigError::ValidationError("tick.interval_ms must be > 0".to_string()));
        }
        if self.live_sync.interval_secs == 0 {
            return Err(ConfigError::ValidationError("live_sync.interval_secs must be > 0".to_string()));
        }
        if self.latency.mean_latency_ns < 0 || self.latency.std_dev_ns < 0 {
            return Err(ConfigError::ValidationError("latency fields must be >= 0".to_string()));
        }
        if self.slippage.fixed_bps < 0.0 {
            return Err(ConfigError::ValidationError("slippage.fixed_bps must be >= 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EngineConfig {
        EngineConfig {
            tick: TickConfig { interval_ms: 100 },
            live_sync: LiveSyncConfig { interval_secs: 5 },
            latency: LatencyConfig { mean_latency_ns: 5_000_000, std_dev_ns: 1_000_000 },
            slippage: SlippageConfig { fixed_bps: 0.0, vol_multiplier: 0.0 },
            logging: LoggingConfig { level: "info".to_string() },
            api_key: "test".to_string(),
        }
    }

    #[test]
    fn validates_positive_intervals() {
        let mut config = sample();
        assert!(config.validate().is_ok());
        config.tick.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_slippage() {
        let mut config = sample();
        config.slippage.fixed_bps = -1.0;
        assert!(config.validate().is_err());
    }
}
