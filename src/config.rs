//! Application configuration loaded from TOML.
//!
//! ```toml
//! demo_data = "SMALL"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 7860
//!
//! [solver]
//! late_acceptance_size = 400
//! random_seed = 42
//! console = true
//!
//! [solver.termination]
//! seconds_spent_limit = 30
//! unimproved_seconds_spent_limit = 5
//! step_count_limit = 100000
//! ```
//!
//! Every key is optional.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::demo_data::DemoData;
use crate::local_search::{SolverConfig, DEFAULT_TIME_LIMIT_SECS, LATE_ACCEPTANCE_SIZE};

/// Environment variable holding the config file path.
pub const CONFIG_PATH_ENV: &str = "TIMETABLING_CONFIG";

/// Config file read when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "timetabling.toml";

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Data set loaded into the singleton problem at startup.
    pub demo_data: DemoData,
    pub solver: SolverSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7860,
        }
    }
}

impl ServerConfig {
    /// `host:port`, ready for binding.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub late_acceptance_size: usize,
    pub random_seed: Option<u64>,
    /// Print colorful solver progress to stdout.
    pub console: bool,
    pub termination: TerminationConfig,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            late_acceptance_size: LATE_ACCEPTANCE_SIZE,
            random_seed: None,
            console: true,
            termination: TerminationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationConfig {
    pub seconds_spent_limit: Option<u64>,
    pub unimproved_seconds_spent_limit: Option<u64>,
    pub step_count_limit: Option<u64>,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            seconds_spent_limit: Some(DEFAULT_TIME_LIMIT_SECS),
            unimproved_seconds_spent_limit: None,
            step_count_limit: None,
        }
    }
}

impl SolverSettings {
    /// Engine configuration for these settings.
    pub fn to_solver_config(&self) -> SolverConfig {
        SolverConfig {
            time_limit: self.termination.seconds_spent_limit.map(Duration::from_secs),
            unimproved_time_limit: self
                .termination
                .unimproved_seconds_spent_limit
                .map(Duration::from_secs),
            step_limit: self.termination.step_count_limit,
            late_acceptance_size: self.late_acceptance_size,
            random_seed: self.random_seed,
            console: self.console,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Loads from the path in `TIMETABLING_CONFIG`, or `timetabling.toml`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(path)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.solver.late_acceptance_size == 0 {
            return Err(ConfigError::Invalid(
                "solver.late_acceptance_size must be at least 1".to_string(),
            ));
        }
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server.host must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.address(), "0.0.0.0:7860");
        assert_eq!(config.demo_data, DemoData::Small);
        assert_eq!(
            config.solver.to_solver_config().time_limit,
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn parses_every_section() {
        let config = AppConfig::from_toml_str(
            r#"
            demo_data = "LARGE"

            [server]
            port = 8080

            [solver]
            late_acceptance_size = 50
            random_seed = 42
            console = false

            [solver.termination]
            seconds_spent_limit = 5
            unimproved_seconds_spent_limit = 2
            step_count_limit = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.demo_data, DemoData::Large);
        assert_eq!(config.server.address(), "0.0.0.0:8080");
        let solver = config.solver.to_solver_config();
        assert_eq!(solver.late_acceptance_size, 50);
        assert_eq!(solver.random_seed, Some(42));
        assert!(!solver.console);
        assert_eq!(solver.time_limit, Some(Duration::from_secs(5)));
        assert_eq!(solver.unimproved_time_limit, Some(Duration::from_secs(2)));
        assert_eq!(solver.step_limit, Some(1000));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            AppConfig::from_toml_str("demo_data = \"HUGE\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            AppConfig::from_toml_str("[solver]\nlate_acceptance_size = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load("/nonexistent/timetabling.toml").unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
