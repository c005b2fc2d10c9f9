//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::limits::LimitsConfig;
use super::links::LinkBlock;
use super::validation::{self, ValidationError};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", join(.0))]
    Invalid(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server information.
    pub server: ServerConfig,
    /// Runtime behaviour knobs.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Protocol output limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Directly linked servers.
    #[serde(default, rename = "link")]
    pub links: Vec<LinkBlock>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load and validate in one step.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate(self).map_err(ConfigError::Invalid)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name (e.g., "irc.straylight.net").
    pub name: String,
    /// Server ID for TS6 (3 characters).
    pub sid: String,
    /// Server description.
    #[serde(default)]
    pub description: String,
    /// Never reveal remote server names to users.
    #[serde(default)]
    pub hide_servers: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Runtime behaviour knobs. All of these are re-read on rehash.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Clamp channel timestamps older than the bogus-TS floor instead of
    /// honouring them (default: false).
    #[serde(default)]
    pub ignore_bogus_ts: bool,
    /// WHOWAS capacity (default: 15000).
    #[serde(default = "default_whowas_history_length")]
    pub whowas_history_length: usize,
    /// How long after a nick change commands may still chase the old nick,
    /// in seconds (default: 90).
    #[serde(default = "default_kill_chase_time_limit")]
    pub kill_chase_time_limit: i64,
    /// Log output format (default: pretty).
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            ignore_bogus_ts: false,
            whowas_history_length: default_whowas_history_length(),
            kill_chase_time_limit: default_kill_chase_time_limit(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_whowas_history_length() -> usize {
    15000
}

fn default_kill_chase_time_limit() -> i64 {
    90
}
