//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, GeneralConfig)
//! - [`limits`]: Protocol output limits (LimitsConfig)
//! - [`links`]: Known server links (LinkBlock)
//! - [`validation`]: Startup sanity checks

mod limits;
mod links;
mod types;
mod validation;

pub use limits::LimitsConfig;
pub use links::LinkBlock;
pub use types::{Config, ConfigError, GeneralConfig, LogFormat, ServerConfig};
pub use validation::{ValidationError, validate};
