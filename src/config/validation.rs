//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::collections::HashSet;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("server.sid must be exactly 3 characters, got {0}")]
    InvalidSid(usize),
    #[error("server.sid must match pattern [0-9][A-Z0-9][A-Z0-9], got '{0}'")]
    InvalidSidFormat(String),
    #[error("link {0} has an invalid sid '{1}'")]
    InvalidLinkSid(String, String),
    #[error("sid '{0}' is configured more than once")]
    DuplicateSid(String),
    #[error("limits.max_mode_params must be at least 1")]
    ZeroModeParams,
}

fn valid_sid(sid: &str) -> bool {
    let bytes = sid.as_bytes();
    bytes.len() == 3
        && bytes[0].is_ascii_digit()
        && bytes[1..]
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    // SID validation (TS6 format)
    let sid = &config.server.sid;
    if sid.len() != 3 {
        errors.push(ValidationError::InvalidSid(sid.len()));
    } else if !valid_sid(sid) {
        errors.push(ValidationError::InvalidSidFormat(sid.clone()));
    }

    let mut seen = HashSet::from([sid.as_str()]);
    for link in &config.links {
        if !valid_sid(&link.sid) {
            errors.push(ValidationError::InvalidLinkSid(
                link.name.clone(),
                link.sid.clone(),
            ));
        }
        if !seen.insert(link.sid.as_str()) {
            errors.push(ValidationError::DuplicateSid(link.sid.clone()));
        }
    }

    if config.limits.max_mode_params == 0 {
        errors.push(ValidationError::ZeroModeParams);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
