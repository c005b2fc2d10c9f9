//! Protocol output limits configuration.

use serde::Deserialize;

/// Protocol output limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Parameters per outbound MODE line (default: 6).
    #[serde(default = "default_max_mode_params")]
    pub max_mode_params: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_mode_params: default_max_mode_params(),
        }
    }
}

fn default_max_mode_params() -> usize {
    6
}
