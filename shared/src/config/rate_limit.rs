//! Login attempt limiting configuration

use serde::{Deserialize, Serialize};

/// Sliding-window failure limits for login attempts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginAttemptConfig {
    /// Failures permitted inside one window
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Window length in seconds
    #[serde(default = "default_window")]
    pub window_seconds: u64,

    /// Block length in seconds once the limit is reached
    #[serde(default = "default_block")]
    pub block_seconds: u64,

    /// Interval between garbage-collection sweeps in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for LoginAttemptConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            window_seconds: default_window(),
            block_seconds: default_block(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl LoginAttemptConfig {
    /// Relaxed limits for local development
    pub fn development() -> Self {
        Self {
            max_attempts: 20,
            ..Default::default()
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_window() -> u64 {
    15 * 60
}

fn default_block() -> u64 {
    30 * 60
}

fn default_sweep_interval() -> u64 {
    60
}
