//! Request admission and circuit breaker configuration

use serde::{Deserialize, Serialize};

/// Bounded queue and concurrency cap in front of the handlers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdmissionConfig {
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Requests processed at the same time
    #[serde(default = "default_concurrency")]
    pub processing_concurrency: usize,

    /// Longest a request may wait in the queue, in seconds
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_seconds: u64,

    /// Dispatch cycle period in milliseconds
    #[serde(default = "default_dispatch_interval")]
    pub dispatch_interval_ms: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            processing_concurrency: default_concurrency(),
            wait_timeout_seconds: default_wait_timeout(),
            dispatch_interval_ms: default_dispatch_interval(),
        }
    }
}

/// Per-dependency circuit breaker thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before allowing a trial call
    #[serde(default = "default_recovery_timeout")]
    pub recovery_timeout_seconds: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_seconds: default_recovery_timeout(),
        }
    }
}

fn default_max_queue_size() -> usize {
    100
}

fn default_concurrency() -> usize {
    10
}

fn default_wait_timeout() -> u64 {
    30
}

fn default_dispatch_interval() -> u64 {
    10
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout() -> u64 {
    30
}
