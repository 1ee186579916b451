//! Per-dependency circuit breakers.
//!
//! CLOSED passes calls through and counts consecutive failures. Reaching the
//! threshold opens the circuit; an open circuit fails fast until the recovery
//! timeout has elapsed since the last failure, then admits exactly one trial
//! call in HALF_OPEN. The trial's outcome closes or reopens the circuit.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::errors::{AdmissionError, DomainError};
use wg_shared::CircuitBreakerConfig;

/// Dependency names used across the pipeline
pub const CREDENTIAL_STORE: &str = "credential_store";
pub const OTP_DELIVERY: &str = "otp_delivery";
pub const SESSION_REGISTRY: &str = "session_registry";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Thresholds for one breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerPolicy {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerPolicy {
    fn default() -> Self {
        Self::from(&CircuitBreakerConfig::default())
    }
}

impl From<&CircuitBreakerConfig> for CircuitBreakerPolicy {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            recovery_timeout: Duration::from_secs(config.recovery_timeout_seconds),
        }
    }
}

/// Error returned by `CircuitBreaker::call`
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CircuitError<E> {
    #[error("Circuit {name} is open")]
    Open { name: String, retry_after: Duration },

    #[error(transparent)]
    Inner(E),
}

impl<E: Into<DomainError>> CircuitError<E> {
    pub fn into_domain(self) -> DomainError {
        match self {
            CircuitError::Open { name, retry_after } => AdmissionError::CircuitOpen {
                dependency: name,
                retry_after_seconds: retry_after.as_secs().max(1),
            }
            .into(),
            CircuitError::Inner(e) => e.into(),
        }
    }
}

/// Permission to make one call through the breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPermit {
    Normal,
    Trial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    trial_started: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    policy: CircuitBreakerPolicy,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, policy: CircuitBreakerPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure: None,
                trial_started: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.lock();
        CircuitSnapshot {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
        }
    }

    /// Ask to make a call. Errors with the time left before a trial is possible.
    pub fn try_acquire_at(&self, now: Instant) -> Result<CallPermit, Duration> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(CallPermit::Normal),
            CircuitState::Open => {
                let opened_at = inner.last_failure.unwrap_or(now);
                let elapsed = now.saturating_duration_since(opened_at);
                if elapsed >= self.policy.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_started = Some(now);
                    info!(circuit = %self.name, "Circuit half-open, allowing trial call");
                    Ok(CallPermit::Trial)
                } else {
                    Err(self.policy.recovery_timeout - elapsed)
                }
            }
            CircuitState::HalfOpen => {
                // A trial abandoned without an outcome must not wedge the breaker
                let stale = inner.trial_started.map_or(true, |started| {
                    now.saturating_duration_since(started) >= self.policy.recovery_timeout
                });
                if stale {
                    inner.trial_started = Some(now);
                    Ok(CallPermit::Trial)
                } else {
                    Err(Duration::from_secs(1))
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            info!(circuit = %self.name, "Circuit closed after successful trial");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.trial_started = None;
    }

    pub fn record_failure_at(&self, now: Instant) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.last_failure = Some(now);
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.trial_started = None;
                warn!(circuit = %self.name, "Trial call failed, circuit reopened");
            }
            CircuitState::Closed if inner.consecutive_failures >= self.policy.failure_threshold => {
                inner.state = CircuitState::Open;
                warn!(
                    circuit = %self.name,
                    failures = inner.consecutive_failures,
                    "Circuit opened"
                );
            }
            _ => {}
        }
    }

    /// Give back a trial permit whose call said nothing about the dependency's health
    pub fn release_trial(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.trial_started = None;
        }
    }

    /// Run `operation` through the breaker, counting every error as a failure
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.call_classified(operation, |_| true).await
    }

    /// Run `operation` through the breaker. Only errors for which `is_fault`
    /// holds count as failures; others pass through and leave the state alone.
    pub async fn call_classified<T, E, F, Fut, C>(
        &self,
        operation: F,
        is_fault: C,
    ) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
    {
        if let Err(retry_after) = self.try_acquire_at(Instant::now()) {
            return Err(CircuitError::Open {
                name: self.name.clone(),
                retry_after,
            });
        }

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) if is_fault(&e) => {
                self.record_failure_at(Instant::now());
                Err(CircuitError::Inner(e))
            }
            Err(e) => {
                self.release_trial();
                Err(CircuitError::Inner(e))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One breaker per protected dependency, created on first use
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    policy: CircuitBreakerPolicy,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    pub fn new(policy: CircuitBreakerPolicy) -> Self {
        Self {
            policy,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, dependency: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            breakers
                .entry(dependency.to_string())
                .or_insert_with(|| Arc::new(CircuitBreaker::new(dependency, self.policy.clone()))),
        )
    }

    pub fn snapshots(&self) -> Vec<CircuitSnapshot> {
        let breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut snapshots: Vec<_> = breakers.values().map(|b| b.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }
}
