//! Sliding-window login failure tracking with progressive lockout.
//!
//! Each source key (client IP plus normalized email) owns at most one
//! `LoginAttemptRecord`. Every read-modify-write on the record map happens
//! under a single lock, so concurrent failures from one source cannot
//! undercount.
//!
//! A login reserves its attempt before checking credentials. Reservations
//! still in flight count against the remaining budget, so concurrent
//! requests cannot together make more guesses than the window allows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::entities::LoginAttemptRecord;
use wg_shared::validation::normalize_email;
use wg_shared::LoginAttemptConfig;

/// Limits applied by the tracker
#[derive(Debug, Clone)]
pub struct LoginAttemptPolicy {
    /// Failures permitted inside one window
    pub max_attempts: u32,
    pub window: Duration,
    pub block: Duration,
}

impl Default for LoginAttemptPolicy {
    fn default() -> Self {
        Self::from(&LoginAttemptConfig::default())
    }
}

impl From<&LoginAttemptConfig> for LoginAttemptPolicy {
    fn from(config: &LoginAttemptConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            window: Duration::seconds(config.window_seconds as i64),
            block: Duration::seconds(config.block_seconds as i64),
        }
    }
}

/// Result of consulting the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptDecision {
    pub allowed: bool,
    /// Seconds until the block lifts; set only when denied
    pub retry_after_seconds: Option<u64>,
    pub limit: u32,
    pub remaining: u32,
    /// When the current window or block ends
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct AttemptState {
    records: HashMap<String, LoginAttemptRecord>,
    /// Reserved attempts whose outcome is not known yet
    in_flight: HashMap<String, u32>,
}

/// An attempt counted against the source's budget until dropped
#[must_use = "the attempt is released as soon as the reservation is dropped"]
#[derive(Debug)]
pub struct AttemptReservation<'a> {
    tracker: &'a LoginAttemptTracker,
    source_key: String,
}

impl Drop for AttemptReservation<'_> {
    fn drop(&mut self) {
        self.tracker.release(&self.source_key);
    }
}

#[derive(Debug)]
pub struct LoginAttemptTracker {
    policy: LoginAttemptPolicy,
    state: Mutex<AttemptState>,
}

impl LoginAttemptTracker {
    pub fn new(policy: LoginAttemptPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(AttemptState::default()),
        }
    }

    pub fn policy(&self) -> &LoginAttemptPolicy {
        &self.policy
    }

    /// Key for one client trying one account
    pub fn source_key(client_ip: &str, email: &str) -> String {
        format!("{}|{}", client_ip, normalize_email(email))
    }

    pub fn check_allowed(&self, source_key: &str) -> AttemptDecision {
        self.check_allowed_at(source_key, Utc::now())
    }

    pub fn check_allowed_at(&self, source_key: &str, now: DateTime<Utc>) -> AttemptDecision {
        let state = self.lock();
        self.decide(state.records.get(source_key), now)
    }

    /// Claim one attempt for the source.
    ///
    /// Fails with the denying decision when the source is blocked, or with a
    /// one-second retry when in-flight attempts already use up the budget.
    /// After a block lifts inside the same window, one attempt at a time is
    /// admitted.
    pub fn reserve_at(
        &self,
        source_key: &str,
        now: DateTime<Utc>,
    ) -> Result<AttemptReservation<'_>, AttemptDecision> {
        let mut state = self.lock();
        let record = state.records.get(source_key);
        let decision = self.decide(record, now);
        if !decision.allowed {
            return Err(decision);
        }

        let capacity = match record {
            Some(record) if !record.window_elapsed_at(now, self.policy.window) => self
                .policy
                .max_attempts
                .saturating_sub(record.failure_count)
                .max(1),
            _ => self.policy.max_attempts,
        };
        let in_flight = state.in_flight.entry(source_key.to_string()).or_insert(0);
        if *in_flight >= capacity {
            debug!(
                source = source_key,
                in_flight = *in_flight,
                "Attempt budget held by requests in flight"
            );
            return Err(AttemptDecision {
                allowed: false,
                retry_after_seconds: Some(1),
                remaining: 0,
                ..decision
            });
        }
        *in_flight += 1;

        Ok(AttemptReservation {
            tracker: self,
            source_key: source_key.to_string(),
        })
    }

    /// Attempts reserved for the source and not yet released
    pub fn in_flight(&self, source_key: &str) -> u32 {
        self.lock().in_flight.get(source_key).copied().unwrap_or(0)
    }

    fn release(&self, source_key: &str) {
        let mut state = self.lock();
        if let Some(count) = state.in_flight.get_mut(source_key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.in_flight.remove(source_key);
            }
        }
    }

    pub fn record_outcome(&self, source_key: &str, success: bool) -> AttemptDecision {
        self.record_outcome_at(source_key, success, Utc::now())
    }

    /// Record a login result. Success forgets the source entirely.
    pub fn record_outcome_at(
        &self,
        source_key: &str,
        success: bool,
        now: DateTime<Utc>,
    ) -> AttemptDecision {
        let mut state = self.lock();

        if success {
            if state.records.remove(source_key).is_some() {
                debug!(source = source_key, "Login succeeded, attempt record cleared");
            }
            return self.decide(None, now);
        }

        let record = state
            .records
            .entry(source_key.to_string())
            .and_modify(|record| self.apply_failure(record, now))
            .or_insert_with(|| LoginAttemptRecord::first_failure(source_key, now));

        // A block that already lapsed inside the window is renewed by the next failure
        if record.failure_count >= self.policy.max_attempts && !record.is_blocked_at(now) {
            let until = now + self.policy.block;
            record.blocked_until = Some(until);
            warn!(
                source = source_key,
                failures = record.failure_count,
                blocked_until = %until,
                "Login source blocked after repeated failures"
            );
        }

        self.decide(Some(&*record), now)
    }

    fn apply_failure(&self, record: &mut LoginAttemptRecord, now: DateTime<Utc>) {
        record.last_attempt = now;
        if record.is_blocked_at(now) {
            // Counted, but the running block is not extended
            record.failure_count += 1;
        } else if record.window_elapsed_at(now, self.policy.window) {
            record.restart_window(now);
        } else {
            record.failure_count += 1;
        }
    }

    fn decide(&self, record: Option<&LoginAttemptRecord>, now: DateTime<Utc>) -> AttemptDecision {
        let limit = self.policy.max_attempts;
        let fresh = AttemptDecision {
            allowed: true,
            retry_after_seconds: None,
            limit,
            remaining: limit,
            reset_at: now + self.policy.window,
        };

        let Some(record) = record else {
            return fresh;
        };

        if let Some(until) = record.blocked_until.filter(|until| *until > now) {
            let seconds = (until - now).num_milliseconds().max(0) as u64;
            return AttemptDecision {
                allowed: false,
                retry_after_seconds: Some(seconds.div_ceil(1000).max(1)),
                limit,
                remaining: 0,
                reset_at: until,
            };
        }

        if record.window_elapsed_at(now, self.policy.window) {
            return fresh;
        }

        AttemptDecision {
            allowed: true,
            retry_after_seconds: None,
            limit,
            remaining: limit.saturating_sub(record.failure_count),
            reset_at: record.window_start + self.policy.window,
        }
    }

    /// Current record for a source, if any
    pub fn snapshot(&self, source_key: &str) -> Option<LoginAttemptRecord> {
        self.lock().records.get(source_key).cloned()
    }

    pub fn tracked_sources(&self) -> usize {
        self.lock().records.len()
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// Drop records older than window plus block duration
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let horizon = self.policy.window + self.policy.block;
        let mut state = self.lock();
        let before = state.records.len();
        state.records.retain(|_, record| now - record.window_start <= horizon);
        let removed = before - state.records.len();
        if removed > 0 {
            debug!(removed, remaining = state.records.len(), "Swept stale login attempt records");
        }
        removed
    }

    pub fn reset(&self) {
        self.lock().records.clear();
    }

    /// Periodically sweep stale records until the handle is aborted
    pub fn spawn_sweeper(self: &Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        info!(interval_secs = every.as_secs(), "Starting login attempt sweeper");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                tracker.sweep();
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, AttemptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LoginAttemptTracker {
    fn default() -> Self {
        Self::new(LoginAttemptPolicy::default())
    }
}
