//! Per-source login failure record.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttemptRecord {
    pub source_key: String,
    pub failure_count: u32,
    pub window_start: DateTime<Utc>,
    pub last_attempt: DateTime<Utc>,
    pub blocked_until: Option<DateTime<Utc>>,
}

impl LoginAttemptRecord {
    pub fn first_failure(source_key: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            source_key: source_key.into(),
            failure_count: 1,
            window_start: now,
            last_attempt: now,
            blocked_until: None,
        }
    }

    pub fn is_blocked_at(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.map_or(false, |until| until > now)
    }

    pub fn window_elapsed_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.window_start >= window
    }

    /// Restart the window at `now` with a single failure
    pub fn restart_window(&mut self, now: DateTime<Utc>) {
        self.failure_count = 1;
        self.window_start = now;
        self.blocked_until = None;
    }
}
