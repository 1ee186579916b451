//! One-time password challenges.

use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use serde::{Deserialize, Serialize};

/// Out-of-band channel a code was sent over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpChannel {
    Sms,
    Email,
}

/// A pending challenge for one subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    pub subject_id: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub remaining_attempts: u32,
    /// Trusted OTP session token, set once the correct code is presented
    pub resulting_session_token: Option<String>,
}

/// Result of presenting a code to a challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Accepted,
    Rejected { attempts_remaining: u32 },
    Expired,
    Exhausted,
}

impl OtpChallenge {
    pub fn new(
        subject_id: impl Into<String>,
        code: impl Into<String>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            code: code.into(),
            expires_at: issued_at + ttl,
            remaining_attempts: max_attempts,
            resulting_session_token: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Compare a submitted code in constant time, consuming an attempt on mismatch
    pub fn check(&mut self, submitted: &str, now: DateTime<Utc>) -> OtpCheck {
        if self.is_expired_at(now) {
            return OtpCheck::Expired;
        }
        if self.remaining_attempts == 0 {
            return OtpCheck::Exhausted;
        }
        if constant_time_eq(self.code.as_bytes(), submitted.trim().as_bytes()) {
            return OtpCheck::Accepted;
        }
        self.remaining_attempts -= 1;
        if self.remaining_attempts == 0 {
            OtpCheck::Exhausted
        } else {
            OtpCheck::Rejected {
                attempts_remaining: self.remaining_attempts,
            }
        }
    }

    /// Record the trusted OTP session an accepted challenge was converted into
    pub fn resolve(&mut self, session_token: String) -> &str {
        self.resulting_session_token.insert(session_token).as_str()
    }
}

/// What the caller learns when a challenge is dispatched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpDispatch {
    pub subject_id: String,
    pub expires_at: DateTime<Utc>,
    pub channel: OtpChannel,
}

/// Issued after a correct code; lets later logins skip the challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustedOtpSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
