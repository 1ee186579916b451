//! Results returned by the authentication pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::{AuthenticatedIdentity, OtpChannel, TrustedOtpSession};

/// A signed session token plus the registry entry that backs it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub session_id: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
    pub identity: AuthenticatedIdentity,
}

/// Result of a password login
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginOutcome {
    Authenticated(IssuedSession),
    ChallengeRequired {
        user_id: String,
        otp_expires_at: DateTime<Utc>,
        channel: OtpChannel,
    },
}

/// Result of a correct one-time code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpVerified {
    pub session: IssuedSession,
    pub otp_session: TrustedOtpSession,
}
