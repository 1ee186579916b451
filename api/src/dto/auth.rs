use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use wg_core::domain::entities::{AuthenticatedIdentity, OtpChannel, OtpDispatch};
use wg_core::domain::value_objects::{AccessGrant, IssuedSession, OtpVerified, QueryFilters};

#[derive(Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 256))]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &wg_shared::validation::mask_email(&self.email))
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(length(min = 1, max = 64))]
    pub user_id: String,

    #[validate(length(min = 4, max = 10))]
    pub otp_code: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResendOtpRequest {
    #[validate(length(min = 1, max = 64))]
    pub user_id: String,
}

/// `?all=true` ends every session of the caller
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogoutQuery {
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub session_id: String,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
    pub user: AuthenticatedIdentity,
}

impl From<IssuedSession> for SessionResponse {
    fn from(session: IssuedSession) -> Self {
        Self {
            token: session.token,
            session_id: session.session_id,
            expires_in: session.expires_in,
            expires_at: session.expires_at,
            user: session.identity,
        }
    }
}

/// A one-time code was sent; the caller must call `verify-otp` next
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeResponse {
    pub requires_otp: bool,
    pub user_id: String,
    pub otp_expires_at: DateTime<Utc>,
    pub channel: OtpChannel,
}

impl ChallengeResponse {
    pub fn new(user_id: String, otp_expires_at: DateTime<Utc>, channel: OtpChannel) -> Self {
        Self {
            requires_otp: true,
            user_id,
            otp_expires_at,
            channel,
        }
    }
}

impl From<OtpDispatch> for ChallengeResponse {
    fn from(dispatch: OtpDispatch) -> Self {
        Self::new(dispatch.subject_id, dispatch.expires_at, dispatch.channel)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyOtpResponse {
    #[serde(flatten)]
    pub session: SessionResponse,
    /// Send as `x-otp-session` on later logins to skip the challenge
    pub otp_session: String,
    pub otp_session_expires_at: DateTime<Utc>,
}

impl From<OtpVerified> for VerifyOtpResponse {
    fn from(verified: OtpVerified) -> Self {
        Self {
            session: verified.session.into(),
            otp_session: verified.otp_session.token,
            otp_session_expires_at: verified.otp_session.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub user: AuthenticatedIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub auth_method: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutResponse {
    pub terminated: usize,
}

/// Result of an access check, with the filters downstream queries must apply
#[derive(Debug, Clone, Serialize)]
pub struct ScopeResponse {
    pub operation: String,
    pub restricted: bool,
    pub filters: BTreeMap<String, String>,
}

impl ScopeResponse {
    pub fn new(operation: String, grant: &AccessGrant) -> Self {
        let filters = grant
            .constrain(QueryFilters::new())
            .iter()
            .map(|(column, value)| (column.to_string(), value.to_string()))
            .collect();
        Self {
            operation,
            restricted: grant.scope().is_some(),
            filters,
        }
    }
}
