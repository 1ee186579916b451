//! Inputs and results of the authentication pipeline

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::AuthenticatedIdentity;
use crate::services::token::VerificationStrategy;

/// A password login request
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
    /// Trusted OTP session from an earlier challenge (`x-otp-session`)
    pub otp_session: Option<String>,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            otp_session: None,
        }
    }

    pub fn with_otp_session(mut self, token: Option<String>) -> Self {
        self.otp_session = token;
        self
    }
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &wg_shared::validation::mask_email(&self.email))
            .field("password", &"***")
            .field("otp_session", &self.otp_session.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A bearer token that passed verification and whose session is still live
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedSession {
    pub identity: AuthenticatedIdentity,
    /// Absent for legacy tokens minted before the session registry
    pub session_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip)]
    pub strategy: VerificationStrategy,
}
