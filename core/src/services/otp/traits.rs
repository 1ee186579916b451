//! Traits for OTP challenge storage and delivery

use async_trait::async_trait;

use crate::domain::entities::{OtpChannel, OtpDispatch, TrustedOtpSession, UserRecord};
use crate::errors::DomainError;

/// Issues, checks and remembers OTP challenges
#[async_trait]
pub trait OtpChallengeService: Send + Sync {
    /// Fail with `DomainError::Validation` when the user has nowhere to receive a code
    fn check_destination(&self, _user: &UserRecord) -> Result<(), DomainError> {
        Ok(())
    }

    /// Create a fresh challenge for the user, replacing any pending one, and deliver the code
    async fn generate_and_send(&self, user: &UserRecord) -> Result<OtpDispatch, DomainError>;

    /// Check a submitted code.
    ///
    /// Fails with `AuthError::InvalidOtp` while attempts remain,
    /// `AuthError::OtpAttemptsExhausted` when the last attempt is used (the
    /// challenge is discarded) and `AuthError::OtpExpired` when no live
    /// challenge exists.
    async fn validate(&self, subject_id: &str, code: &str) -> Result<TrustedOtpSession, DomainError>;

    /// Whether `session_token` is a live trusted OTP session for the subject
    async fn has_valid_session(&self, subject_id: &str, session_token: &str) -> Result<bool, DomainError>;

    /// Discard any pending challenge for the subject
    async fn invalidate(&self, subject_id: &str) -> Result<(), DomainError>;
}

/// Sends a code to a destination out of band
#[async_trait]
pub trait OtpDelivery: Send + Sync {
    fn channel(&self) -> OtpChannel;

    async fn send(&self, destination: &str, code: &str) -> Result<(), DomainError>;
}
