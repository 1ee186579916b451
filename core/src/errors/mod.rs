//! Domain-specific error types and error handling.

mod types;

#[cfg(test)]
mod tests;

pub use types::{AdmissionError, AuthError, AuthorizationError, TokenError};

use thiserror::Error;
use wg_shared::error_codes;

/// Core domain errors (general purpose)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to specific error types
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error(transparent)]
    Admission(#[from] AdmissionError),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn internal(message: impl Into<String>) -> Self {
        DomainError::Internal {
            message: message.into(),
        }
    }

    /// HTTP status this error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            DomainError::Validation { .. } => 400,
            DomainError::NotFound { .. } => 404,
            DomainError::Internal { .. } => 500,
            DomainError::Auth(err) => match err {
                AuthError::AccountLocked { .. } => 423,
                AuthError::RateLimitExceeded { .. } => 429,
                AuthError::UserNotFound => 404,
                AuthError::MfaNotRequired => 400,
                _ => 401,
            },
            DomainError::Token(TokenError::GenerationFailed) => 500,
            DomainError::Token(_) => 401,
            DomainError::Authorization(_) => 403,
            DomainError::Admission(AdmissionError::QueueTimeout) => 408,
            DomainError::Admission(_) => 503,
        }
    }

    /// Machine-readable code for the response envelope
    pub fn error_code(&self) -> &'static str {
        match self {
            DomainError::Validation { .. } => error_codes::VALIDATION_ERROR,
            DomainError::NotFound { .. } => error_codes::NOT_FOUND,
            DomainError::Internal { .. } => error_codes::INTERNAL_ERROR,
            DomainError::Auth(err) => match err {
                AuthError::InvalidCredentials => error_codes::INVALID_CREDENTIALS,
                AuthError::MissingCredentials => error_codes::UNAUTHORIZED,
                AuthError::AccountLocked { .. } => error_codes::ACCOUNT_LOCKED,
                AuthError::AccountDisabled => error_codes::ACCOUNT_DISABLED,
                AuthError::RateLimitExceeded { .. } => error_codes::RATE_LIMIT_EXCEEDED,
                AuthError::UserNotFound => error_codes::USER_NOT_FOUND,
                AuthError::MfaNotRequired => error_codes::MFA_NOT_REQUIRED,
                AuthError::InvalidOtp { .. } => error_codes::INVALID_OTP,
                AuthError::OtpExpired => error_codes::OTP_EXPIRED,
                AuthError::OtpAttemptsExhausted => error_codes::OTP_ATTEMPTS_EXHAUSTED,
                AuthError::SessionExpired => error_codes::SESSION_EXPIRED,
            },
            DomainError::Token(err) => match err {
                TokenError::Expired => error_codes::TOKEN_EXPIRED,
                TokenError::Invalid => error_codes::TOKEN_INVALID,
                TokenError::Malformed => error_codes::TOKEN_MALFORMED,
                TokenError::GenerationFailed => error_codes::INTERNAL_ERROR,
            },
            DomainError::Authorization(err) => match err {
                AuthorizationError::InsufficientRole { .. } => error_codes::FORBIDDEN,
                AuthorizationError::InsufficientLevel { .. } => error_codes::INSUFFICIENT_LEVEL,
                AuthorizationError::MissingScopeCode { .. } => error_codes::SCOPE_NOT_ASSIGNED,
                AuthorizationError::OutOfScope => error_codes::OUT_OF_SCOPE,
            },
            DomainError::Admission(err) => match err {
                AdmissionError::QueueFull { .. } => error_codes::QUEUE_FULL,
                AdmissionError::QueueTimeout => error_codes::QUEUE_TIMEOUT,
                AdmissionError::CircuitOpen { .. } => error_codes::CIRCUIT_OPEN,
            },
        }
    }

    /// Seconds the client should wait before retrying, when known
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            DomainError::Auth(AuthError::RateLimitExceeded { retry_after_seconds }) => {
                Some(*retry_after_seconds)
            }
            DomainError::Admission(AdmissionError::QueueFull { retry_after_seconds })
            | DomainError::Admission(AdmissionError::CircuitOpen {
                retry_after_seconds,
                ..
            }) => Some(*retry_after_seconds),
            DomainError::Admission(AdmissionError::QueueTimeout) => Some(1),
            _ => None,
        }
    }

    /// Retryable errors clear on their own; the rest need new credentials or input
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::Auth(AuthError::RateLimitExceeded { .. }) | DomainError::Admission(_)
        )
    }

    /// Internal failures are logged but never echoed to clients
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500 && !matches!(self, DomainError::Admission(_))
    }
}
