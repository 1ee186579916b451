//! Error types for authentication, token handling, authorization and admission control

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Authentication-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    MissingCredentials,

    #[error("Account locked until {until}")]
    AccountLocked { until: DateTime<Utc> },

    #[error("Account is not active")]
    AccountDisabled,

    #[error("Too many login attempts, retry in {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    #[error("User not found")]
    UserNotFound,

    #[error("Multi-factor authentication is not required for this account")]
    MfaNotRequired,

    #[error("Invalid one-time code, {attempts_remaining} attempts remaining")]
    InvalidOtp { attempts_remaining: u32 },

    #[error("One-time code expired")]
    OtpExpired,

    #[error("One-time code attempts exhausted, please log in again")]
    OtpAttemptsExhausted,

    #[error("Session expired")]
    SessionExpired,
}

/// Token-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Malformed token")]
    Malformed,

    #[error("Token generation failed")]
    GenerationFailed,
}

/// Authorization denials
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Role is not permitted to perform {operation}")]
    InsufficientRole { operation: String },

    #[error("Requires {required} level access or higher")]
    InsufficientLevel { required: String },

    #[error("No {level} code assigned to this administrator")]
    MissingScopeCode { level: String },

    #[error("Resource is outside the administrator's area")]
    OutOfScope,
}

/// Admission control rejections
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("Server is at capacity, retry in {retry_after_seconds} seconds")]
    QueueFull { retry_after_seconds: u64 },

    #[error("Request waited too long in queue")]
    QueueTimeout,

    #[error("Dependency {dependency} is unavailable, retry in {retry_after_seconds} seconds")]
    CircuitOpen {
        dependency: String,
        retry_after_seconds: u64,
    },
}
