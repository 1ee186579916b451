//! Shared error codes and configuration errors

use thiserror::Error;

/// Machine-readable error codes carried in the response envelope
pub mod error_codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";

    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const ACCOUNT_LOCKED: &str = "ACCOUNT_LOCKED";
    pub const ACCOUNT_DISABLED: &str = "ACCOUNT_DISABLED";
    pub const RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";
    pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
    pub const MFA_NOT_REQUIRED: &str = "MFA_NOT_REQUIRED";
    pub const INVALID_OTP: &str = "INVALID_OTP";
    pub const OTP_EXPIRED: &str = "OTP_EXPIRED";
    pub const OTP_ATTEMPTS_EXHAUSTED: &str = "OTP_ATTEMPTS_EXHAUSTED";
    pub const SESSION_EXPIRED: &str = "SESSION_EXPIRED";

    pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
    pub const TOKEN_INVALID: &str = "TOKEN_INVALID";
    pub const TOKEN_MALFORMED: &str = "TOKEN_MALFORMED";

    pub const INSUFFICIENT_LEVEL: &str = "INSUFFICIENT_LEVEL";
    pub const SCOPE_NOT_ASSIGNED: &str = "SCOPE_NOT_ASSIGNED";
    pub const OUT_OF_SCOPE: &str = "OUT_OF_SCOPE";

    pub const QUEUE_FULL: &str = "QUEUE_FULL";
    pub const QUEUE_TIMEOUT: &str = "QUEUE_TIMEOUT";
    pub const CIRCUIT_OPEN: &str = "CIRCUIT_OPEN";
}

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
