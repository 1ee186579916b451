//! Shared configuration and common types for WardGate
//!
//! This crate provides functionality used across all server modules:
//! - Configuration types and loading
//! - The response envelope and error codes
//! - Validation and redaction helpers

pub mod config;
pub mod errors;
pub mod types;
pub mod utils;

pub use config::{
    AccessPolicyConfig, AccessRule, AdmissionConfig, ApiKeyConfig, AppConfig, AuthConfig,
    CacheConfig, CircuitBreakerConfig, CorsConfig, DatabaseConfig, Environment, JwtConfig,
    LogFormat, LoggingConfig, LoginAttemptConfig, MfaPolicyConfig, MfaRule, OtpConfig,
    OtpDeliveryConfig, ServerConfig,
};
pub use errors::{error_codes, ConfigError};
pub use types::{ApiResponse, ErrorBody};
pub use utils::validation;
