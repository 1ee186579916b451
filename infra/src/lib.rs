//! # Infrastructure Layer
//!
//! Concrete implementations of the WardGate collaborator contracts:
//! - **Database**: MySQL credential store and audit sink using SQLx
//! - **Cache**: Redis client and the shared session registry
//! - **OTP**: challenge storage plus SMS/log delivery channels
//! - **Memory**: in-process collaborators for development and tests

pub mod cache;
pub mod database;
pub mod memory;
pub mod otp;

pub use cache::{RedisClient, RedisSessionRegistry};
pub use database::{DatabasePool, MySqlAuditSink, MySqlCredentialStore, PoolStatistics};
pub use memory::{InMemoryAuditSink, InMemoryCredentialStore, InMemorySessionRegistry, TracingAuditSink};
pub use otp::{
    create_otp_delivery, InMemoryOtpChallengeService, LoggingOtpDelivery, OtpChallengeSettings,
    TwilioOtpDelivery,
};

use wg_core::errors::DomainError;

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection or query error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// HTTP request error for external services
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stored data could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// OTP delivery error
    #[error("OTP delivery error: {0}")]
    Delivery(String),
}

impl From<InfrastructureError> for DomainError {
    fn from(err: InfrastructureError) -> Self {
        DomainError::Internal {
            message: err.to_string(),
        }
    }
}
