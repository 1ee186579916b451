//! Credential store contract: read access to the user directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::UserRecord;
use crate::errors::DomainError;

/// Lookup interface over the persistent user directory.
///
/// Implementations return `Ok(None)` for unknown users and reserve `Err`
/// for infrastructure failures, which the caller counts against the
/// store's circuit breaker.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a user by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DomainError>;

    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DomainError>;

    /// Stamp the last successful login
    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DomainError>;
}
