//! Session registry contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::SessionRecord;
use crate::errors::DomainError;

/// Persists issued sessions so they can be terminated before their tokens expire
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Store a newly issued session
    async fn create(&self, session: &SessionRecord) -> Result<(), DomainError>;

    async fn find(&self, session_id: &str) -> Result<Option<SessionRecord>, DomainError>;

    /// Whether the session exists, is not terminated and has not expired
    async fn is_active(&self, session_id: &str, now: DateTime<Utc>) -> Result<bool, DomainError> {
        Ok(self
            .find(session_id)
            .await?
            .map_or(false, |session| session.is_active_at(now)))
    }

    /// Terminate one session. Returns false if it was unknown or already terminated.
    async fn terminate(&self, session_id: &str, at: DateTime<Utc>) -> Result<bool, DomainError>;

    /// Terminate every active session of a subject, returning how many were ended
    async fn terminate_all_for(
        &self,
        subject_id: &str,
        at: DateTime<Utc>,
    ) -> Result<usize, DomainError>;
}
