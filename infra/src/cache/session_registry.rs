//! Session registry shared across server instances through Redis.
//!
//! Each session is stored as JSON under `{prefix}:session:{id}` with an
//! expiry matching the token lifetime. A set under
//! `{prefix}:user_sessions:{subject}` indexes a subject's sessions so they
//! can all be terminated at once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use wg_core::domain::entities::SessionRecord;
use wg_core::errors::DomainError;
use wg_core::repositories::SessionRegistry;

use super::RedisClient;
use crate::InfrastructureError;

pub struct RedisSessionRegistry {
    client: RedisClient,
}

impl RedisSessionRegistry {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    pub(crate) fn session_key(prefix: &str, session_id: &str) -> String {
        format!("{}:session:{}", prefix, session_id)
    }

    pub(crate) fn index_key(prefix: &str, subject_id: &str) -> String {
        format!("{}:user_sessions:{}", prefix, subject_id)
    }

    /// Seconds until expiry, at least one so SET EX accepts it
    pub(crate) fn remaining_seconds(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
        (expires_at - now).num_seconds().max(1) as u64
    }

    fn prefix(&self) -> &str {
        &self.client.config().key_prefix
    }

    async fn store(&self, session: &SessionRecord, now: DateTime<Utc>) -> Result<(), InfrastructureError> {
        let payload = serde_json::to_string(session)?;
        let key = Self::session_key(self.prefix(), &session.id);
        self.client
            .set_with_expiry(&key, &payload, Self::remaining_seconds(session.expires_at, now))
            .await
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, InfrastructureError> {
        let key = Self::session_key(self.prefix(), session_id);
        match self.client.get(&key).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn terminate_record(
        &self,
        mut session: SessionRecord,
        at: DateTime<Utc>,
    ) -> Result<bool, InfrastructureError> {
        if session.terminated_at.is_some() {
            return Ok(false);
        }
        session.terminated_at = Some(at);
        self.store(&session, at).await?;
        self.client
            .srem(&Self::index_key(self.prefix(), &session.subject_id), &session.id)
            .await?;
        Ok(true)
    }
}

#[async_trait]
impl SessionRegistry for RedisSessionRegistry {
    async fn create(&self, session: &SessionRecord) -> Result<(), DomainError> {
        let now = Utc::now();
        self.store(session, now).await?;

        let index = Self::index_key(self.prefix(), &session.subject_id);
        self.client.sadd(&index, &session.id).await?;
        // Index expires with the newest session
        self.client
            .expire(&index, Self::remaining_seconds(session.expires_at, now) as i64)
            .await?;

        debug!(session_id = %session.id, subject_id = %session.subject_id, "Session stored in Redis");
        Ok(())
    }

    async fn find(&self, session_id: &str) -> Result<Option<SessionRecord>, DomainError> {
        Ok(self.load(session_id).await?)
    }

    async fn terminate(&self, session_id: &str, at: DateTime<Utc>) -> Result<bool, DomainError> {
        match self.load(session_id).await? {
            Some(session) => Ok(self.terminate_record(session, at).await?),
            None => Ok(false),
        }
    }

    async fn terminate_all_for(
        &self,
        subject_id: &str,
        at: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        let index = Self::index_key(self.prefix(), subject_id);
        let mut terminated = 0;

        for session_id in self.client.smembers(&index).await? {
            match self.load(&session_id).await? {
                Some(session) if session.is_active_at(at) => {
                    if self.terminate_record(session, at).await? {
                        terminated += 1;
                    }
                }
                _ => {
                    self.client.srem(&index, &session_id).await?;
                }
            }
        }

        info!(subject_id, terminated, "Terminated sessions");
        Ok(terminated)
    }
}
