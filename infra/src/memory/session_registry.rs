//! In-memory session registry

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use wg_core::domain::entities::SessionRecord;
use wg_core::errors::DomainError;
use wg_core::repositories::SessionRegistry;

/// Process-local sessions. Expired and terminated records are pruned by `purge_inactive`.
#[derive(Debug, Default)]
pub struct InMemorySessionRegistry {
    sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop sessions that can no longer validate
    pub fn purge_inactive(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, session| session.is_active_at(now));
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "Purged inactive sessions");
        }
        removed
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionRecord>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn create(&self, session: &SessionRecord) -> Result<(), DomainError> {
        self.lock().insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn find(&self, session_id: &str) -> Result<Option<SessionRecord>, DomainError> {
        Ok(self.lock().get(session_id).cloned())
    }

    async fn terminate(&self, session_id: &str, at: DateTime<Utc>) -> Result<bool, DomainError> {
        let mut sessions = self.lock();
        match sessions.get_mut(session_id) {
            Some(session) if session.terminated_at.is_none() => {
                session.terminated_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn terminate_all_for(
        &self,
        subject_id: &str,
        at: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        let mut sessions = self.lock();
        let mut terminated = 0;
        for session in sessions
            .values_mut()
            .filter(|s| s.subject_id == subject_id && s.terminated_at.is_none())
        {
            session.terminated_at = Some(at);
            terminated += 1;
        }
        Ok(terminated)
    }
}
