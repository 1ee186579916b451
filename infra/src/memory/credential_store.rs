//! In-memory user directory

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use wg_core::domain::entities::UserRecord;
use wg_core::errors::DomainError;
use wg_core::repositories::CredentialStore;
use wg_shared::validation::normalize_email;

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let store = Self::new();
        for user in users {
            store.upsert(user);
        }
        store
    }

    /// Insert or replace a user, keyed by ID
    pub fn upsert(&self, mut user: UserRecord) {
        user.email = normalize_email(&user.email);
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.id, user);
    }

    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DomainError> {
        let email = normalize_email(email);
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DomainError> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users.get(&id).cloned())
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DomainError> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        match users.get_mut(&id) {
            Some(user) => {
                user.last_login_at = Some(at);
                Ok(())
            }
            None => Err(DomainError::NotFound {
                resource: format!("user {}", id),
            }),
        }
    }
}
