//! Session registry records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// An issued session, tracked so it can be terminated before the token expires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub subject_id: String,
    /// SHA-256 of the session token
    pub token_hash: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub terminated_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.terminated_at.is_none() && self.expires_at > now
    }
}

/// Hex SHA-256 digest used to store tokens and keys at rest
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Request metadata recorded alongside sessions and audit events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn new(ip: Option<String>, user_agent: Option<String>) -> Self {
        Self { ip, user_agent }
    }
}
