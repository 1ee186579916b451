//! MySQL implementation of the CredentialStore trait.
//!
//! Reads the `admin_users` table. Emails are stored normalized (trimmed,
//! lowercase) so lookups are a plain equality match.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row};
use tracing::debug;
use uuid::Uuid;

use wg_core::domain::entities::{AccountStatus, AdminLevel, LocationCodes, RoleCode, UserRecord};
use wg_core::errors::DomainError;
use wg_core::repositories::CredentialStore;
use wg_shared::validation::{mask_email, normalize_email};

use crate::InfrastructureError;

const USER_COLUMNS: &str = "id, email, password_hash, full_name, phone, role_code, admin_level, \
     province_code, district_code, municipal_code, ward_code, status, locked_until, last_login_at";

/// Raw column values of one `admin_users` row
#[derive(Debug, Clone)]
pub(crate) struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role_code: String,
    pub admin_level: String,
    pub province_code: Option<String>,
    pub district_code: Option<String>,
    pub municipal_code: Option<String>,
    pub ward_code: Option<String>,
    pub status: String,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserRow {
    fn from_row(row: &sqlx::mysql::MySqlRow) -> Result<Self, InfrastructureError> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            full_name: row.try_get("full_name")?,
            phone: row.try_get("phone")?,
            role_code: row.try_get("role_code")?,
            admin_level: row.try_get("admin_level")?,
            province_code: row.try_get("province_code")?,
            district_code: row.try_get("district_code")?,
            municipal_code: row.try_get("municipal_code")?,
            ward_code: row.try_get("ward_code")?,
            status: row.try_get("status")?,
            locked_until: row.try_get("locked_until")?,
            last_login_at: row.try_get("last_login_at")?,
        })
    }

    pub(crate) fn into_user(self) -> Result<UserRecord, InfrastructureError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| InfrastructureError::Config(format!("Invalid user UUID {}: {}", self.id, e)))?;
        let admin_level: AdminLevel = self
            .admin_level
            .parse()
            .map_err(InfrastructureError::Config)?;
        let status: AccountStatus = self.status.parse().map_err(InfrastructureError::Config)?;

        Ok(UserRecord {
            id,
            email: self.email,
            password_hash: self.password_hash,
            full_name: self.full_name.unwrap_or_default(),
            phone: self.phone,
            role_code: RoleCode::new(self.role_code),
            admin_level,
            location: LocationCodes {
                province_code: self.province_code,
                district_code: self.district_code,
                municipal_code: self.municipal_code,
                ward_code: self.ward_code,
            },
            status,
            locked_until: self.locked_until,
            last_login_at: self.last_login_at,
        })
    }
}

/// MySQL implementation of CredentialStore
pub struct MySqlCredentialStore {
    pool: MySqlPool,
}

impl MySqlCredentialStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn map_row(row: Option<sqlx::mysql::MySqlRow>) -> Result<Option<UserRecord>, DomainError> {
        row.map(|row| UserRow::from_row(&row).and_then(UserRow::into_user))
            .transpose()
            .map_err(DomainError::from)
    }
}

#[async_trait]
impl CredentialStore for MySqlCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DomainError> {
        let email = normalize_email(email);
        debug!(email = %mask_email(&email), "Looking up user by email");

        let query = format!("SELECT {} FROM admin_users WHERE email = ? LIMIT 1", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(&email)
            .fetch_optional(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;

        Self::map_row(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DomainError> {
        let query = format!("SELECT {} FROM admin_users WHERE id = ? LIMIT 1", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;

        Self::map_row(row)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DomainError> {
        sqlx::query("UPDATE admin_users SET last_login_at = ? WHERE id = ?")
            .bind(at)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;
        Ok(())
    }
}
