//! Directory user records, administrative levels and authenticated identities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role code granting unconditional access
pub const SUPERUSER_ROLE: &str = "superadmin";

/// Administrative level, ordered from the top of the hierarchy down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminLevel {
    National,
    Province,
    District,
    Municipality,
    Ward,
}

impl AdminLevel {
    /// Higher rank means wider authority
    pub fn rank(&self) -> u8 {
        match self {
            AdminLevel::National => 4,
            AdminLevel::Province => 3,
            AdminLevel::District => 2,
            AdminLevel::Municipality => 1,
            AdminLevel::Ward => 0,
        }
    }

    /// True if this level is the same as or above `other`
    pub fn is_at_or_above(&self, other: AdminLevel) -> bool {
        self.rank() >= other.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminLevel::National => "national",
            AdminLevel::Province => "province",
            AdminLevel::District => "district",
            AdminLevel::Municipality => "municipality",
            AdminLevel::Ward => "ward",
        }
    }
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "national" => Ok(AdminLevel::National),
            "province" => Ok(AdminLevel::Province),
            "district" => Ok(AdminLevel::District),
            "municipality" | "municipal" => Ok(AdminLevel::Municipality),
            "ward" => Ok(AdminLevel::Ward),
            other => Err(format!("Unknown admin level: {}", other)),
        }
    }
}

/// Role code as stored in the directory, e.g. `ward_admin`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleCode(String);

impl RoleCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn superuser() -> Self {
        Self(SUPERUSER_ROLE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_superuser(&self) -> bool {
        self.0 == SUPERUSER_ROLE
    }
}

impl fmt::Display for RoleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directory account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Suspended => "suspended",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(AccountStatus::Active),
            "inactive" => Ok(AccountStatus::Inactive),
            "suspended" => Ok(AccountStatus::Suspended),
            other => Err(format!("Unknown account status: {}", other)),
        }
    }
}

/// Geographic codes assigned to an administrator or carried by a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCodes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward_code: Option<String>,
}

impl LocationCodes {
    /// Code assigned at a given level. National has no code.
    pub fn code_for(&self, level: AdminLevel) -> Option<&str> {
        let code = match level {
            AdminLevel::National => None,
            AdminLevel::Province => self.province_code.as_deref(),
            AdminLevel::District => self.district_code.as_deref(),
            AdminLevel::Municipality => self.municipal_code.as_deref(),
            AdminLevel::Ward => self.ward_code.as_deref(),
        };
        code.filter(|c| !c.trim().is_empty())
    }
}

/// A row from the user directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    /// bcrypt hash
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role_code: RoleCode,
    pub admin_level: AdminLevel,
    #[serde(flatten)]
    pub location: LocationCodes,
    pub status: AccountStatus,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn new(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role_code: RoleCode,
        admin_level: AdminLevel,
        location: LocationCodes,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            full_name: String::new(),
            phone: None,
            role_code,
            admin_level,
            location,
            status: AccountStatus::Active,
            locked_until: None,
            last_login_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Locked by an administrator until a point in time
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.map_or(false, |until| until > now)
    }

    pub fn identity(&self) -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            subject_id: self.id.to_string(),
            email: self.email.clone(),
            role_code: self.role_code.clone(),
            admin_level: self.admin_level,
            location: self.location.clone(),
        }
    }
}

/// The authenticated principal attached to a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    pub subject_id: String,
    pub email: String,
    pub role_code: RoleCode,
    pub admin_level: AdminLevel,
    #[serde(flatten)]
    pub location: LocationCodes,
}

impl AuthenticatedIdentity {
    pub fn is_superuser(&self) -> bool {
        self.role_code.is_superuser()
    }

    /// Superusers and national administrators are never scoped
    pub fn is_unrestricted(&self) -> bool {
        self.is_superuser() || self.admin_level == AdminLevel::National
    }
}
