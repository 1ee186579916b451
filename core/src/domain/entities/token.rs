//! Session token claims.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::user::{AdminLevel, AuthenticatedIdentity, LocationCodes, RoleCode};

/// Session token lifetime
pub const SESSION_TOKEN_TTL_HOURS: i64 = 24;

/// Claims carried by a signed session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    pub email: String,

    pub role_code: String,

    pub admin_level: AdminLevel,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward_code: Option<String>,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Issuer; absent on tokens minted before tagging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience; absent on tokens minted before tagging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Session registry entry backing this token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    /// Build tagged claims for an identity, valid for `ttl` from `issued_at`
    pub fn for_identity(
        identity: &AuthenticatedIdentity,
        session_id: &str,
        issuer: &str,
        audience: &str,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let location = &identity.location;
        Self {
            sub: identity.subject_id.clone(),
            email: identity.email.clone(),
            role_code: identity.role_code.as_str().to_string(),
            admin_level: identity.admin_level,
            province_code: location.province_code.clone(),
            district_code: location.district_code.clone(),
            municipal_code: location.municipal_code.clone(),
            ward_code: location.ward_code.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            iss: Some(issuer.to_string()),
            aud: Some(audience.to_string()),
            jti: Some(session_id.to_string()),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }

    /// Session identifier, if the token was minted with one
    pub fn session_id(&self) -> Option<&str> {
        self.jti.as_deref()
    }

    pub fn identity(&self) -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            subject_id: self.sub.clone(),
            email: self.email.clone(),
            role_code: RoleCode::new(self.role_code.clone()),
            admin_level: self.admin_level,
            location: LocationCodes {
                province_code: self.province_code.clone(),
                district_code: self.district_code.clone(),
                municipal_code: self.municipal_code.clone(),
                ward_code: self.ward_code.clone(),
            },
        }
    }
}
