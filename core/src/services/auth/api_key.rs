//! Static API keys mapped to service identities

use constant_time_eq::constant_time_eq;
use wg_shared::ApiKeyConfig;

use crate::domain::entities::{hash_secret, AdminLevel, AuthenticatedIdentity, LocationCodes, RoleCode};
use crate::errors::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyPrincipal {
    pub name: String,
    /// Lowercase hex SHA-256 of the key
    key_sha256: String,
    pub identity: AuthenticatedIdentity,
}

impl ApiKeyPrincipal {
    pub fn new(name: impl Into<String>, key_sha256: &str, identity: AuthenticatedIdentity) -> Self {
        Self {
            name: name.into(),
            key_sha256: key_sha256.trim().to_lowercase(),
            identity,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeyRegistry {
    principals: Vec<ApiKeyPrincipal>,
}

impl ApiKeyRegistry {
    pub fn new(principals: Vec<ApiKeyPrincipal>) -> Self {
        Self { principals }
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    /// Compares against every configured digest without short-circuiting
    pub fn authenticate(&self, key: &str) -> Option<&ApiKeyPrincipal> {
        let digest = hash_secret(key);
        let mut found = None;
        for principal in &self.principals {
            if constant_time_eq(principal.key_sha256.as_bytes(), digest.as_bytes()) && found.is_none() {
                found = Some(principal);
            }
        }
        found
    }
}

impl TryFrom<&[ApiKeyConfig]> for ApiKeyRegistry {
    type Error = DomainError;

    fn try_from(configs: &[ApiKeyConfig]) -> Result<Self, Self::Error> {
        let principals = configs
            .iter()
            .map(|config| {
                let admin_level: AdminLevel = config
                    .admin_level
                    .parse()
                    .map_err(|message| DomainError::Validation { message })?;
                if config.key_sha256.trim().len() != 64 {
                    return Err(DomainError::Validation {
                        message: format!("API key {} must be a hex SHA-256 digest", config.name),
                    });
                }
                let identity = AuthenticatedIdentity {
                    subject_id: format!("api-key:{}", config.name),
                    email: String::new(),
                    role_code: RoleCode::new(config.role_code.clone()),
                    admin_level,
                    location: LocationCodes {
                        province_code: config.province_code.clone(),
                        district_code: config.district_code.clone(),
                        municipal_code: config.municipal_code.clone(),
                        ward_code: config.ward_code.clone(),
                    },
                };
                Ok(ApiKeyPrincipal::new(config.name.clone(), &config.key_sha256, identity))
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        Ok(Self::new(principals))
    }
}
