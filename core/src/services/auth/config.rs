//! Configuration for the authentication pipeline

use wg_shared::AuthConfig;

use crate::errors::DomainError;

use super::api_key::ApiKeyRegistry;
use super::mfa::MfaPolicy;

/// Configuration for the authentication pipeline
#[derive(Debug, Clone)]
pub struct AuthPipelineConfig {
    /// Which (level, role) pairs must pass an OTP challenge
    pub mfa: MfaPolicy,
    /// Static service keys
    pub api_keys: ApiKeyRegistry,
    /// bcrypt cost of the hash verified for unknown emails; should match stored hashes
    pub dummy_hash_cost: u32,
}

impl Default for AuthPipelineConfig {
    fn default() -> Self {
        Self {
            mfa: MfaPolicy::default(),
            api_keys: ApiKeyRegistry::default(),
            dummy_hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl TryFrom<&AuthConfig> for AuthPipelineConfig {
    type Error = DomainError;

    fn try_from(config: &AuthConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            mfa: MfaPolicy::try_from(&config.mfa)?,
            api_keys: ApiKeyRegistry::try_from(config.api_keys.as_slice())?,
            dummy_hash_cost: bcrypt::DEFAULT_COST,
        })
    }
}
