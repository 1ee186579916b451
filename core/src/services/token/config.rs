//! Configuration for the token service

use chrono::Duration;
use wg_shared::JwtConfig;

#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// HMAC signing secret
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    /// Fixed session token lifetime
    pub token_ttl: Duration,
    /// Accept untagged tokens minted before issuer/audience existed
    pub allow_legacy_tokens: bool,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self::from(&JwtConfig::default())
    }
}

impl From<&JwtConfig> for TokenServiceConfig {
    fn from(config: &JwtConfig) -> Self {
        Self {
            jwt_secret: config.secret.clone(),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            token_ttl: Duration::seconds(config.token_ttl_seconds),
            allow_legacy_tokens: config.allow_legacy_tokens,
        }
    }
}
