//! Configuration module with business-specific sub-modules
//!
//! - `access` - operation allow-lists for the authorization gate
//! - `admission` - request queue, concurrency cap and circuit breakers
//! - `auth` - token signing, OTP challenges, MFA policy, API keys
//! - `cache` - Redis configuration
//! - `database` - MySQL pool configuration
//! - `environment` - environment detection and logging configuration
//! - `rate_limit` - login attempt limiting
//! - `server` - HTTP server and CORS configuration

pub mod access;
pub mod admission;
pub mod auth;
pub mod cache;
pub mod database;
pub mod environment;
pub mod rate_limit;
pub mod server;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub use access::{AccessPolicyConfig, AccessRule};
pub use admission::{AdmissionConfig, CircuitBreakerConfig};
pub use auth::{ApiKeyConfig, AuthConfig, JwtConfig, MfaPolicyConfig, MfaRule, OtpConfig, OtpDeliveryConfig};
pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use rate_limit::LoginAttemptConfig;
pub use server::{CorsConfig, ServerConfig};

/// Prefix for environment variable overrides, e.g. `WARDGATE__SERVER__PORT`
pub const ENV_PREFIX: &str = "WARDGATE";

/// Minimum accepted signing secret length in production
pub const MIN_SECRET_LEN: usize = 32;

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub environment: Environment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub cors: CorsConfig,

    /// MySQL directory and audit storage; in-memory stores are used when absent
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Redis session registry; in-memory registry is used when absent
    #[serde(default)]
    pub cache: Option<CacheConfig>,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub login_attempts: LoginAttemptConfig,

    #[serde(default)]
    pub admission: AdmissionConfig,

    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    #[serde(default)]
    pub access: AccessPolicyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig::new("127.0.0.1", 8080),
            cors: CorsConfig::development(),
            database: None,
            cache: None,
            auth: AuthConfig::default(),
            login_attempts: LoginAttemptConfig::development(),
            admission: AdmissionConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            access: AccessPolicyConfig::default(),
            logging: LoggingConfig::for_environment(Environment::Development),
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig::new("0.0.0.0", 8080),
            cors: CorsConfig::default(),
            database: None,
            cache: None,
            auth: AuthConfig::default(),
            login_attempts: LoginAttemptConfig::default(),
            admission: AdmissionConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            access: AccessPolicyConfig::default(),
            logging: LoggingConfig::for_environment(Environment::Production),
        }
    }

    /// Preset for an environment, before any file or variable overrides
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Development => Self::development(),
            Environment::Production => Self::production(),
            Environment::Staging => Self {
                environment: Environment::Staging,
                logging: LoggingConfig::for_environment(Environment::Staging),
                ..Self::production()
            },
        }
    }

    /// Load configuration: environment preset, then `config/{env}.toml`,
    /// then `WARDGATE__*` variables. `.env` files are read first.
    /// `WARDGATE__SERVER__TRUSTED_PROXIES` takes a comma-separated list.
    pub fn load() -> Result<Self, ConfigError> {
        let env = Environment::from_env();
        dotenvy::from_filename(env.env_file()).ok();
        dotenvy::dotenv().ok();
        // Re-read in case the .env file selected the environment
        let env = Environment::from_env();

        let preset = Self::for_environment(env);
        let loaded: Self = config::Config::builder()
            .add_source(config::Config::try_from(&preset)?)
            .add_source(config::File::with_name(&env.config_file()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.trusted_proxies"),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject settings that must never reach production
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment.is_production() {
            if self.auth.jwt.is_using_default_secret() {
                return Err(ConfigError::Invalid(
                    "auth.jwt.secret must be set in production".to_string(),
                ));
            }
            if self.auth.jwt.secret.len() < MIN_SECRET_LEN {
                return Err(ConfigError::Invalid(format!(
                    "auth.jwt.secret must be at least {} bytes",
                    MIN_SECRET_LEN
                )));
            }
        }
        if self.admission.processing_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "admission.processing_concurrency must be positive".to_string(),
            ));
        }
        if self.login_attempts.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "login_attempts.max_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_config_is_valid() {
        let config = AppConfig::development();
        assert!(config.validate().is_ok());
        assert!(config.database.is_none());
    }

    #[test]
    fn test_production_rejects_default_secret() {
        let config = AppConfig::production();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::production();
        config.auth.jwt = JwtConfig::new("short");
        assert!(config.validate().is_err());

        config.auth.jwt = JwtConfig::new("k".repeat(MIN_SECRET_LEN));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_staging_uses_production_limits() {
        let config = AppConfig::for_environment(Environment::Staging);
        assert_eq!(config.environment, Environment::Staging);
        assert_eq!(config.login_attempts.max_attempts, 5);
    }
}
