//! Authentication configuration: token signing, OTP challenges, MFA policy and API keys

use serde::{Deserialize, Serialize};

const DEFAULT_SECRET: &str = "change-me-in-production-change-me-in-production";

/// JWT session token configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// HMAC secret used to sign tokens
    pub secret: String,

    /// Issuer claim stamped on new tokens
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Audience claim stamped on new tokens
    #[serde(default = "default_audience")]
    pub audience: String,

    /// Session token lifetime in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: i64,

    /// Accept tokens minted before issuer/audience were stamped
    #[serde(default = "default_allow_legacy")]
    pub allow_legacy_tokens: bool,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::from(DEFAULT_SECRET),
            issuer: default_issuer(),
            audience: default_audience(),
            token_ttl_seconds: default_token_ttl(),
            allow_legacy_tokens: default_allow_legacy(),
        }
    }
}

impl JwtConfig {
    /// Create a new JWT configuration with secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    /// Check if using default secret (security warning)
    pub fn is_using_default_secret(&self) -> bool {
        self.secret == DEFAULT_SECRET
    }
}

/// One-time password challenge configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OtpConfig {
    /// Number of digits in a code
    #[serde(default = "default_code_length")]
    pub code_length: usize,

    /// Code lifetime in seconds
    #[serde(default = "default_otp_expiry")]
    pub expiry_seconds: i64,

    /// Wrong codes accepted before the challenge is invalidated
    #[serde(default = "default_otp_attempts")]
    pub max_attempts: u32,

    /// Lifetime of the trusted OTP session handed out after a correct code
    #[serde(default = "default_trusted_session_ttl")]
    pub trusted_session_ttl_seconds: i64,

    /// Out-of-band delivery channel
    #[serde(default)]
    pub delivery: OtpDeliveryConfig,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
            expiry_seconds: default_otp_expiry(),
            max_attempts: default_otp_attempts(),
            trusted_session_ttl_seconds: default_trusted_session_ttl(),
            delivery: OtpDeliveryConfig::default(),
        }
    }
}

/// OTP delivery channel selection
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum OtpDeliveryConfig {
    /// Log a masked notice only (development)
    #[default]
    Log,
    /// Twilio Messages API
    Twilio {
        account_sid: String,
        auth_token: String,
        from_number: String,
    },
}

/// One row of the MFA policy table
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MfaRule {
    /// Admin level this rule applies to; `None` matches any level
    #[serde(default)]
    pub admin_level: Option<String>,

    /// Role code this rule applies to; `None` matches any role
    #[serde(default)]
    pub role_code: Option<String>,

    pub required: bool,
}

/// MFA policy keyed by (admin level, role code)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MfaPolicyConfig {
    /// Evaluated in order; the most specific match wins
    #[serde(default = "default_mfa_rules")]
    pub rules: Vec<MfaRule>,

    /// Applies when no rule matches
    #[serde(default)]
    pub default_required: bool,
}

impl Default for MfaPolicyConfig {
    fn default() -> Self {
        Self {
            rules: default_mfa_rules(),
            default_required: false,
        }
    }
}

/// Static API key granted a service identity
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeyConfig {
    /// Label used in logs and audit events
    pub name: String,

    /// Hex SHA-256 digest of the key
    pub key_sha256: String,

    pub role_code: String,

    pub admin_level: String,

    #[serde(default)]
    pub province_code: Option<String>,
    #[serde(default)]
    pub district_code: Option<String>,
    #[serde(default)]
    pub municipal_code: Option<String>,
    #[serde(default)]
    pub ward_code: Option<String>,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt: JwtConfig,

    #[serde(default)]
    pub otp: OtpConfig,

    #[serde(default)]
    pub mfa: MfaPolicyConfig,

    #[serde(default)]
    pub api_keys: Vec<ApiKeyConfig>,
}

fn default_issuer() -> String {
    String::from("wardgate")
}

fn default_audience() -> String {
    String::from("wardgate-admin")
}

fn default_token_ttl() -> i64 {
    24 * 60 * 60
}

fn default_allow_legacy() -> bool {
    true
}

fn default_code_length() -> usize {
    6
}

fn default_otp_expiry() -> i64 {
    5 * 60
}

fn default_otp_attempts() -> u32 {
    3
}

fn default_trusted_session_ttl() -> i64 {
    12 * 60 * 60
}

fn default_mfa_rules() -> Vec<MfaRule> {
    vec![
        MfaRule {
            admin_level: None,
            role_code: Some(String::from("superadmin")),
            required: true,
        },
        MfaRule {
            admin_level: Some(String::from("national")),
            role_code: None,
            required: true,
        },
        MfaRule {
            admin_level: Some(String::from("province")),
            role_code: None,
            required: true,
        },
    ]
}
