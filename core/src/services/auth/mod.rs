//! Authentication pipeline module
//!
//! - Login attempt gating before any directory lookup
//! - Password verification against the credential store
//! - MFA policy evaluation and OTP challenges
//! - Session token issuance backed by the session registry
//! - Token validation, logout and static API keys

mod api_key;
mod config;
mod mfa;
mod service;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use api_key::{ApiKeyPrincipal, ApiKeyRegistry};
pub use config::AuthPipelineConfig;
pub use mfa::{MfaPolicy, MfaPolicyRule};
pub use service::{AuthenticationPipeline, PipelineComponents};
pub use state::LoginState;
pub use types::{LoginCredentials, ValidatedSession};
