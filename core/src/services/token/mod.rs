//! Token service module for session tokens
//!
//! - HS256 session token issuance with identity and geographic-scope claims
//! - Verification through an ordered list of strategies

mod config;
mod service;
mod strategy;

#[cfg(test)]
mod tests;

pub use config::TokenServiceConfig;
pub use service::{IssuedToken, TokenService, VerifiedToken};
pub use strategy::VerificationStrategy;
