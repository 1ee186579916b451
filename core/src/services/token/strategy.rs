//! Ordered token verification strategies.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation};

use crate::errors::TokenError;

/// How a token was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStrategy {
    /// Signature, expiry, issuer and audience
    Strict,
    /// Signature and expiry only, for tokens carrying no issuer or audience
    LegacyUntagged,
}

impl VerificationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStrategy::Strict => "strict",
            VerificationStrategy::LegacyUntagged => "legacy_untagged",
        }
    }

    /// Expiry is checked by the service against an explicit clock
    pub(super) fn validation(&self, issuer: &str, audience: &str) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        match self {
            VerificationStrategy::Strict => {
                validation.set_required_spec_claims(&["exp", "iss", "aud"]);
                validation.set_issuer(&[issuer]);
                validation.set_audience(&[audience]);
            }
            VerificationStrategy::LegacyUntagged => {
                validation.set_required_spec_claims(&["exp"]);
                validation.validate_aud = false;
            }
        }
        validation
    }
}

/// Outcome of one strategy failing
pub(super) enum StrategyFailure {
    /// Only the issuer/audience tag was wrong or missing; the next strategy may try
    Untagged,
    Terminal(TokenError),
}

pub(super) fn classify(kind: &ErrorKind) -> StrategyFailure {
    match kind {
        ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => StrategyFailure::Untagged,
        ErrorKind::MissingRequiredClaim(claim) if claim == "iss" || claim == "aud" => {
            StrategyFailure::Untagged
        }
        ErrorKind::ExpiredSignature => StrategyFailure::Terminal(TokenError::Expired),
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_) => StrategyFailure::Terminal(TokenError::Invalid),
        _ => StrategyFailure::Terminal(TokenError::Malformed),
    }
}
