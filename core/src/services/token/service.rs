//! Session token issuance and verification

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header};
use tracing::{debug, info};

use crate::domain::entities::{hash_secret, AuthenticatedIdentity, Claims};
use crate::errors::{DomainError, TokenError};

use super::config::TokenServiceConfig;
use super::strategy::{classify, StrategyFailure, VerificationStrategy};

/// A freshly signed session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    pub fn expires_in(&self) -> i64 {
        (self.expires_at - self.issued_at).num_seconds()
    }
}

/// Claims plus the strategy that accepted them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub claims: Claims,
    pub strategy: VerificationStrategy,
}

/// Issues and verifies HS256-signed session tokens
pub struct TokenService {
    config: TokenServiceConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    strategies: Vec<VerificationStrategy>,
}

impl TokenService {
    pub fn new(config: TokenServiceConfig) -> Result<Self, DomainError> {
        if config.jwt_secret.is_empty() {
            return Err(DomainError::internal("JWT secret must not be empty"));
        }

        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut strategies = vec![VerificationStrategy::Strict];
        if config.allow_legacy_tokens {
            strategies.push(VerificationStrategy::LegacyUntagged);
        }

        Ok(Self {
            config,
            encoding_key,
            decoding_key,
            strategies,
        })
    }

    pub fn config(&self) -> &TokenServiceConfig {
        &self.config
    }

    pub fn strategies(&self) -> &[VerificationStrategy] {
        &self.strategies
    }

    pub fn issue(
        &self,
        identity: &AuthenticatedIdentity,
        session_id: &str,
    ) -> Result<IssuedToken, DomainError> {
        self.issue_at(identity, session_id, Utc::now())
    }

    /// Sign a token for `identity` bound to `session_id`, valid for the configured TTL
    pub fn issue_at(
        &self,
        identity: &AuthenticatedIdentity,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, DomainError> {
        let claims = Claims::for_identity(
            identity,
            session_id,
            &self.config.issuer,
            &self.config.audience,
            now,
            self.config.token_ttl,
        );
        let token = self.encode_claims(&claims)?;

        debug!(subject = %claims.sub, session_id, "Session token issued");
        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at: claims.expires_at(),
        })
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedToken, DomainError> {
        self.verify_at(token, Utc::now())
    }

    /// Try each strategy in order. Only an issuer/audience mismatch falls through
    /// to the next one; a bad signature or expiry is final.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedToken, DomainError> {
        let mut last_error = TokenError::Invalid;

        for strategy in &self.strategies {
            let validation = strategy.validation(&self.config.issuer, &self.config.audience);
            let claims = match decode::<Claims>(token, &self.decoding_key, &validation) {
                Ok(data) => data.claims,
                Err(e) => match classify(e.kind()) {
                    StrategyFailure::Untagged => {
                        debug!(strategy = strategy.as_str(), error = %e, "Token rejected, trying next strategy");
                        last_error = TokenError::Invalid;
                        continue;
                    }
                    StrategyFailure::Terminal(err) => {
                        debug!(strategy = strategy.as_str(), error = %e, "Token rejected");
                        return Err(err.into());
                    }
                },
            };

            if *strategy == VerificationStrategy::LegacyUntagged
                && (claims.iss.is_some() || claims.aud.is_some())
            {
                // Tagged for someone else; the legacy path is only for untagged tokens
                return Err(TokenError::Invalid.into());
            }

            if claims.is_expired_at(now) {
                return Err(TokenError::Expired.into());
            }

            match strategy {
                VerificationStrategy::Strict => {
                    debug!(strategy = strategy.as_str(), subject = %claims.sub, "Token verified")
                }
                VerificationStrategy::LegacyUntagged => {
                    info!(strategy = strategy.as_str(), subject = %claims.sub, "Token verified")
                }
            }
            return Ok(VerifiedToken {
                claims,
                strategy: *strategy,
            });
        }

        Err(last_error.into())
    }

    /// Digest stored in the session registry in place of the token
    pub fn hash_token(&self, token: &str) -> String {
        hash_secret(token)
    }

    pub(crate) fn encode_claims(&self, claims: &Claims) -> Result<String, DomainError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|_| DomainError::Token(TokenError::GenerationFailed))
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .field("strategies", &self.strategies)
            .finish_non_exhaustive()
    }
}
