use chrono::{Duration, TimeZone, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::domain::entities::{AdminLevel, AuthenticatedIdentity, Claims, LocationCodes, RoleCode};
use crate::errors::{DomainError, TokenError};
use crate::services::token::{TokenService, TokenServiceConfig, VerificationStrategy};

const SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

fn service() -> TokenService {
    TokenService::new(TokenServiceConfig {
        jwt_secret: SECRET.to_string(),
        issuer: "wardgate".to_string(),
        audience: "wardgate-admin".to_string(),
        token_ttl: Duration::hours(24),
        allow_legacy_tokens: true,
    })
    .unwrap()
}

fn identity() -> AuthenticatedIdentity {
    AuthenticatedIdentity {
        subject_id: "5b0c7f9e-1111-4c1e-9a55-0d6cf1b2a001".into(),
        email: "ward@example.org".into(),
        role_code: RoleCode::new("ward_admin"),
        admin_level: AdminLevel::Ward,
        location: LocationCodes {
            province_code: Some("P1".into()),
            district_code: Some("D1".into()),
            municipal_code: Some("M1".into()),
            ward_code: Some("W1".into()),
        },
    }
}

fn legacy_token(secret: &str, issued_at: chrono::DateTime<Utc>) -> String {
    let mut claims = Claims::for_identity(
        &identity(),
        "legacy-session",
        "unused",
        "unused",
        issued_at,
        Duration::hours(24),
    );
    claims.iss = None;
    claims.aud = None;
    claims.jti = None;
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

#[test]
fn test_issued_token_carries_scope_claims() {
    let service = service();
    let t = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let issued = service.issue_at(&identity(), "session-1", t).unwrap();

    assert_eq!(issued.expires_in(), 86_400);

    let verified = service.verify_at(&issued.token, t + Duration::minutes(1)).unwrap();
    assert_eq!(verified.strategy, VerificationStrategy::Strict);
    assert_eq!(verified.claims.session_id(), Some("session-1"));
    assert_eq!(verified.claims.identity(), identity());
    assert_eq!(verified.claims.exp - verified.claims.iat, 86_400);
}

#[test]
fn test_token_valid_just_before_ttl_and_expired_just_after() {
    let service = service();
    let t = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let issued = service.issue_at(&identity(), "session-1", t).unwrap();

    let ok = service.verify_at(&issued.token, t + Duration::hours(23) + Duration::minutes(59));
    assert!(ok.is_ok());

    let expired = service.verify_at(&issued.token, t + Duration::hours(24) + Duration::minutes(1));
    assert_eq!(expired.unwrap_err(), DomainError::Token(TokenError::Expired));
}

#[test]
fn test_legacy_untagged_token_uses_fallback_strategy() {
    let service = service();
    let t = Utc::now();
    let token = legacy_token(SECRET, t);

    let verified = service.verify_at(&token, t + Duration::hours(1)).unwrap();
    assert_eq!(verified.strategy, VerificationStrategy::LegacyUntagged);
    assert_eq!(verified.claims.session_id(), None);
}

#[test]
fn test_legacy_fallback_still_enforces_expiry() {
    let service = service();
    let t = Utc::now();
    let token = legacy_token(SECRET, t);

    let err = service.verify_at(&token, t + Duration::hours(25)).unwrap_err();
    assert_eq!(err, DomainError::Token(TokenError::Expired));
}

#[test]
fn test_legacy_fallback_can_be_disabled() {
    let service = TokenService::new(TokenServiceConfig {
        jwt_secret: SECRET.to_string(),
        allow_legacy_tokens: false,
        ..TokenServiceConfig::default()
    })
    .unwrap();
    let t = Utc::now();

    let err = service.verify_at(&legacy_token(SECRET, t), t).unwrap_err();
    assert_eq!(err, DomainError::Token(TokenError::Invalid));
    assert_eq!(service.strategies(), &[VerificationStrategy::Strict]);
}

#[test]
fn test_bad_signature_is_terminal() {
    let service = service();
    let t = Utc::now();

    // Untagged and signed with another key: must not reach the legacy strategy
    let err = service
        .verify_at(&legacy_token("some-other-secret-entirely-different", t), t)
        .unwrap_err();
    assert_eq!(err, DomainError::Token(TokenError::Invalid));
}

#[test]
fn test_foreign_audience_is_not_accepted_by_legacy_strategy() {
    let service = service();
    let t = Utc::now();
    let claims = Claims::for_identity(&identity(), "s", "wardgate", "another-app", t, Duration::hours(1));
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();

    let err = service.verify_at(&token, t).unwrap_err();
    assert_eq!(err, DomainError::Token(TokenError::Invalid));
}

#[test]
fn test_garbage_is_malformed() {
    let service = service();
    for input in ["", "not-a-jwt", "a.b.c"] {
        let err = service.verify_at(input, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::Token(TokenError::Malformed), "input {:?}", input);
    }
}

#[test]
fn test_empty_secret_is_rejected() {
    let result = TokenService::new(TokenServiceConfig {
        jwt_secret: String::new(),
        ..TokenServiceConfig::default()
    });
    assert!(result.is_err());
}
