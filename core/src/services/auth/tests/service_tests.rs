use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};

use super::mocks::*;
use crate::domain::entities::{
    hash_secret, AccountStatus, AdminLevel, AuditEventType, ClientInfo, LocationCodes, RoleCode,
    UserRecord,
};
use crate::domain::value_objects::LoginOutcome;
use crate::errors::{AdmissionError, AuthError, DomainError, TokenError};
use crate::repositories::AuditSink;
use crate::services::admission::{CircuitBreakerPolicy, CircuitBreakerRegistry};
use crate::services::audit::{AuditService, AuditServiceConfig};
use crate::services::auth::{
    ApiKeyPrincipal, ApiKeyRegistry, AuthPipelineConfig, AuthenticationPipeline, LoginCredentials,
    MfaPolicy, PipelineComponents,
};
use crate::services::login_attempts::LoginAttemptTracker;
use crate::services::token::{TokenService, TokenServiceConfig};

const PASSWORD: &str = "correct horse battery staple";

struct Harness {
    pipeline: AuthenticationPipeline,
    store: Arc<MockCredentialStore>,
    sessions: Arc<MockSessionRegistry>,
    otp: Arc<MockOtpService>,
    audit: Arc<RecordingAuditSink>,
}

fn ward_admin() -> UserRecord {
    UserRecord::new(
        "ward.admin@example.org",
        bcrypt::hash(PASSWORD, 4).unwrap(),
        RoleCode::new("ward_admin"),
        AdminLevel::Ward,
        LocationCodes {
            province_code: Some("P1".into()),
            district_code: Some("D1".into()),
            municipal_code: Some("M1".into()),
            ward_code: Some("W1".into()),
        },
    )
}

fn province_admin() -> UserRecord {
    UserRecord::new(
        "province.admin@example.org",
        bcrypt::hash(PASSWORD, 4).unwrap(),
        RoleCode::new("province_admin"),
        AdminLevel::Province,
        LocationCodes {
            province_code: Some("P1".into()),
            ..Default::default()
        },
    )
}

fn harness_with(users: Vec<UserRecord>, breaker_threshold: u32, audit_sink: Option<Arc<dyn AuditSink>>) -> Harness {
    let store = shared(MockCredentialStore::with_users(users));
    let sessions = shared(MockSessionRegistry::default());
    let otp = shared(MockOtpService::default());
    let audit = shared(RecordingAuditSink::default());
    let sink: Arc<dyn AuditSink> = audit_sink.unwrap_or_else(|| audit.clone() as Arc<dyn AuditSink>);

    let tokens = TokenService::new(TokenServiceConfig {
        jwt_secret: "pipeline-test-secret-with-enough-length".into(),
        ..TokenServiceConfig::default()
    })
    .unwrap();

    let config = AuthPipelineConfig {
        mfa: MfaPolicy::default(),
        api_keys: ApiKeyRegistry::new(vec![ApiKeyPrincipal::new(
            "reports",
            &hash_secret("reports-key"),
            ward_admin().identity(),
        )]),
        dummy_hash_cost: 4,
    };

    let pipeline = AuthenticationPipeline::new(
        PipelineComponents {
            credentials: store.clone(),
            sessions: sessions.clone(),
            otp: otp.clone(),
            tracker: Arc::new(LoginAttemptTracker::default()),
            tokens: Arc::new(tokens),
            breakers: Arc::new(CircuitBreakerRegistry::new(CircuitBreakerPolicy {
                failure_threshold: breaker_threshold,
                recovery_timeout: StdDuration::from_secs(30),
            })),
            audit: AuditService::new(sink, AuditServiceConfig { async_writes: false }),
        },
        config,
    );

    Harness {
        pipeline,
        store,
        sessions,
        otp,
        audit,
    }
}

fn harness(users: Vec<UserRecord>) -> Harness {
    harness_with(users, 5, None)
}

fn client() -> ClientInfo {
    ClientInfo::new(Some("203.0.113.7".into()), Some("test-agent".into()))
}

fn creds(email: &str, password: &str) -> LoginCredentials {
    LoginCredentials::new(email, password)
}

async fn settle() {
    tokio::time::sleep(StdDuration::from_millis(20)).await;
}

#[tokio::test]
async fn test_login_without_mfa_issues_registered_session() {
    let user = ward_admin();
    let h = harness(vec![user.clone()]);

    let outcome = h.pipeline.login(creds("Ward.Admin@example.org", PASSWORD), &client()).await.unwrap();
    let LoginOutcome::Authenticated(session) = outcome else {
        panic!("expected a session");
    };

    assert_eq!(session.expires_in, 86_400);
    assert_eq!(session.identity.subject_id, user.id.to_string());
    assert_eq!(h.sessions.count(), 1);

    let validated = h.pipeline.validate_token(&session.token).await.unwrap();
    assert_eq!(validated.identity.location.ward_code.as_deref(), Some("W1"));
    assert_eq!(validated.session_id.as_deref(), Some(session.session_id.as_str()));
}

#[tokio::test]
async fn test_unknown_email_and_wrong_password_look_the_same() {
    let h = harness(vec![ward_admin()]);

    let wrong = h.pipeline.login(creds("ward.admin@example.org", "nope"), &client()).await.unwrap_err();
    let unknown = h.pipeline.login(creds("ghost@example.org", PASSWORD), &client()).await.unwrap_err();

    assert_eq!(wrong, DomainError::Auth(AuthError::InvalidCredentials));
    assert_eq!(unknown, DomainError::Auth(AuthError::InvalidCredentials));

    let status = h.pipeline.attempt_status(&client(), "ward.admin@example.org");
    assert_eq!(status.remaining, 4);
}

#[tokio::test]
async fn test_blocked_source_never_reaches_credential_store() {
    let h = harness(vec![ward_admin()]);
    let email = "ward.admin@example.org";

    for _ in 0..5 {
        let err = h.pipeline.login(creds(email, "wrong"), &client()).await.unwrap_err();
        assert_eq!(err, DomainError::Auth(AuthError::InvalidCredentials));
    }
    let lookups = h.store.lookups();

    let err = h.pipeline.login(creds(email, PASSWORD), &client()).await.unwrap_err();
    match err {
        DomainError::Auth(AuthError::RateLimitExceeded { retry_after_seconds }) => {
            assert!(retry_after_seconds > 1700 && retry_after_seconds <= 1800);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(h.store.lookups(), lookups);

    // Another client is unaffected
    let other = ClientInfo::new(Some("198.51.100.2".into()), None);
    assert!(h.pipeline.login(creds(email, PASSWORD), &other).await.is_ok());
}

#[tokio::test]
async fn test_concurrent_guesses_at_last_attempt_reach_store_once() {
    let h = harness(vec![ward_admin()]);
    let email = "ward.admin@example.org";

    for _ in 0..4 {
        h.pipeline.login(creds(email, "wrong"), &client()).await.unwrap_err();
    }
    let lookups = h.store.lookups();

    let guess_client = client();
    let (a, b, c, d) = tokio::join!(
        h.pipeline.login(creds(email, "guess-a"), &guess_client),
        h.pipeline.login(creds(email, "guess-b"), &guess_client),
        h.pipeline.login(creds(email, "guess-c"), &guess_client),
        h.pipeline.login(creds(email, "guess-d"), &guess_client),
    );
    let results = [a, b, c, d];

    assert_eq!(h.store.lookups(), lookups + 1);
    let invalid = results
        .iter()
        .filter(|r| matches!(r, Err(DomainError::Auth(AuthError::InvalidCredentials))))
        .count();
    let held = results
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(DomainError::Auth(AuthError::RateLimitExceeded { retry_after_seconds: 1 }))
            )
        })
        .count();
    assert_eq!((invalid, held), (1, 3));

    // The one guess that ran used up the budget
    assert!(!h.pipeline.attempt_status(&client(), email).allowed);
}

#[tokio::test]
async fn test_locked_and_disabled_accounts() {
    let mut locked = ward_admin();
    locked.email = "locked@example.org".into();
    locked.locked_until = Some(Utc::now() + Duration::hours(1));
    let mut disabled = ward_admin();
    disabled.email = "disabled@example.org".into();
    disabled.status = AccountStatus::Suspended;
    let h = harness(vec![locked, disabled]);

    let err = h.pipeline.login(creds("locked@example.org", PASSWORD), &client()).await.unwrap_err();
    assert!(matches!(err, DomainError::Auth(AuthError::AccountLocked { .. })));
    assert_eq!(err.status_code(), 423);

    let err = h.pipeline.login(creds("disabled@example.org", PASSWORD), &client()).await.unwrap_err();
    assert_eq!(err, DomainError::Auth(AuthError::AccountDisabled));
}

#[tokio::test]
async fn test_mfa_required_returns_challenge() {
    let user = province_admin();
    let h = harness(vec![user.clone()]);

    let outcome = h.pipeline.login(creds(&user.email, PASSWORD), &client()).await.unwrap();

    match outcome {
        LoginOutcome::ChallengeRequired { user_id, otp_expires_at, .. } => {
            assert_eq!(user_id, user.id.to_string());
            assert!(otp_expires_at > Utc::now());
        }
        other => panic!("expected challenge, got {:?}", other),
    }
    assert_eq!(h.sessions.count(), 0);
    assert_eq!(h.otp.sent(), 1);
}

#[tokio::test]
async fn test_correct_otp_issues_session_and_trusted_otp_session() {
    let user = province_admin();
    let h = harness(vec![user.clone()]);
    let user_id = user.id.to_string();

    h.pipeline.login(creds(&user.email, PASSWORD), &client()).await.unwrap();
    let verified = h.pipeline.verify_otp(&user_id, OTP_CODE, &client()).await.unwrap();

    assert_eq!(verified.session.identity.admin_level, AdminLevel::Province);
    assert_eq!(h.sessions.count(), 1);

    // Presenting the trusted OTP session skips the next challenge
    let request = creds(&user.email, PASSWORD).with_otp_session(Some(verified.otp_session.token));
    let outcome = h.pipeline.login(request, &client()).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Authenticated(_)));
    assert_eq!(h.otp.sent(), 1);
}

#[tokio::test]
async fn test_wrong_otp_counts_down_then_locks_challenge() {
    let user = province_admin();
    let h = harness(vec![user.clone()]);
    let user_id = user.id.to_string();

    h.pipeline.login(creds(&user.email, PASSWORD), &client()).await.unwrap();

    for expected in [2, 1] {
        let err = h.pipeline.verify_otp(&user_id, "000000", &client()).await.unwrap_err();
        assert_eq!(err, DomainError::Auth(AuthError::InvalidOtp { attempts_remaining: expected }));
    }
    let err = h.pipeline.verify_otp(&user_id, "000000", &client()).await.unwrap_err();
    assert_eq!(err, DomainError::Auth(AuthError::OtpAttemptsExhausted));

    // The challenge is gone; even the right code now needs a fresh login
    let err = h.pipeline.verify_otp(&user_id, OTP_CODE, &client()).await.unwrap_err();
    assert_eq!(err, DomainError::Auth(AuthError::OtpExpired));
    assert_eq!(h.sessions.count(), 0);
}

#[tokio::test]
async fn test_resend_otp() {
    let province = province_admin();
    let ward = ward_admin();
    let h = harness(vec![province.clone(), ward.clone()]);

    let dispatch = h.pipeline.resend_otp(&province.id.to_string(), &client()).await.unwrap();
    assert_eq!(dispatch.subject_id, province.id.to_string());

    let err = h.pipeline.resend_otp(&ward.id.to_string(), &client()).await.unwrap_err();
    assert_eq!(err, DomainError::Auth(AuthError::MfaNotRequired));
    assert_eq!(err.status_code(), 400);

    let err = h.pipeline.resend_otp(&uuid::Uuid::new_v4().to_string(), &client()).await.unwrap_err();
    assert_eq!(err, DomainError::Auth(AuthError::UserNotFound));
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let user = ward_admin();
    let h = harness(vec![user.clone()]);

    let LoginOutcome::Authenticated(session) =
        h.pipeline.login(creds(&user.email, PASSWORD), &client()).await.unwrap()
    else {
        panic!("expected a session");
    };

    let ended = h
        .pipeline
        .logout(&session.identity, Some(&session.session_id), &client())
        .await
        .unwrap();
    assert_eq!(ended, 1);

    let err = h.pipeline.validate_token(&session.token).await.unwrap_err();
    assert_eq!(err, DomainError::Auth(AuthError::SessionExpired));
    assert_eq!(err.status_code(), 401);
}

#[tokio::test]
async fn test_logout_without_session_id_ends_all_sessions() {
    let user = ward_admin();
    let h = harness(vec![user.clone()]);

    for _ in 0..3 {
        h.pipeline.login(creds(&user.email, PASSWORD), &client()).await.unwrap();
    }
    let ended = h.pipeline.logout(&user.identity(), None, &client()).await.unwrap();
    assert_eq!(ended, 3);
}

#[tokio::test]
async fn test_invalid_tokens_are_rejected() {
    let h = harness(vec![]);

    let err = h.pipeline.validate_token("garbage").await.unwrap_err();
    assert_eq!(err, DomainError::Token(TokenError::Malformed));
}

#[tokio::test]
async fn test_credential_store_outage_opens_breaker() {
    let h = harness_with(vec![ward_admin()], 2, None);
    h.store.fail.store(true, std::sync::atomic::Ordering::SeqCst);

    for _ in 0..2 {
        let err = h.pipeline.login(creds("ward.admin@example.org", PASSWORD), &client()).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
    let lookups = h.store.lookups();

    let err = h.pipeline.login(creds("ward.admin@example.org", PASSWORD), &client()).await.unwrap_err();
    assert!(matches!(err, DomainError::Admission(AdmissionError::CircuitOpen { .. })));
    assert_eq!(h.store.lookups(), lookups);

    // Outages are not held against the client
    assert_eq!(h.pipeline.attempt_status(&client(), "ward.admin@example.org").remaining, 5);
}

#[tokio::test]
async fn test_api_key_authentication() {
    let h = harness(vec![]);

    let identity = h.pipeline.authenticate_api_key("reports-key").unwrap();
    assert_eq!(identity.role_code.as_str(), "ward_admin");

    let err = h.pipeline.authenticate_api_key("guess").unwrap_err();
    assert_eq!(err, DomainError::Auth(AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_login_is_audited() {
    let user = ward_admin();
    let h = harness(vec![user.clone()]);

    h.pipeline.login(creds(&user.email, "wrong"), &client()).await.unwrap_err();
    h.pipeline.login(creds(&user.email, PASSWORD), &client()).await.unwrap();
    settle().await;

    let events = h.audit.events.lock().unwrap();
    let kinds: Vec<_> = events.iter().map(|e| e.event_type).collect();
    assert!(kinds.contains(&AuditEventType::LoginFailure));
    assert!(kinds.contains(&AuditEventType::SessionCreated));
    assert!(kinds.contains(&AuditEventType::LoginSuccess));
    assert!(events.iter().all(|e| e.email_masked.as_deref() != Some(user.email.as_str())));
}

#[tokio::test]
async fn test_audit_failures_do_not_change_response() {
    let user = ward_admin();
    let h = harness_with(vec![user.clone()], 5, Some(Arc::new(FailingAuditSink)));

    let outcome = h.pipeline.login(creds(&user.email, PASSWORD), &client()).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Authenticated(_)));
}
