use chrono::Utc;

use crate::errors::{AdmissionError, AuthError, AuthorizationError, DomainError, TokenError};

#[test]
fn test_status_codes_follow_taxonomy() {
    let cases: Vec<(DomainError, u16)> = vec![
        (AuthError::InvalidCredentials.into(), 401),
        (TokenError::Expired.into(), 401),
        (AuthorizationError::OutOfScope.into(), 403),
        (
            AuthError::RateLimitExceeded {
                retry_after_seconds: 10,
            }
            .into(),
            429,
        ),
        (AuthError::AccountLocked { until: Utc::now() }.into(), 423),
        (
            AdmissionError::CircuitOpen {
                dependency: "credential_store".into(),
                retry_after_seconds: 30,
            }
            .into(),
            503,
        ),
        (
            AdmissionError::QueueFull {
                retry_after_seconds: 1,
            }
            .into(),
            503,
        ),
        (AdmissionError::QueueTimeout.into(), 408),
        (AuthError::MfaNotRequired.into(), 400),
        (AuthError::UserNotFound.into(), 404),
    ];

    for (error, expected) in cases {
        assert_eq!(error.status_code(), expected, "{:?}", error);
    }
}

#[test]
fn test_retryable_errors_carry_retry_after() {
    let limited: DomainError = AuthError::RateLimitExceeded {
        retry_after_seconds: 1740,
    }
    .into();
    assert!(limited.is_retryable());
    assert_eq!(limited.retry_after_seconds(), Some(1740));

    let open: DomainError = AdmissionError::CircuitOpen {
        dependency: "otp_delivery".into(),
        retry_after_seconds: 12,
    }
    .into();
    assert!(open.is_retryable());
    assert_eq!(open.retry_after_seconds(), Some(12));
    assert!(!open.is_internal());
}

#[test]
fn test_terminal_errors_are_not_retryable() {
    let denied: DomainError = AuthorizationError::MissingScopeCode {
        level: "province".into(),
    }
    .into();
    assert!(!denied.is_retryable());
    assert_eq!(denied.error_code(), "SCOPE_NOT_ASSIGNED");
    assert_eq!(denied.retry_after_seconds(), None);

    let invalid: DomainError = AuthError::InvalidOtp {
        attempts_remaining: 2,
    }
    .into();
    assert!(!invalid.is_retryable());
    assert_eq!(invalid.error_code(), "INVALID_OTP");
}

#[test]
fn test_internal_errors_are_flagged() {
    assert!(DomainError::internal("db down").is_internal());
    assert!(DomainError::from(TokenError::GenerationFailed).is_internal());
    assert!(!DomainError::from(TokenError::Invalid).is_internal());
}
