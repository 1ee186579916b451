//! Mapping of domain errors onto HTTP responses.
//!
//! Every failure leaves the server in the standard envelope:
//! `{success: false, error: {code, message, details?}, timestamp}`.
//! Internal details are logged and replaced with a generic message.

use actix_web::{
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use serde_json::{json, Value};
use tracing::{debug, error};
use validator::ValidationErrors;

use wg_core::errors::{AdmissionError, AuthError, AuthorizationError, DomainError, TokenError};
use wg_shared::ApiResponse;

use crate::middleware::rate_limit::RateLimitSnapshot;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Error returned by handlers and middleware stages
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ApiError {
    error: DomainError,
    rate_limit: Option<RateLimitSnapshot>,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation {
            message: message.into(),
        }
        .into()
    }

    pub fn domain(&self) -> &DomainError {
        &self.error
    }

    /// Carry the caller's login budget so the rate-limit stage can emit headers
    pub fn with_rate_limit(mut self, snapshot: RateLimitSnapshot) -> Self {
        self.rate_limit = Some(snapshot);
        self
    }

    fn details(&self) -> Option<Value> {
        match &self.error {
            DomainError::Auth(AuthError::RateLimitExceeded { retry_after_seconds }) => {
                Some(json!({ "retryAfter": retry_after_seconds }))
            }
            DomainError::Auth(AuthError::InvalidOtp { attempts_remaining }) => {
                Some(json!({ "attempts_remaining": attempts_remaining }))
            }
            DomainError::Auth(AuthError::AccountLocked { until }) => {
                Some(json!({ "locked_until": until }))
            }
            DomainError::Admission(AdmissionError::CircuitOpen {
                dependency,
                retry_after_seconds,
            }) => Some(json!({ "dependency": dependency, "retryAfter": retry_after_seconds })),
            DomainError::Admission(_) => self
                .error
                .retry_after_seconds()
                .map(|seconds| json!({ "retryAfter": seconds })),
            _ => None,
        }
    }

    fn client_message(&self) -> String {
        if self.error.is_internal() {
            error!(error = %self.error, "Request failed with an internal error");
            INTERNAL_MESSAGE.to_string()
        } else {
            debug!(code = self.error.error_code(), error = %self.error, "Request rejected");
            self.error.to_string()
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = ApiResponse::error(self.error.error_code(), self.client_message());
        if let Some(details) = self.details() {
            body = body.with_details(details);
        }

        let mut builder = HttpResponse::build(self.status_code());
        if let Some(seconds) = self.error.retry_after_seconds() {
            builder.insert_header((header::RETRY_AFTER, seconds.to_string()));
        }

        let mut response = builder.json(body);
        if let Some(snapshot) = self.rate_limit {
            snapshot.attach(&mut response);
        }
        response
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self {
            error,
            rate_limit: None,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        DomainError::from(error).into()
    }
}

impl From<TokenError> for ApiError {
    fn from(error: TokenError) -> Self {
        DomainError::from(error).into()
    }
}

impl From<AuthorizationError> for ApiError {
    fn from(error: AuthorizationError) -> Self {
        DomainError::from(error).into()
    }
}

impl From<AdmissionError> for ApiError {
    fn from(error: AdmissionError) -> Self {
        DomainError::from(error).into()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation(errors.to_string())
    }
}
