//! Audit events for authentication, authorization and admission decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    // Login events
    LoginSuccess,
    LoginFailure,
    LoginBlocked,

    // OTP challenge events
    OtpIssued,
    OtpVerified,
    OtpFailed,

    // Session events
    SessionCreated,
    SessionTerminated,
    TokenRejected,
    ApiKeyAccepted,

    // Authorization events
    AccessGranted,
    AccessDenied,

    // Admission events
    CircuitOpened,
    CircuitClosed,
    AdmissionRejected,
}

impl AuditEventType {
    /// String representation for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSuccess => "LOGIN_SUCCESS",
            Self::LoginFailure => "LOGIN_FAILURE",
            Self::LoginBlocked => "LOGIN_BLOCKED",
            Self::OtpIssued => "OTP_ISSUED",
            Self::OtpVerified => "OTP_VERIFIED",
            Self::OtpFailed => "OTP_FAILED",
            Self::SessionCreated => "SESSION_CREATED",
            Self::SessionTerminated => "SESSION_TERMINATED",
            Self::TokenRejected => "TOKEN_REJECTED",
            Self::ApiKeyAccepted => "API_KEY_ACCEPTED",
            Self::AccessGranted => "ACCESS_GRANTED",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::CircuitOpened => "CIRCUIT_OPENED",
            Self::CircuitClosed => "CIRCUIT_CLOSED",
            Self::AdmissionRejected => "ADMISSION_REJECTED",
        }
    }

    fn is_success(&self) -> bool {
        matches!(
            self,
            Self::LoginSuccess
                | Self::OtpIssued
                | Self::OtpVerified
                | Self::SessionCreated
                | Self::SessionTerminated
                | Self::ApiKeyAccepted
                | Self::AccessGranted
                | Self::CircuitClosed
        )
    }
}

/// A single audit record. Built with the `with_*` helpers and handed to an `AuditSink`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEvent {
    pub id: Uuid,
    pub event_type: AuditEventType,
    pub subject_id: Option<String>,
    /// Masked email, never the raw address
    pub email_masked: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    /// Operation or dependency the event concerns
    pub operation: Option<String>,
    pub success: bool,
    pub reason: Option<String>,
    pub event_data: Option<JsonValue>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            subject_id: None,
            email_masked: None,
            client_ip: None,
            user_agent: None,
            operation: None,
            success: event_type.is_success(),
            reason: None,
            event_data: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email_masked = Some(wg_shared::validation::mask_email(email));
        self
    }

    pub fn with_client(mut self, ip: Option<&str>, user_agent: Option<&str>) -> Self {
        self.client_ip = ip.map(str::to_string);
        self.user_agent = user_agent.map(str::to_string);
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.event_data = Some(data);
        self
    }
}
