//! Business services containing the request-gating logic.

pub mod admission;
pub mod audit;
pub mod auth;
pub mod authorization;
pub mod login_attempts;
pub mod otp;
pub mod token;

// Re-export commonly used types
pub use admission::{
    AdmissionPolicy, AdmissionStats, AdmissionTicket, CircuitBreaker, CircuitBreakerPolicy,
    CircuitBreakerRegistry, CircuitSnapshot, CircuitState, DispatchPermit,
    RequestAdmissionController,
};
pub use audit::{AuditService, AuditServiceConfig};
pub use auth::{
    AuthPipelineConfig, AuthenticationPipeline, LoginCredentials, LoginState, PipelineComponents,
    ValidatedSession,
};
pub use authorization::{AccessPolicy, AuthorizationGate};
pub use login_attempts::{AttemptDecision, LoginAttemptPolicy, LoginAttemptTracker};
pub use otp::{OtpChallengeService, OtpDelivery};
pub use token::{IssuedToken, TokenService, TokenServiceConfig, VerificationStrategy, VerifiedToken};
