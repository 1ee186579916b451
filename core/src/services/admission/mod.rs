//! Admission control: bounded queue, concurrency cap and circuit breakers.

mod circuit_breaker;
mod controller;

pub use circuit_breaker::{
    CallPermit, CircuitBreaker, CircuitBreakerPolicy, CircuitBreakerRegistry, CircuitError,
    CircuitSnapshot, CircuitState, CREDENTIAL_STORE, OTP_DELIVERY, SESSION_REGISTRY,
};
pub use controller::{
    AdmissionPolicy, AdmissionStats, AdmissionTicket, DispatchPermit, DispatchReport,
    RequestAdmissionController,
};
