//! # WardGate Core
//!
//! Domain layer for the WardGate request-gating service: entities,
//! collaborator contracts, error types and the services that decide
//! whether a request is admitted, who made it and what it may touch.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
