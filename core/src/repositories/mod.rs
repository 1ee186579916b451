//! Collaborator contracts implemented by the infrastructure layer.

pub mod audit;
pub mod credential;
pub mod session;

pub use audit::{AuditSink, NoopAuditSink};
pub use credential::CredentialStore;
pub use session::SessionRegistry;
