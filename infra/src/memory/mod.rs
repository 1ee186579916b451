//! In-process collaborators.
//!
//! Used by the development binary when no database or Redis is configured,
//! and by tests. State lives for the lifetime of the process only.

mod audit_sink;
mod credential_store;
mod session_registry;


pub use audit_sink::{InMemoryAuditSink, TracingAuditSink};
pub use credential_store::InMemoryCredentialStore;
pub use session_registry::InMemorySessionRegistry;
