//! Audit service module for recording gating decisions.

mod service;

pub use service::{AuditService, AuditServiceConfig};
