//! Audit sink contract.

use async_trait::async_trait;

use crate::domain::entities::AuditEvent;
use crate::errors::DomainError;

/// Consumes audit events.
///
/// Callers go through `AuditService`, which dispatches in the background
/// and discards errors, so a failing sink never affects a request.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<(), DomainError>;
}
