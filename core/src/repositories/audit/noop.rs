//! No-op audit sink used when auditing is disabled.

use async_trait::async_trait;

use super::AuditSink;
use crate::domain::entities::AuditEvent;
use crate::errors::DomainError;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _event: &AuditEvent) -> Result<(), DomainError> {
        Ok(())
    }
}
