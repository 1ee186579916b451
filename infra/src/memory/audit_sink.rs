//! Audit sinks that do not need a database

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::info;

use wg_core::domain::entities::AuditEvent;
use wg_core::errors::DomainError;
use wg_core::repositories::AuditSink;

/// Writes audit events to the `audit` tracing target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), DomainError> {
        info!(
            target: "audit",
            event_id = %event.id,
            event_type = event.event_type.as_str(),
            success = event.success,
            subject = event.subject_id.as_deref().unwrap_or("-"),
            email = event.email_masked.as_deref().unwrap_or("-"),
            ip = event.client_ip.as_deref().unwrap_or("-"),
            operation = event.operation.as_deref().unwrap_or("-"),
            reason = event.reason.as_deref().unwrap_or("-"),
            "audit"
        );
        Ok(())
    }
}

/// Keeps every event in memory; for tests and local inspection
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), DomainError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}
