//! MySQL implementation of the AuditSink trait.
//!
//! Appends to the immutable `auth_audit_log` table. Rows are never updated.

use async_trait::async_trait;
use sqlx::MySqlPool;

use wg_core::domain::entities::AuditEvent;
use wg_core::errors::DomainError;
use wg_core::repositories::AuditSink;

use crate::InfrastructureError;

pub struct MySqlAuditSink {
    pool: MySqlPool,
}

impl MySqlAuditSink {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for MySqlAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), DomainError> {
        let event_data = event
            .event_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(InfrastructureError::from)?;

        sqlx::query(
            r#"
            INSERT INTO auth_audit_log (
                id, event_type, subject_id, email_masked, ip_address, user_agent,
                operation, success, failure_reason, event_data, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.id.to_string())
        .bind(event.event_type.as_str())
        .bind(&event.subject_id)
        .bind(&event.email_masked)
        .bind(&event.client_ip)
        .bind(&event.user_agent)
        .bind(&event.operation)
        .bind(event.success)
        .bind(&event.reason)
        .bind(event_data)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        Ok(())
    }
}
