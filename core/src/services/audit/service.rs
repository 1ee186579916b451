//! Audit service for recording gating decisions without blocking requests.
//!
//! Events are handed to the configured `AuditSink` on a background task.
//! Sink failures are logged and dropped; they never reach the caller.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::domain::entities::AuditEvent;
use crate::repositories::AuditSink;

/// Configuration for the audit service
#[derive(Debug, Clone)]
pub struct AuditServiceConfig {
    /// Whether to run audit writes on a background task
    pub async_writes: bool,
}

impl Default for AuditServiceConfig {
    fn default() -> Self {
        Self { async_writes: true }
    }
}

/// Fire-and-forget front for an audit sink
#[derive(Clone)]
pub struct AuditService {
    sink: Arc<dyn AuditSink>,
    config: AuditServiceConfig,
}

impl AuditService {
    pub fn new(sink: Arc<dyn AuditSink>, config: AuditServiceConfig) -> Self {
        Self { sink, config }
    }

    pub fn with_defaults(sink: Arc<dyn AuditSink>) -> Self {
        Self::new(sink, AuditServiceConfig::default())
    }

    /// Record an event. Never fails.
    pub async fn record(&self, event: AuditEvent) {
        if self.config.async_writes {
            self.dispatch(event);
        } else if let Err(e) = self.sink.record(&event).await {
            warn!(error = %e, event_type = event.event_type.as_str(), "Failed to write audit event");
        }
    }

    /// Record an event from synchronous code. Never fails.
    pub fn dispatch(&self, event: AuditEvent) {
        let Ok(handle) = Handle::try_current() else {
            debug!(event_type = event.event_type.as_str(), "No runtime, audit event dropped");
            return;
        };
        let sink = Arc::clone(&self.sink);
        // Detached; the join handle is intentionally dropped
        let _ = handle.spawn(async move {
            if let Err(e) = sink.record(&event).await {
                warn!(error = %e, event_type = event.event_type.as_str(), "Failed to write audit event");
            }
        });
    }
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

