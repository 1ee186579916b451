//! Role allow-list and geographic scope checks

use tracing::{debug, warn};

use crate::domain::entities::{
    AdminLevel, AuditEvent, AuditEventType, AuthenticatedIdentity, LocationCodes,
};
use crate::domain::value_objects::{AccessGrant, GeographicScope};
use crate::errors::AuthorizationError;
use crate::services::audit::AuditService;

use super::policy::AccessPolicy;

/// Decides whether an authenticated identity may perform an operation and
/// which geographic filters constrain it.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    policy: AccessPolicy,
    audit: AuditService,
}

impl AuthorizationGate {
    pub fn new(policy: AccessPolicy, audit: AuditService) -> Self {
        Self { policy, audit }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Superusers and national administrators pass unconditionally. Everyone
    /// else needs an allow-list entry and a fully assigned scope.
    pub fn authorize(
        &self,
        identity: &AuthenticatedIdentity,
        operation: &str,
    ) -> Result<AccessGrant, AuthorizationError> {
        let result = self.evaluate(identity, operation);
        self.audit_decision(identity, operation, &result);
        result
    }

    /// Authorize `operation` against a single record located at `record`
    pub fn authorize_record(
        &self,
        identity: &AuthenticatedIdentity,
        operation: &str,
        record: &LocationCodes,
    ) -> Result<AccessGrant, AuthorizationError> {
        let result = self.evaluate(identity, operation).and_then(|grant| {
            if grant.permits(record) {
                Ok(grant)
            } else {
                Err(AuthorizationError::OutOfScope)
            }
        });
        self.audit_decision(identity, operation, &result);
        result
    }

    /// Level at or above `required` in the hierarchy, or superuser
    pub fn require_hierarchical_access(
        &self,
        identity: &AuthenticatedIdentity,
        required: AdminLevel,
    ) -> Result<(), AuthorizationError> {
        if identity.is_superuser() || identity.admin_level.is_at_or_above(required) {
            return Ok(());
        }

        debug!(
            subject = %identity.subject_id,
            level = %identity.admin_level,
            required = %required,
            "Hierarchical access denied"
        );
        Err(AuthorizationError::InsufficientLevel {
            required: required.to_string(),
        })
    }

    pub fn require_role(
        &self,
        identity: &AuthenticatedIdentity,
        roles: &[&str],
    ) -> Result<(), AuthorizationError> {
        if identity.is_superuser() || roles.contains(&identity.role_code.as_str()) {
            return Ok(());
        }
        Err(AuthorizationError::InsufficientRole {
            operation: roles.join("|"),
        })
    }

    fn evaluate(
        &self,
        identity: &AuthenticatedIdentity,
        operation: &str,
    ) -> Result<AccessGrant, AuthorizationError> {
        if identity.is_unrestricted() {
            return Ok(AccessGrant::Unrestricted);
        }

        if !self.policy.allows(operation, &identity.role_code) {
            return Err(AuthorizationError::InsufficientRole {
                operation: operation.to_string(),
            });
        }

        GeographicScope::for_identity(identity).map(AccessGrant::Scoped)
    }

    fn audit_decision(
        &self,
        identity: &AuthenticatedIdentity,
        operation: &str,
        result: &Result<AccessGrant, AuthorizationError>,
    ) {
        let event = match result {
            Ok(grant) => {
                debug!(subject = %identity.subject_id, operation, scoped = grant.scope().is_some(), "Access granted");
                AuditEvent::new(AuditEventType::AccessGranted)
            }
            Err(e) => {
                if matches!(e, AuthorizationError::MissingScopeCode { .. }) {
                    warn!(
                        subject = %identity.subject_id,
                        level = %identity.admin_level,
                        operation,
                        "Scoped administrator has no assigned code"
                    );
                } else {
                    debug!(subject = %identity.subject_id, operation, reason = %e, "Access denied");
                }
                AuditEvent::new(AuditEventType::AccessDenied).with_reason(e.to_string())
            }
        };

        self.audit.dispatch(
            event
                .with_subject(identity.subject_id.clone())
                .with_operation(operation),
        );
    }
}
