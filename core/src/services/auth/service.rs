//! Authentication pipeline: credentials, MFA policy, OTP challenge and session issuance

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use constant_time_eq::constant_time_eq;
use once_cell::sync::OnceCell;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::entities::{
    AuditEvent, AuditEventType, AuthenticatedIdentity, ClientInfo, OtpDispatch, SessionRecord,
    UserRecord,
};
use crate::domain::value_objects::{IssuedSession, LoginOutcome, OtpVerified};
use crate::errors::{AuthError, DomainError};
use crate::repositories::{CredentialStore, SessionRegistry};
use crate::services::admission::{
    CircuitBreakerRegistry, CircuitError, CircuitState, CREDENTIAL_STORE, OTP_DELIVERY,
    SESSION_REGISTRY,
};
use crate::services::audit::AuditService;
use crate::services::login_attempts::{AttemptDecision, LoginAttemptTracker};
use crate::services::otp::OtpChallengeService;
use crate::services::token::TokenService;

use super::config::AuthPipelineConfig;
use super::state::{LoginFlow, LoginState};
use super::types::{LoginCredentials, ValidatedSession};

const DUMMY_PASSWORD: &str = "wardgate-timing-equalizer";

/// Collaborators the pipeline is built from
#[derive(Clone)]
pub struct PipelineComponents {
    pub credentials: Arc<dyn CredentialStore>,
    pub sessions: Arc<dyn SessionRegistry>,
    pub otp: Arc<dyn OtpChallengeService>,
    pub tracker: Arc<LoginAttemptTracker>,
    pub tokens: Arc<TokenService>,
    pub breakers: Arc<CircuitBreakerRegistry>,
    pub audit: AuditService,
}

/// Orchestrates a login from submitted credentials to an issued session
pub struct AuthenticationPipeline {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionRegistry>,
    otp: Arc<dyn OtpChallengeService>,
    tracker: Arc<LoginAttemptTracker>,
    tokens: Arc<TokenService>,
    breakers: Arc<CircuitBreakerRegistry>,
    audit: AuditService,
    config: AuthPipelineConfig,
    dummy_hash: OnceCell<Option<String>>,
}

impl AuthenticationPipeline {
    pub fn new(components: PipelineComponents, config: AuthPipelineConfig) -> Self {
        // Register protected dependencies up front so they show in health output
        for dependency in [CREDENTIAL_STORE, OTP_DELIVERY, SESSION_REGISTRY] {
            components.breakers.get(dependency);
        }

        Self {
            credentials: components.credentials,
            sessions: components.sessions,
            otp: components.otp,
            tracker: components.tracker,
            tokens: components.tokens,
            breakers: components.breakers,
            audit: components.audit,
            config,
            dummy_hash: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &AuthPipelineConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Current attempt budget for a client and account, used for rate-limit headers
    pub fn attempt_status(&self, client: &ClientInfo, email: &str) -> AttemptDecision {
        self.tracker
            .check_allowed(&LoginAttemptTracker::source_key(client_ip(client), email))
    }

    /// Authenticate with email and password.
    ///
    /// Blocked sources are rejected before the credential store is touched.
    /// Unknown emails and wrong passwords are indistinguishable to the caller.
    pub async fn login(
        &self,
        request: LoginCredentials,
        client: &ClientInfo,
    ) -> Result<LoginOutcome, DomainError> {
        let now = Utc::now();
        let source_key = LoginAttemptTracker::source_key(client_ip(client), &request.email);
        let mut flow = LoginFlow::start(wg_shared::validation::mask_email(&request.email));

        // Held until the outcome is recorded
        let reservation = match self.tracker.reserve_at(&source_key, now) {
            Ok(reservation) => reservation,
            Err(decision) => {
                let retry_after_seconds = decision.retry_after_seconds.unwrap_or(1);
                self.audit.dispatch(
                    AuditEvent::new(AuditEventType::LoginBlocked)
                        .with_email(&request.email)
                        .with_client(client.ip.as_deref(), client.user_agent.as_deref())
                        .with_data(json!({ "retry_after_seconds": retry_after_seconds })),
                );
                return Err(AuthError::RateLimitExceeded { retry_after_seconds }.into());
            }
        };

        let verified = self.verify_credentials(&request.email, &request.password).await;
        let failed = matches!(verified, Err(DomainError::Auth(AuthError::InvalidCredentials)));
        if verified.is_ok() || failed {
            self.tracker.record_outcome_at(&source_key, verified.is_ok(), now);
        }
        drop(reservation);

        let user = match verified {
            Ok(user) => user,
            Err(e) => {
                if e.status_code() < 500 {
                    self.audit.dispatch(
                        AuditEvent::new(AuditEventType::LoginFailure)
                            .with_email(&request.email)
                            .with_client(client.ip.as_deref(), client.user_agent.as_deref())
                            .with_reason(e.error_code()),
                    );
                }
                return Err(e);
            }
        };

        flow.identify(user.id.to_string());
        flow.advance(LoginState::CredentialsOk)?;

        if self.config.mfa.requires_mfa(user.admin_level, &user.role_code) {
            let trusted = match request.otp_session.as_deref() {
                Some(token) => self.has_trusted_otp_session(&user, token).await,
                None => false,
            };

            if !trusted {
                let dispatch = self.send_challenge(&user, client).await?;
                flow.advance(LoginState::ChallengePending)?;
                return Ok(LoginOutcome::ChallengeRequired {
                    user_id: user.id.to_string(),
                    otp_expires_at: dispatch.expires_at,
                    channel: dispatch.channel,
                });
            }
            debug!(user_id = %user.id, "Trusted OTP session presented, challenge skipped");
        }

        let session = self.complete_login(&user, client, now).await?;
        flow.advance(LoginState::Authenticated)?;
        Ok(LoginOutcome::Authenticated(session))
    }

    /// Check a one-time code for a pending challenge and, if correct, issue a session
    pub async fn verify_otp(
        &self,
        user_id: &str,
        code: &str,
        client: &ClientInfo,
    ) -> Result<OtpVerified, DomainError> {
        let now = Utc::now();
        let user = self.load_user(user_id).await?;
        ensure_usable(&user, now)?;

        let subject = user.id.to_string();
        let mut flow = LoginFlow::resume_challenge(subject.clone());
        let otp_session = match self.otp.validate(&subject, code).await {
            Ok(session) => session,
            Err(e) => {
                if matches!(
                    e,
                    DomainError::Auth(AuthError::OtpAttemptsExhausted | AuthError::OtpExpired)
                ) {
                    flow.advance(LoginState::Locked)?;
                }
                self.audit.dispatch(
                    AuditEvent::new(AuditEventType::OtpFailed)
                        .with_subject(subject.clone())
                        .with_email(&user.email)
                        .with_client(client.ip.as_deref(), client.user_agent.as_deref())
                        .with_reason(e.error_code())
                        .with_data(json!({ "state": flow.state().as_str() })),
                );
                return Err(e);
            }
        };

        self.audit.dispatch(
            AuditEvent::new(AuditEventType::OtpVerified)
                .with_subject(subject)
                .with_email(&user.email)
                .with_client(client.ip.as_deref(), client.user_agent.as_deref()),
        );

        let session = self.complete_login(&user, client, now).await?;
        flow.advance(LoginState::Authenticated)?;
        Ok(OtpVerified {
            session,
            otp_session,
        })
    }

    /// Replace the pending challenge with a fresh code
    pub async fn resend_otp(
        &self,
        user_id: &str,
        client: &ClientInfo,
    ) -> Result<OtpDispatch, DomainError> {
        let user = self.load_user(user_id).await?;
        ensure_usable(&user, Utc::now())?;

        if !self.config.mfa.requires_mfa(user.admin_level, &user.role_code) {
            return Err(AuthError::MfaNotRequired.into());
        }

        self.send_challenge(&user, client).await
    }

    /// Verify a bearer token and confirm its session has not been terminated
    pub async fn validate_token(&self, token: &str) -> Result<ValidatedSession, DomainError> {
        let now = Utc::now();
        let verified = match self.tokens.verify_at(token, now) {
            Ok(verified) => verified,
            Err(e) => {
                self.audit.dispatch(
                    AuditEvent::new(AuditEventType::TokenRejected).with_reason(e.error_code()),
                );
                return Err(e);
            }
        };

        let claims = verified.claims;
        if let Some(session_id) = claims.session_id() {
            let record = self
                .guarded(SESSION_REGISTRY, || self.sessions.find(session_id))
                .await?;

            let token_hash = self.tokens.hash_token(token);
            let live = record.is_some_and(|session| {
                session.is_active_at(now)
                    && session.subject_id == claims.sub
                    && constant_time_eq(session.token_hash.as_bytes(), token_hash.as_bytes())
            });
            if !live {
                debug!(subject = %claims.sub, session_id, "Token names an inactive session");
                self.audit.dispatch(
                    AuditEvent::new(AuditEventType::TokenRejected)
                        .with_subject(claims.sub.clone())
                        .with_reason("SESSION_EXPIRED"),
                );
                return Err(AuthError::SessionExpired.into());
            }
        }

        Ok(ValidatedSession {
            identity: claims.identity(),
            session_id: claims.session_id().map(str::to_string),
            expires_at: claims.expires_at(),
            strategy: verified.strategy,
        })
    }

    /// End one session, or every session of the subject when none is named.
    /// Returns how many sessions were terminated.
    pub async fn logout(
        &self,
        identity: &AuthenticatedIdentity,
        session_id: Option<&str>,
        client: &ClientInfo,
    ) -> Result<usize, DomainError> {
        let now = Utc::now();

        let terminated = match session_id {
            Some(id) => {
                let record = self.guarded(SESSION_REGISTRY, || self.sessions.find(id)).await?;
                match record {
                    Some(session) if session.subject_id == identity.subject_id => {
                        let ended = self
                            .guarded(SESSION_REGISTRY, || self.sessions.terminate(id, now))
                            .await?;
                        usize::from(ended)
                    }
                    // Another subject's session is treated as unknown
                    _ => 0,
                }
            }
            None => {
                let subject = identity.subject_id.as_str();
                self.guarded(SESSION_REGISTRY, || self.sessions.terminate_all_for(subject, now))
                    .await?
            }
        };

        info!(subject = %identity.subject_id, terminated, "Logout");
        self.audit.dispatch(
            AuditEvent::new(AuditEventType::SessionTerminated)
                .with_subject(identity.subject_id.clone())
                .with_client(client.ip.as_deref(), client.user_agent.as_deref())
                .with_data(json!({ "terminated": terminated, "session_id": session_id })),
        );
        Ok(terminated)
    }

    /// Resolve an `x-api-key` header to its configured service identity
    pub fn authenticate_api_key(&self, key: &str) -> Result<AuthenticatedIdentity, DomainError> {
        match self.config.api_keys.authenticate(key) {
            Some(principal) => {
                debug!(api_key = %principal.name, "API key accepted");
                self.audit.dispatch(
                    AuditEvent::new(AuditEventType::ApiKeyAccepted)
                        .with_subject(principal.identity.subject_id.clone()),
                );
                Ok(principal.identity.clone())
            }
            None => {
                self.audit.dispatch(
                    AuditEvent::new(AuditEventType::TokenRejected).with_reason("INVALID_API_KEY"),
                );
                Err(AuthError::InvalidCredentials.into())
            }
        }
    }

    async fn verify_credentials(&self, email: &str, password: &str) -> Result<UserRecord, DomainError> {
        let email = wg_shared::validation::normalize_email(email);
        let user = self
            .guarded(CREDENTIAL_STORE, || self.credentials.find_by_email(&email))
            .await?;

        let Some(user) = user else {
            // Burn the same bcrypt work as a real check
            if let Some(hash) = self.dummy_hash() {
                let _ = verify_password(password.to_string(), hash).await;
            }
            return Err(AuthError::InvalidCredentials.into());
        };

        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            return Err(AuthError::InvalidCredentials.into());
        }

        ensure_usable(&user, Utc::now())?;
        Ok(user)
    }

    async fn has_trusted_otp_session(&self, user: &UserRecord, token: &str) -> bool {
        match self.otp.has_valid_session(&user.id.to_string(), token).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "OTP session lookup failed, challenging");
                false
            }
        }
    }

    async fn send_challenge(
        &self,
        user: &UserRecord,
        client: &ClientInfo,
    ) -> Result<OtpDispatch, DomainError> {
        self.otp.check_destination(user)?;
        let dispatch = self
            .guarded(OTP_DELIVERY, || self.otp.generate_and_send(user))
            .await?;

        info!(user_id = %user.id, channel = ?dispatch.channel, "OTP challenge issued");
        self.audit.dispatch(
            AuditEvent::new(AuditEventType::OtpIssued)
                .with_subject(user.id.to_string())
                .with_email(&user.email)
                .with_client(client.ip.as_deref(), client.user_agent.as_deref())
                .with_data(json!({ "state": LoginState::ChallengePending.as_str() })),
        );
        Ok(dispatch)
    }

    async fn complete_login(
        &self,
        user: &UserRecord,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, DomainError> {
        let session = self.issue_session(&user.identity(), client, now).await?;
        if let Err(e) = self.credentials.record_login(user.id, now).await {
            warn!(user_id = %user.id, error = %e, "Failed to stamp last login");
        }

        info!(user_id = %user.id, session_id = %session.session_id, "Login succeeded");
        self.audit.dispatch(
            AuditEvent::new(AuditEventType::LoginSuccess)
                .with_subject(user.id.to_string())
                .with_email(&user.email)
                .with_client(client.ip.as_deref(), client.user_agent.as_deref())
                .with_data(json!({ "state": LoginState::Authenticated.as_str() })),
        );
        Ok(session)
    }

    async fn issue_session(
        &self,
        identity: &AuthenticatedIdentity,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, DomainError> {
        let session_id = SessionRecord::new_id();
        let issued = self.tokens.issue_at(identity, &session_id, now)?;

        let record = SessionRecord {
            id: session_id.clone(),
            subject_id: identity.subject_id.clone(),
            token_hash: self.tokens.hash_token(&issued.token),
            client_ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            created_at: now,
            expires_at: issued.expires_at,
            terminated_at: None,
        };
        self.guarded(SESSION_REGISTRY, || self.sessions.create(&record))
            .await?;

        self.audit.dispatch(
            AuditEvent::new(AuditEventType::SessionCreated)
                .with_subject(identity.subject_id.clone())
                .with_client(client.ip.as_deref(), client.user_agent.as_deref())
                .with_data(json!({ "session_id": session_id })),
        );

        Ok(IssuedSession {
            expires_in: issued.expires_in(),
            token: issued.token,
            session_id,
            expires_at: issued.expires_at,
            identity: identity.clone(),
        })
    }

    async fn load_user(&self, user_id: &str) -> Result<UserRecord, DomainError> {
        let id = Uuid::parse_str(user_id.trim()).map_err(|_| AuthError::UserNotFound)?;
        self.guarded(CREDENTIAL_STORE, || self.credentials.find_by_id(id))
            .await?
            .ok_or_else(|| AuthError::UserNotFound.into())
    }

    /// Run a dependency call through its circuit breaker, auditing state changes.
    /// Only internal errors count against the dependency.
    async fn guarded<T, F, Fut>(&self, dependency: &str, operation: F) -> Result<T, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let breaker = self.breakers.get(dependency);
        let before = breaker.state();
        let result = breaker
            .call_classified(operation, DomainError::is_internal)
            .await;
        let after = breaker.state();

        if before != after {
            let event_type = match after {
                CircuitState::Open => Some(AuditEventType::CircuitOpened),
                CircuitState::Closed => Some(AuditEventType::CircuitClosed),
                CircuitState::HalfOpen => None,
            };
            if let Some(event_type) = event_type {
                self.audit
                    .dispatch(AuditEvent::new(event_type).with_operation(dependency));
            }
        }

        result.map_err(CircuitError::into_domain)
    }

    fn dummy_hash(&self) -> Option<String> {
        self.dummy_hash
            .get_or_init(|| bcrypt::hash(DUMMY_PASSWORD, self.config.dummy_hash_cost).ok())
            .clone()
    }
}

impl std::fmt::Debug for AuthenticationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn client_ip(client: &ClientInfo) -> &str {
    client.ip.as_deref().unwrap_or("unknown")
}

/// Administrative lock, then account status
fn ensure_usable(user: &UserRecord, now: DateTime<Utc>) -> Result<(), DomainError> {
    if let Some(until) = user.locked_until.filter(|_| user.is_locked_at(now)) {
        return Err(AuthError::AccountLocked { until }.into());
    }
    if !user.is_active() {
        return Err(AuthError::AccountDisabled.into());
    }
    Ok(())
}

/// bcrypt off the async executor. A malformed stored hash is a mismatch.
async fn verify_password(password: String, hash: String) -> Result<bool, DomainError> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| DomainError::internal(format!("Password verification task failed: {}", e)))?;

    Ok(outcome.unwrap_or_else(|e| {
        warn!(error = %e, "Stored password hash could not be parsed");
        false
    }))
}
