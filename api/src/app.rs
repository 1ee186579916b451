//! Application state and factory
//!
//! Builds the gating services from configuration and assembles the
//! Actix-web application around them.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web, App, Error, HttpResponse,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

use wg_core::errors::DomainError;
use wg_core::repositories::{AuditSink, CredentialStore, SessionRegistry};
use wg_core::services::admission::{
    AdmissionPolicy, CircuitBreakerPolicy, CircuitBreakerRegistry, RequestAdmissionController,
};
use wg_core::services::audit::AuditService;
use wg_core::services::auth::{AuthPipelineConfig, AuthenticationPipeline, PipelineComponents};
use wg_core::services::authorization::{AccessPolicy, AuthorizationGate};
use wg_core::services::login_attempts::{LoginAttemptPolicy, LoginAttemptTracker};
use wg_core::services::otp::{OtpChallengeService, OtpDelivery};
use wg_core::services::token::{TokenService, TokenServiceConfig};
use wg_infra::{
    create_otp_delivery, DatabasePool, InMemoryCredentialStore, InMemoryOtpChallengeService,
    InMemorySessionRegistry, MySqlAuditSink, MySqlCredentialStore, OtpChallengeSettings,
    RedisClient, RedisSessionRegistry, TracingAuditSink,
};
use wg_shared::{error_codes, ApiResponse, AppConfig, CorsConfig};

use crate::handlers::ApiError;
use crate::middleware::{
    create_cors, AdmissionGate, Authenticate, RateLimitHeaders, SecurityHeaders,
};
use crate::routes::{auth, health};

/// Transport settings the application factory needs on every worker
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub cors: CorsConfig,
    pub hsts: bool,
    pub max_payload_size: usize,
    /// Peers allowed to set `X-Forwarded-For`
    pub trusted_proxies: Vec<String>,
}

/// Services shared by every worker
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AuthenticationPipeline>,
    pub gate: Arc<AuthorizationGate>,
    pub admission: Arc<RequestAdmissionController>,
    pub breakers: Arc<CircuitBreakerRegistry>,
    pub tracker: Arc<LoginAttemptTracker>,
    pub otp: Arc<InMemoryOtpChallengeService>,
    pub http: HttpSettings,
}

/// Storage and delivery backends behind the core services
#[derive(Clone)]
pub struct Collaborators {
    pub credentials: Arc<dyn CredentialStore>,
    pub sessions: Arc<dyn SessionRegistry>,
    pub otp: Arc<InMemoryOtpChallengeService>,
    pub audit_sink: Arc<dyn AuditSink>,
}

impl Collaborators {
    /// MySQL and Redis where configured, in-process stand-ins otherwise
    pub async fn from_config(config: &AppConfig) -> Result<Self, DomainError> {
        let (credentials, audit_sink): (Arc<dyn CredentialStore>, Arc<dyn AuditSink>) =
            match &config.database {
                Some(database) => {
                    let pool = DatabasePool::new(database.clone()).await?;
                    info!("Using MySQL credential store and audit sink");
                    (
                        Arc::new(MySqlCredentialStore::new(pool.pool().clone())) as Arc<dyn CredentialStore>,
                        Arc::new(MySqlAuditSink::new(pool.pool().clone())) as Arc<dyn AuditSink>,
                    )
                }
                None => {
                    warn!("No database configured; credential directory is empty");
                    (
                        Arc::new(InMemoryCredentialStore::new()) as Arc<dyn CredentialStore>,
                        Arc::new(TracingAuditSink) as Arc<dyn AuditSink>,
                    )
                }
            };

        let sessions: Arc<dyn SessionRegistry> = match &config.cache {
            Some(cache) => {
                let client = RedisClient::new(cache.clone()).await?;
                info!("Using Redis session registry");
                Arc::new(RedisSessionRegistry::new(client))
            }
            None => {
                warn!("No cache configured; sessions are held in process memory");
                Arc::new(InMemorySessionRegistry::new())
            }
        };

        let delivery = create_otp_delivery(&config.auth.otp.delivery)?;

        Ok(Self {
            credentials,
            sessions,
            otp: Arc::new(InMemoryOtpChallengeService::new(
                delivery,
                OtpChallengeSettings::from(&config.auth.otp),
            )),
            audit_sink,
        })
    }

    /// Fully in-process backends around the given directory and delivery channel
    pub fn in_memory(
        credentials: Arc<dyn CredentialStore>,
        delivery: Arc<dyn OtpDelivery>,
        settings: OtpChallengeSettings,
    ) -> Self {
        Self {
            credentials,
            sessions: Arc::new(InMemorySessionRegistry::new()),
            otp: Arc::new(InMemoryOtpChallengeService::new(delivery, settings)),
            audit_sink: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = sink;
        self
    }
}

impl AppState {
    /// Wire the core services from configuration and backends
    pub fn assemble(config: &AppConfig, collaborators: Collaborators) -> Result<Self, DomainError> {
        let audit = AuditService::with_defaults(collaborators.audit_sink);
        let tracker = Arc::new(LoginAttemptTracker::new(LoginAttemptPolicy::from(
            &config.login_attempts,
        )));
        let breakers = Arc::new(CircuitBreakerRegistry::new(CircuitBreakerPolicy::from(
            &config.circuit_breaker,
        )));
        let tokens = Arc::new(TokenService::new(TokenServiceConfig::from(&config.auth.jwt))?);

        let pipeline = AuthenticationPipeline::new(
            PipelineComponents {
                credentials: collaborators.credentials,
                sessions: collaborators.sessions,
                otp: Arc::clone(&collaborators.otp) as Arc<dyn OtpChallengeService>,
                tracker: Arc::clone(&tracker),
                tokens,
                breakers: Arc::clone(&breakers),
                audit: audit.clone(),
            },
            AuthPipelineConfig::try_from(&config.auth)?,
        );

        let gate = AuthorizationGate::new(AccessPolicy::from(&config.access), audit);
        let admission = RequestAdmissionController::new(AdmissionPolicy::from(&config.admission));

        Ok(Self {
            pipeline: Arc::new(pipeline),
            gate: Arc::new(gate),
            admission: Arc::new(admission),
            breakers,
            tracker,
            otp: collaborators.otp,
            http: HttpSettings {
                cors: config.cors.clone(),
                hsts: config.environment.is_production(),
                max_payload_size: config.server.max_payload_size,
                trusted_proxies: config.server.trusted_proxies.clone(),
            },
        })
    }

    /// Start the attempt and OTP sweepers and the admission dispatcher
    pub fn spawn_background(&self, sweep_every: Duration, dispatch_every: Duration) -> Vec<JoinHandle<()>> {
        vec![
            self.tracker.spawn_sweeper(sweep_every),
            self.otp.spawn_sweeper(sweep_every),
            self.admission.spawn_dispatcher(dispatch_every),
        ]
    }
}

/// Create and configure the application with all dependencies
pub fn create_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let cors = create_cors(&state.http.cors);
    let security = SecurityHeaders::new(state.http.hsts);
    let json_config = web::JsonConfig::default()
        .limit(state.http.max_payload_size)
        .error_handler(|err, _req| ApiError::validation(err.to_string()).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::validation(err.to_string()).into());

    let admission = AdmissionGate::new(Arc::clone(&state.admission));
    let pipeline = Arc::clone(&state.pipeline);

    App::new()
        .app_data(web::Data::new(state))
        .app_data(json_config)
        .app_data(query_config)
        // Registered innermost first: logging runs inside CORS, CORS inside security headers
        .wrap(TracingLogger::default())
        .wrap(cors)
        .wrap(security)
        .route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api/v1").wrap(admission).service(
                web::scope("/auth")
                    .wrap(RateLimitHeaders)
                    .route("/login", web::post().to(auth::login))
                    .route("/verify-otp", web::post().to(auth::verify_otp))
                    .route("/resend-otp", web::post().to(auth::resend_otp))
                    .route(
                        "/validate",
                        web::get()
                            .to(auth::validate)
                            .wrap(Authenticate::new(Arc::clone(&pipeline))),
                    )
                    .route(
                        "/logout",
                        web::post()
                            .to(auth::logout)
                            .wrap(Authenticate::new(Arc::clone(&pipeline))),
                    )
                    .route(
                        "/scope/{operation}",
                        web::get()
                            .to(auth::scope)
                            .wrap(Authenticate::new(pipeline)),
                    ),
            ),
        )
        .default_service(web::route().to(not_found))
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::error(
        error_codes::NOT_FOUND,
        "The requested resource was not found",
    ))
}
