//! Authentication stage.
//!
//! Resolves the caller from `x-api-key` or `Authorization: Bearer`, and
//! stores a typed [`AuthContext`] in the request extensions for later
//! stages and handlers. Requests that fail are answered here and never
//! reach the handler.

use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use chrono::{DateTime, Utc};
use futures_util::future::LocalBoxFuture;
use tracing::debug;

use wg_core::domain::entities::{AuthenticatedIdentity, ClientInfo};
use wg_core::errors::AuthError;
use wg_core::services::auth::AuthenticationPipeline;
use wg_core::services::token::VerificationStrategy;

use crate::handlers::ApiError;

pub const OTP_SESSION_HEADER: &str = "x-otp-session";
pub const SESSION_ID_HEADER: &str = "x-session-id";
pub const API_KEY_HEADER: &str = "x-api-key";

/// How the caller proved its identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Bearer(VerificationStrategy),
    ApiKey,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Bearer(_) => "bearer",
            AuthMethod::ApiKey => "api_key",
        }
    }
}

/// The authenticated caller of the current request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: AuthenticatedIdentity,
    /// Registry session backing a bearer token; absent for API keys and legacy tokens
    pub session_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub method: AuthMethod,
}

/// Middleware factory for the authentication stage
#[derive(Clone)]
pub struct Authenticate {
    pipeline: Arc<AuthenticationPipeline>,
}

impl Authenticate {
    pub fn new(pipeline: Arc<AuthenticationPipeline>) -> Self {
        Self { pipeline }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authenticate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticateMiddleware {
            service: Rc::new(service),
            pipeline: Arc::clone(&self.pipeline),
        }))
    }
}

pub struct AuthenticateMiddleware<S> {
    service: Rc<S>,
    pipeline: Arc<AuthenticationPipeline>,
}

impl<S, B> Service<ServiceRequest> for AuthenticateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let pipeline = Arc::clone(&self.pipeline);

        Box::pin(async move {
            let resolved = resolve(&pipeline, req.headers()).await;
            match resolved {
                Ok(context) => {
                    debug!(
                        subject = %context.identity.subject_id,
                        method = context.method.as_str(),
                        "Request authenticated"
                    );
                    req.extensions_mut().insert(context);
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                Err(err) => {
                    let response = err.error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

/// An API key takes precedence over a bearer token when both are sent
async fn resolve(
    pipeline: &AuthenticationPipeline,
    headers: &HeaderMap,
) -> Result<AuthContext, ApiError> {
    if let Some(key) = header_value(headers, API_KEY_HEADER) {
        let identity = pipeline.authenticate_api_key(&key)?;
        return Ok(AuthContext {
            identity,
            session_id: None,
            expires_at: None,
            method: AuthMethod::ApiKey,
        });
    }

    let token = extract_bearer_token(headers).ok_or(AuthError::MissingCredentials)?;
    let session = pipeline.validate_token(&token).await?;
    Ok(AuthContext {
        identity: session.identity,
        session_id: session.session_id,
        expires_at: Some(session.expires_at),
        method: AuthMethod::Bearer(session.strategy),
    })
}

/// Extracts the token from `Authorization: Bearer <token>`
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Non-empty header value as a string
pub fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Client address and user agent for audit records and attempt tracking.
///
/// The address is the socket peer. `X-Forwarded-For` is honoured only when
/// that peer is a trusted proxy, and then the rightmost hop that is not
/// itself a trusted proxy is taken.
pub fn client_info(req: &HttpRequest, trusted_proxies: &[String]) -> ClientInfo {
    let peer = req.peer_addr().map(|addr| addr.ip().to_string());
    let ip = match peer {
        Some(peer) if is_trusted_proxy(&peer, trusted_proxies) => {
            forwarded_client(req.headers(), trusted_proxies).or(Some(peer))
        }
        other => other,
    };
    let user_agent = header_value(req.headers(), "user-agent");
    ClientInfo::new(ip, user_agent)
}

fn forwarded_client(headers: &HeaderMap, trusted_proxies: &[String]) -> Option<String> {
    let chain = header_value(headers, "x-forwarded-for")?;
    chain
        .rsplit(',')
        .map(|hop| strip_port(hop.trim()))
        .filter(|hop| !hop.is_empty())
        .find(|hop| !is_trusted_proxy(hop, trusted_proxies))
}

fn is_trusted_proxy(ip: &str, trusted_proxies: &[String]) -> bool {
    trusted_proxies.iter().any(|trusted| trusted == ip)
}

fn strip_port(addr: &str) -> String {
    addr.parse::<std::net::SocketAddr>()
        .map(|socket| socket.ip().to_string())
        .unwrap_or_else(|_| addr.to_string())
}

/// Required authentication; fails with 401 when the stage did not run or rejected
impl FromRequest for AuthContext {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = req
            .extensions()
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| AuthError::MissingCredentials.into());
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    #[::core::prelude::v1::test]
    fn test_extract_bearer_token() {
        let req = test::TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer test_token_123"))
            .to_srv_request();
        assert_eq!(extract_bearer_token(req.headers()), Some("test_token_123".to_string()));

        let no_scheme = test::TestRequest::default()
            .insert_header((AUTHORIZATION, "test_token_123"))
            .to_srv_request();
        assert_eq!(extract_bearer_token(no_scheme.headers()), None);

        let empty = test::TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer "))
            .to_srv_request();
        assert_eq!(extract_bearer_token(empty.headers()), None);

        let missing = test::TestRequest::default().to_srv_request();
        assert_eq!(extract_bearer_token(missing.headers()), None);
    }

    #[::core::prelude::v1::test]
    fn test_client_info_strips_port() {
        let req = test::TestRequest::default()
            .peer_addr("203.0.113.9:51234".parse().unwrap())
            .insert_header(("user-agent", "curl/8.0"))
            .to_http_request();
        let client = client_info(&req, &[]);
        assert_eq!(client.ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(client.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[::core::prelude::v1::test]
    fn test_client_info_ignores_forwarded_for_from_untrusted_peer() {
        let req = test::TestRequest::default()
            .peer_addr("198.51.100.9:40000".parse().unwrap())
            .insert_header(("x-forwarded-for", "203.0.113.1"))
            .to_http_request();
        let trusted = vec!["10.0.0.2".to_string()];
        assert_eq!(client_info(&req, &trusted).ip.as_deref(), Some("198.51.100.9"));
    }

    #[::core::prelude::v1::test]
    fn test_client_info_takes_rightmost_untrusted_hop_behind_proxy() {
        let trusted = vec!["10.0.0.2".to_string(), "10.0.0.3".to_string()];
        let req = test::TestRequest::default()
            .peer_addr("10.0.0.2:443".parse().unwrap())
            .insert_header(("x-forwarded-for", "1.2.3.4, 203.0.113.7, 10.0.0.3"))
            .to_http_request();
        assert_eq!(client_info(&req, &trusted).ip.as_deref(), Some("203.0.113.7"));

        let bare = test::TestRequest::default()
            .peer_addr("10.0.0.2:443".parse().unwrap())
            .to_http_request();
        assert_eq!(client_info(&bare, &trusted).ip.as_deref(), Some("10.0.0.2"));
    }
}
