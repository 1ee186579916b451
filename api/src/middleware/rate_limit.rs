//! Rate-limit response headers.
//!
//! Handlers attach a [`RateLimitSnapshot`] to their response extensions;
//! [`RateLimitHeaders`] turns it into `X-RateLimit-*` and `Retry-After`
//! headers on the way out. Responses without a snapshot pass untouched.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderName, HeaderValue},
    Error, HttpResponse,
};
use chrono::{DateTime, Utc};
use futures_util::future::LocalBoxFuture;

use wg_core::services::login_attempts::AttemptDecision;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// The caller's remaining budget at the time the response was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    pub retry_after_seconds: Option<u64>,
}

impl RateLimitSnapshot {
    pub fn attach(self, response: &mut HttpResponse) {
        response.extensions_mut().insert(self);
    }

    fn apply<B>(&self, response: &mut ServiceResponse<B>) {
        let headers = response.headers_mut();
        headers.insert(HeaderName::from_static(X_RATELIMIT_LIMIT), HeaderValue::from(self.limit));
        headers.insert(
            HeaderName::from_static(X_RATELIMIT_REMAINING),
            HeaderValue::from(self.remaining),
        );
        headers.insert(
            HeaderName::from_static(X_RATELIMIT_RESET),
            HeaderValue::from(self.reset_at.timestamp().max(0)),
        );
        if let Some(seconds) = self.retry_after_seconds {
            if !headers.contains_key(header::RETRY_AFTER) {
                headers.insert(header::RETRY_AFTER, HeaderValue::from(seconds));
            }
        }
    }
}

impl From<&AttemptDecision> for RateLimitSnapshot {
    fn from(decision: &AttemptDecision) -> Self {
        Self {
            limit: decision.limit,
            remaining: decision.remaining,
            reset_at: decision.reset_at,
            retry_after_seconds: decision.retry_after_seconds,
        }
    }
}

/// Middleware factory for the rate-limit header stage
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitHeaders;

impl<S, B> Transform<S, ServiceRequest> for RateLimitHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitHeadersMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitHeadersMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RateLimitHeadersMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RateLimitHeadersMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let mut response = service.call(req).await?;
            let snapshot = response
                .response()
                .extensions()
                .get::<RateLimitSnapshot>()
                .copied();
            if let Some(snapshot) = snapshot {
                snapshot.apply(&mut response);
            }
            Ok(response)
        })
    }
}
