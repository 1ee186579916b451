//! Authorization stage.
//!
//! Runs after [`Authenticate`](super::auth::Authenticate). Operation checks
//! store the resulting [`AccessGrant`] in the request extensions; handlers
//! read it through the [`Access`] extractor and pass its filters downstream.

use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures_util::future::LocalBoxFuture;

use wg_core::domain::entities::AdminLevel;
use wg_core::domain::value_objects::AccessGrant;
use wg_core::errors::{AuthError, DomainError};
use wg_core::services::authorization::AuthorizationGate;

use super::auth::AuthContext;
use crate::handlers::ApiError;

/// What a route demands of its caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRequirement {
    /// Allow-listed operation, with geographic scope injected
    Operation(String),
    /// Administrative level at or above the given one
    Level(AdminLevel),
    /// One of the listed role codes
    Roles(Vec<String>),
}

/// Middleware factory for the authorization stage
#[derive(Clone)]
pub struct RequireAccess {
    gate: Arc<AuthorizationGate>,
    requirement: Rc<AccessRequirement>,
}

impl RequireAccess {
    pub fn operation(gate: Arc<AuthorizationGate>, operation: impl Into<String>) -> Self {
        Self::new(gate, AccessRequirement::Operation(operation.into()))
    }

    pub fn level(gate: Arc<AuthorizationGate>, level: AdminLevel) -> Self {
        Self::new(gate, AccessRequirement::Level(level))
    }

    pub fn roles(gate: Arc<AuthorizationGate>, roles: &[&str]) -> Self {
        Self::new(
            gate,
            AccessRequirement::Roles(roles.iter().map(|r| r.to_string()).collect()),
        )
    }

    fn new(gate: Arc<AuthorizationGate>, requirement: AccessRequirement) -> Self {
        Self {
            gate,
            requirement: Rc::new(requirement),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireAccess
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireAccessMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireAccessMiddleware {
            service: Rc::new(service),
            gate: Arc::clone(&self.gate),
            requirement: Rc::clone(&self.requirement),
        }))
    }
}

pub struct RequireAccessMiddleware<S> {
    service: Rc<S>,
    gate: Arc<AuthorizationGate>,
    requirement: Rc<AccessRequirement>,
}

impl<S, B> Service<ServiceRequest> for RequireAccessMiddleware<S>
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
        let decision = check(&self.gate, &self.requirement, &req);

        Box::pin(async move {
            match decision {
                Ok(grant) => {
                    if let Some(grant) = grant {
                        req.extensions_mut().insert(grant);
                    }
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                Err(err) => Ok(req.into_response(err.error_response()).map_into_right_body()),
            }
        })
    }
}

fn check(
    gate: &AuthorizationGate,
    requirement: &AccessRequirement,
    req: &ServiceRequest,
) -> Result<Option<AccessGrant>, ApiError> {
    let extensions = req.extensions();
    let context = extensions
        .get::<AuthContext>()
        .ok_or(AuthError::MissingCredentials)?;

    match requirement {
        AccessRequirement::Operation(operation) => {
            Ok(Some(gate.authorize(&context.identity, operation)?))
        }
        AccessRequirement::Level(level) => {
            gate.require_hierarchical_access(&context.identity, *level)?;
            Ok(None)
        }
        AccessRequirement::Roles(roles) => {
            let roles: Vec<&str> = roles.iter().map(String::as_str).collect();
            gate.require_role(&context.identity, &roles)?;
            Ok(None)
        }
    }
}

/// The grant produced by an operation check
#[derive(Debug, Clone)]
pub struct Access(pub AccessGrant);

impl FromRequest for Access {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = req
            .extensions()
            .get::<AccessGrant>()
            .cloned()
            .map(Access)
            .ok_or_else(|| DomainError::internal("route is not guarded by an operation check").into());
        ready(result)
    }
}
