//! Admission stage: every request passes through the bounded queue before
//! any handler work starts, and holds a concurrency slot while it runs.

use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};

use wg_core::services::admission::RequestAdmissionController;

use crate::handlers::ApiError;

/// Middleware factory for the admission stage
#[derive(Clone)]
pub struct AdmissionGate {
    controller: Arc<RequestAdmissionController>,
}

impl AdmissionGate {
    pub fn new(controller: Arc<RequestAdmissionController>) -> Self {
        Self { controller }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdmissionGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AdmissionGateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdmissionGateMiddleware {
            service: Rc::new(service),
            controller: Arc::clone(&self.controller),
        }))
    }
}

pub struct AdmissionGateMiddleware<S> {
    service: Rc<S>,
    controller: Arc<RequestAdmissionController>,
}

impl<S, B> Service<ServiceRequest> for AdmissionGateMiddleware<S>
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
        let admitted = self.controller.admit();

        Box::pin(async move {
            let ticket = match admitted {
                Ok(ticket) => ticket,
                Err(e) => {
                    warn!(path = %req.path(), "Request rejected, admission queue full");
                    let response = ApiError::from(e).error_response();
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };

            let permit = match ticket.wait().await {
                Ok(permit) => permit,
                Err(e) => {
                    warn!(path = %req.path(), error = %e, "Request not dispatched");
                    let response = ApiError::from(e).error_response();
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };
            debug!(waited_ms = permit.waited.as_millis() as u64, "Request admitted");

            let result = service.call(req).await;
            drop(permit);
            result.map(ServiceResponse::map_into_left_body)
        })
    }
}
