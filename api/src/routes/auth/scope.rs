use actix_web::{web, HttpResponse};

use wg_shared::ApiResponse;

use crate::app::AppState;
use crate::dto::auth::ScopeResponse;
use crate::handlers::ApiError;
use crate::middleware::AuthContext;

/// Handler for GET /api/v1/auth/scope/{operation}
///
/// Runs the access check for `operation` as the caller and returns the
/// query filters a downstream service must apply. Denials answer 403.
pub async fn scope(
    state: web::Data<AppState>,
    auth: AuthContext,
    operation: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let operation = operation.into_inner();
    let grant = state.gate.authorize(&auth.identity, &operation)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(ScopeResponse::new(operation, &grant))))
}
