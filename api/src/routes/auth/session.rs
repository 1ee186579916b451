use actix_web::{web, HttpRequest, HttpResponse};

use wg_shared::ApiResponse;

use crate::app::AppState;
use crate::dto::auth::{LogoutQuery, LogoutResponse, ValidateResponse};
use crate::handlers::ApiError;
use crate::middleware::auth::{client_info, header_value, SESSION_ID_HEADER};
use crate::middleware::AuthContext;

/// Handler for GET /api/v1/auth/validate
///
/// Reports the identity behind the presented bearer token or API key.
pub async fn validate(auth: AuthContext) -> HttpResponse {
    let response = ValidateResponse {
        valid: true,
        auth_method: auth.method.as_str(),
        user: auth.identity,
        session_id: auth.session_id,
        expires_at: auth.expires_at,
    };
    HttpResponse::Ok().json(ApiResponse::success(response))
}

/// Handler for POST /api/v1/auth/logout
///
/// Ends the session named in `x-session-id`, else the session behind the
/// bearer token. `?all=true`, or a credential with no session, ends every
/// session of the caller.
pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
    auth: AuthContext,
    query: web::Query<LogoutQuery>,
) -> Result<HttpResponse, ApiError> {
    let target = if query.all {
        None
    } else {
        header_value(req.headers(), SESSION_ID_HEADER).or_else(|| auth.session_id.clone())
    };

    let client = client_info(&req, &state.http.trusted_proxies);
    let terminated = state
        .pipeline
        .logout(&auth.identity, target.as_deref(), &client)
        .await?;

    Ok(HttpResponse::Ok().json(
        ApiResponse::success(LogoutResponse { terminated }).with_message("Logged out"),
    ))
}
