use actix_web::{web, HttpRequest, HttpResponse};
use tracing::info;
use validator::Validate;

use wg_core::domain::value_objects::LoginOutcome;
use wg_core::services::auth::LoginCredentials;
use wg_shared::ApiResponse;

use crate::app::AppState;
use crate::dto::auth::{ChallengeResponse, LoginRequest, SessionResponse};
use crate::handlers::ApiError;
use crate::middleware::auth::{client_info, header_value, OTP_SESSION_HEADER};
use crate::middleware::RateLimitSnapshot;

/// Handler for POST /api/v1/auth/login
///
/// # Request Body
///
/// ```json
/// { "email": "admin@example.gov", "password": "..." }
/// ```
///
/// A trusted OTP session from an earlier verification may be sent in the
/// `x-otp-session` header to skip the one-time code.
///
/// # Response
///
/// - 200 with a session token, or with `requires_otp: true` when a code was sent
/// - 400 on malformed input
/// - 401 on wrong email or password, indistinguishable from each other
/// - 423 `ACCOUNT_LOCKED` when the account is locked
/// - 401 `ACCOUNT_DISABLED` when the account is disabled
/// - 429 when the source is blocked; carries `Retry-After`
///
/// Every response carries the caller's `X-RateLimit-*` budget.
pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    request.validate()?;

    let client = client_info(&req, &state.http.trusted_proxies);
    let credentials = LoginCredentials::new(request.email.clone(), request.password)
        .with_otp_session(header_value(req.headers(), OTP_SESSION_HEADER));

    let outcome = state.pipeline.login(credentials, &client).await;
    let snapshot =
        RateLimitSnapshot::from(&state.pipeline.attempt_status(&client, &request.email));

    let mut response = match outcome {
        Ok(LoginOutcome::Authenticated(session)) => HttpResponse::Ok().json(
            ApiResponse::success(SessionResponse::from(session)).with_message("Login successful"),
        ),
        Ok(LoginOutcome::ChallengeRequired {
            user_id,
            otp_expires_at,
            channel,
        }) => {
            info!(user_id = %user_id, channel = ?channel, "Login awaiting one-time code");
            HttpResponse::Ok().json(
                ApiResponse::success(ChallengeResponse::new(user_id, otp_expires_at, channel))
                    .with_message("Verification code sent"),
            )
        }
        Err(error) => return Err(ApiError::from(error).with_rate_limit(snapshot)),
    };

    snapshot.attach(&mut response);
    Ok(response)
}
