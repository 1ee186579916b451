use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

use wg_shared::ApiResponse;

use crate::app::AppState;
use crate::dto::auth::{ChallengeResponse, ResendOtpRequest, VerifyOtpRequest, VerifyOtpResponse};
use crate::handlers::ApiError;
use crate::middleware::auth::client_info;

/// Handler for POST /api/v1/auth/verify-otp
///
/// Completes a challenged login. On success returns the session token and a
/// trusted OTP session that later logins may present in `x-otp-session`.
///
/// ## Errors
/// - 401 `INVALID_OTP` with `attempts_remaining` in details
/// - 401 `OTP_EXPIRED` when no live challenge exists
/// - 401 `OTP_ATTEMPTS_EXHAUSTED` once the challenge is used up; a new login is needed
pub async fn verify_otp(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<VerifyOtpRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    request.validate()?;

    let client = client_info(&req, &state.http.trusted_proxies);
    let verified = state
        .pipeline
        .verify_otp(&request.user_id, request.otp_code.trim(), &client)
        .await?;

    Ok(HttpResponse::Ok().json(
        ApiResponse::success(VerifyOtpResponse::from(verified)).with_message("Login successful"),
    ))
}

/// Handler for POST /api/v1/auth/resend-otp
///
/// Replaces any pending code for the account with a fresh one.
pub async fn resend_otp(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ResendOtpRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    request.validate()?;

    let client = client_info(&req, &state.http.trusted_proxies);
    let dispatch = state.pipeline.resend_otp(&request.user_id, &client).await?;

    Ok(HttpResponse::Ok().json(
        ApiResponse::success(ChallengeResponse::from(dispatch))
            .with_message("Verification code sent"),
    ))
}
