//! CORS configuration built from [`CorsConfig`].

use actix_cors::Cors;
use tracing::info;

use wg_shared::CorsConfig;

use super::auth::{API_KEY_HEADER, OTP_SESSION_HEADER, SESSION_ID_HEADER};
use super::rate_limit::{X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET};
use super::security::REQUEST_ID_HEADER;

/// Build the CORS middleware. `*` in the origin list allows any origin.
pub fn create_cors(config: &CorsConfig) -> Cors {
    let mut cors = if config.allows_any_origin() {
        info!("Configuring permissive CORS");
        Cors::default().allow_any_origin()
    } else {
        info!(origins = ?config.allowed_origins, "Configuring CORS");
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors = cors
        .allowed_methods(config.allowed_methods.iter().map(String::as_str))
        .allowed_headers(config.allowed_headers.iter().map(String::as_str))
        .allowed_headers([OTP_SESSION_HEADER, SESSION_ID_HEADER, API_KEY_HEADER])
        .expose_headers([
            X_RATELIMIT_LIMIT,
            X_RATELIMIT_REMAINING,
            X_RATELIMIT_RESET,
            "retry-after",
            REQUEST_ID_HEADER,
        ])
        .max_age(config.max_age);

    if config.allow_credentials {
        cors = cors.supports_credentials();
    }
    cors
}
