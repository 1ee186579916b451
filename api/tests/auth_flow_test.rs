//! Login, OTP, validate and logout over HTTP

mod common;

use std::time::Duration;

use actix_web::{http::header, test};
use serde_json::{json, Value};

use wg_api::app::create_app;
use wg_core::domain::entities::AuditEventType;

use common::{context, context_with, test_config, PASSWORD, PROVINCE_EMAIL, WARD_EMAIL};

#[actix_web::test]
async fn test_ward_admin_login_returns_session_and_budget() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": WARD_EMAIL, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("x-ratelimit-limit").unwrap(), "3");
    assert_eq!(resp.headers().get("x-ratelimit-remaining").unwrap(), "3");
    assert!(resp.headers().contains_key("x-ratelimit-reset"));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert!(body["data"]["token"].as_str().unwrap().len() > 20);
    assert_eq!(body["data"]["expires_in"], 86400);
    assert_eq!(body["data"]["user"]["email"], WARD_EMAIL);
    assert_eq!(body["data"]["user"]["admin_level"], "ward");
}

#[actix_web::test]
async fn test_province_admin_completes_otp_challenge() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": PROVINCE_EMAIL, "password": PASSWORD }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["requires_otp"], true);
    assert_eq!(body["data"]["channel"], "email");
    assert!(body["data"].get("token").is_none());
    let user_id = body["data"]["user_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/verify-otp")
        .set_json(json!({ "user_id": user_id, "otp_code": ctx.delivery.last_code() }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["data"]["token"].is_string());
    let otp_session = body["data"]["otp_session"].as_str().unwrap().to_string();

    // The trusted OTP session skips the challenge on the next login
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .insert_header(("x-otp-session", otp_session))
        .set_json(json!({ "email": PROVINCE_EMAIL, "password": PASSWORD }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["data"]["token"].is_string());
    assert!(body["data"].get("requires_otp").is_none());
}

#[actix_web::test]
async fn test_wrong_otp_reports_attempts_remaining() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": PROVINCE_EMAIL, "password": PASSWORD }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let user_id = body["data"]["user_id"].as_str().unwrap().to_string();

    let wrong = if ctx.delivery.last_code() == "000000" { "111111" } else { "000000" };
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/verify-otp")
        .set_json(json!({ "user_id": user_id, "otp_code": wrong }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "INVALID_OTP");
    assert!(body["error"]["details"]["attempts_remaining"].is_number());
}

#[actix_web::test]
async fn test_resend_otp_issues_a_new_code() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": PROVINCE_EMAIL, "password": PASSWORD }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let user_id = body["data"]["user_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/resend-otp")
        .set_json(json!({ "user_id": user_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["requires_otp"], true);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/verify-otp")
        .set_json(json!({ "user_id": user_id, "otp_code": ctx.delivery.last_code() }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
}

#[actix_web::test]
async fn test_validate_then_logout_revokes_token() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": WARD_EMAIL, "password": PASSWORD }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let token = body["data"]["token"].as_str().unwrap().to_string();
    let session_id = body["data"]["session_id"].as_str().unwrap().to_string();
    let bearer = (header::AUTHORIZATION, format!("Bearer {}", token));

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/validate")
        .insert_header(bearer.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["valid"], true);
    assert_eq!(body["data"]["auth_method"], "bearer");
    assert_eq!(body["data"]["session_id"], session_id.as_str());
    assert_eq!(body["data"]["user"]["email"], WARD_EMAIL);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .insert_header(bearer.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["terminated"], 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/validate")
        .insert_header(bearer)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "SESSION_EXPIRED");

    tokio::time::sleep(Duration::from_millis(20)).await;
    let events = ctx.audit.events();
    assert!(events
        .iter()
        .any(|e| e.event_type == AuditEventType::SessionTerminated));
}

#[actix_web::test]
async fn test_logout_all_ends_every_session() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let mut tokens = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "email": WARD_EMAIL, "password": PASSWORD }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        tokens.push(body["data"]["token"].as_str().unwrap().to_string());
    }

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout?all=true")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", tokens[0])))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["terminated"], 2);

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/validate")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", tokens[1])))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
}

#[actix_web::test]
async fn test_repeated_failures_block_with_retry_after() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    for attempt in 1..=3u32 {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "email": WARD_EMAIL, "password": "wrong-password" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
        assert_eq!(
            resp.headers().get("x-ratelimit-remaining").unwrap(),
            (3 - attempt).to_string().as_str()
        );
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
    }

    // Blocked even with the right password
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": WARD_EMAIL, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 429);
    assert!(resp.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(resp.headers().get("x-ratelimit-remaining").unwrap(), "0");

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");
    assert!(body["error"]["details"]["retryAfter"].as_u64().unwrap() > 0);
}

#[actix_web::test]
async fn test_rotating_forwarded_for_does_not_reset_the_budget() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;
    let peer: std::net::SocketAddr = "198.51.100.9:40000".parse().unwrap();

    for hop in 1..=3u8 {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .peer_addr(peer)
            .insert_header(("x-forwarded-for", format!("203.0.113.{}", hop)))
            .set_json(json!({ "email": WARD_EMAIL, "password": "wrong-password" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);
    }

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .peer_addr(peer)
        .insert_header(("x-forwarded-for", "203.0.113.200"))
        .set_json(json!({ "email": WARD_EMAIL, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 429);
}

#[actix_web::test]
async fn test_trusted_proxy_forwarded_for_keys_each_client() {
    let mut config = test_config();
    config.server.trusted_proxies = vec![String::from("10.0.0.2")];
    let ctx = context_with(config);
    let app = test::init_service(create_app(ctx.state.clone())).await;
    let proxy: std::net::SocketAddr = "10.0.0.2:443".parse().unwrap();

    for _ in 0..3 {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .peer_addr(proxy)
            .insert_header(("x-forwarded-for", "203.0.113.1"))
            .set_json(json!({ "email": WARD_EMAIL, "password": "wrong-password" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);
    }

    let blocked = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .peer_addr(proxy)
        .insert_header(("x-forwarded-for", "203.0.113.1"))
        .set_json(json!({ "email": WARD_EMAIL, "password": PASSWORD }))
        .to_request();
    assert_eq!(test::call_service(&app, blocked).await.status(), 429);

    let other_client = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .peer_addr(proxy)
        .insert_header(("x-forwarded-for", "203.0.113.2"))
        .set_json(json!({ "email": WARD_EMAIL, "password": PASSWORD }))
        .to_request();
    assert_eq!(test::call_service(&app, other_client).await.status(), 200);
}

#[actix_web::test]
async fn test_unknown_email_matches_wrong_password() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": "nobody@example.gov", "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let unknown: Value = test::read_body_json(resp).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": WARD_EMAIL, "password": "not-the-password" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let wrong: Value = test::read_body_json(resp).await;

    assert_eq!(unknown["error"], wrong["error"]);
}

#[actix_web::test]
async fn test_invalid_login_body_is_rejected() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": "not-an-email", "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn test_background_sweeper_discards_expired_challenges() {
    let mut config = test_config();
    config.auth.otp.expiry_seconds = 0;
    let ctx = context_with(config);
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": PROVINCE_EMAIL, "password": PASSWORD }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["requires_otp"], true);
    assert_eq!(ctx.state.otp.pending_challenges(), 1);

    let handles = ctx
        .state
        .spawn_background(Duration::from_millis(10), Duration::from_millis(5));
    tokio::time::sleep(Duration::from_millis(60)).await;
    for handle in handles {
        handle.abort();
    }
    assert_eq!(ctx.state.otp.pending_challenges(), 0);
}
