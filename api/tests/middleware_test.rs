//! Middleware stages and access checks over HTTP

mod common;

use std::sync::Arc;

use actix_web::{http::header, test, web, App, HttpResponse};
use serde_json::Value;

use wg_api::app::create_app;
use wg_api::middleware::{Access, AuthContext, Authenticate, RequireAccess};
use wg_core::domain::entities::{AdminLevel, ClientInfo};
use wg_core::domain::value_objects::{LoginOutcome, QueryFilters};
use wg_core::services::auth::LoginCredentials;

use common::{context, TestContext, API_KEY, PASSWORD, PROVINCE_EMAIL, WARD_EMAIL};

async fn ward_token(ctx: &TestContext) -> String {
    let outcome = ctx
        .state
        .pipeline
        .login(LoginCredentials::new(WARD_EMAIL, PASSWORD), &ClientInfo::default())
        .await
        .unwrap();
    match outcome {
        LoginOutcome::Authenticated(session) => session.token,
        other => panic!("unexpected outcome: {:?}", other),
    }
}

async fn scoped_report(Access(grant): Access, auth: AuthContext) -> HttpResponse {
    let filters = grant.constrain(QueryFilters::new());
    HttpResponse::Ok().json(serde_json::json!({
        "subject": auth.identity.subject_id,
        "filters": filters.len(),
    }))
}

async fn plain() -> HttpResponse {
    HttpResponse::Ok().finish()
}

#[actix_web::test]
async fn test_missing_credentials_are_rejected() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let req = test::TestRequest::get().uri("/api/v1/auth/validate").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/validate")
        .insert_header((header::AUTHORIZATION, "Bearer not.a.token"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
}

#[actix_web::test]
async fn test_api_key_resolves_service_identity() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/validate")
        .insert_header(("x-api-key", API_KEY))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["auth_method"], "api_key");
    assert_eq!(body["data"]["user"]["subject_id"], "api-key:reporting");
    assert!(body["data"].get("session_id").is_none());

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/validate")
        .insert_header(("x-api-key", "some-other-key"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
}

#[actix_web::test]
async fn test_scope_returns_filters_for_ward_admin() {
    let ctx = context();
    let token = ward_token(&ctx).await;
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/scope/members.list")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["restricted"], true);
    assert_eq!(body["data"]["filters"]["province_code"], "P1");
    assert_eq!(body["data"]["filters"]["district_code"], "D7");
    assert_eq!(body["data"]["filters"]["municipal_code"], "M3");
    assert_eq!(body["data"]["filters"]["ward_code"], "W12");

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/scope/audit.read")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn test_api_key_scope_stops_at_its_level() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/scope/members.read")
        .insert_header(("x-api-key", API_KEY))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["filters"]["district_code"], "D7");
    assert!(body["data"]["filters"].get("ward_code").is_none());
}

#[actix_web::test]
async fn test_require_access_guards_downstream_routes() {
    let ctx = context();
    let token = ward_token(&ctx).await;
    let gate = Arc::clone(&ctx.state.gate);
    let pipeline = Arc::clone(&ctx.state.pipeline);

    let app = test::init_service(
        App::new()
            .route(
                "/reports",
                web::get()
                    .to(scoped_report)
                    .wrap(RequireAccess::operation(Arc::clone(&gate), "members.list"))
                    .wrap(Authenticate::new(Arc::clone(&pipeline))),
            )
            .route(
                "/audit",
                web::get()
                    .to(plain)
                    .wrap(RequireAccess::operation(Arc::clone(&gate), "audit.read"))
                    .wrap(Authenticate::new(Arc::clone(&pipeline))),
            )
            .route(
                "/province-only",
                web::get()
                    .to(plain)
                    .wrap(RequireAccess::level(Arc::clone(&gate), AdminLevel::Province))
                    .wrap(Authenticate::new(Arc::clone(&pipeline))),
            )
            .route(
                "/ward-role",
                web::get()
                    .to(plain)
                    .wrap(RequireAccess::roles(gate, &["ward_admin"]))
                    .wrap(Authenticate::new(pipeline)),
            ),
    )
    .await;
    let bearer = (header::AUTHORIZATION, format!("Bearer {}", token));

    let req = test::TestRequest::get().uri("/reports").insert_header(bearer.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["filters"], 4);

    let req = test::TestRequest::get().uri("/audit").insert_header(bearer.clone()).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::get()
        .uri("/province-only")
        .insert_header(bearer.clone())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::get().uri("/ward-role").insert_header(bearer).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get().uri("/reports").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
}

#[actix_web::test]
async fn test_health_reports_admission_and_circuits() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["service"], "wardgate");
    assert!(body["data"]["admission"]["max_queue_size"].as_u64().unwrap() > 0);
    let circuits = body["data"]["circuits"].as_array().unwrap();
    assert!(!circuits.is_empty());
    assert!(circuits.iter().all(|c| c["state"] == "CLOSED"));
}

#[actix_web::test]
async fn test_security_headers_and_request_id() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .insert_header(("x-request-id", "trace-123"))
        .set_json(serde_json::json!({ "email": PROVINCE_EMAIL, "password": "wrong" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    let headers = resp.headers();
    assert_eq!(headers.get("x-request-id").unwrap(), "trace-123");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
    assert!(headers.get(header::STRICT_TRANSPORT_SECURITY).is_none());

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.headers().contains_key("x-request-id"));
    assert!(resp.headers().get(header::CACHE_CONTROL).is_none());
}

#[actix_web::test]
async fn test_unknown_route_uses_error_envelope() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let req = test::TestRequest::get().uri("/nowhere").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
