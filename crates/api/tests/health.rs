//! Health endpoint and general HTTP behaviour.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get};

#[tokio::test]
async fn health_reports_storage_ok() {
    let app = build_test_app(0).await;
    let response = get(&app.router, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["db_healthy"], true);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = build_test_app(0).await;
    let response = get(&app.router, "/health", None).await;
    assert!(response.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = build_test_app(0).await;
    let response = get(&app.router, "/nope", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
