//! Start, quiz, progress, certificate and showcase over HTTP.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, post_json, token};
use folio_core::model::UserId;
use serde_json::json;
use storage::repository::{InstanceRepository, QuizRepository};

#[tokio::test]
async fn catalogue_is_public() {
    let app = build_test_app(3).await;

    let list = body_json(get(&app.router, "/api/v1/templates", None).await).await;
    assert_eq!(list["data"][0]["slug"], "todo-api");
    assert_eq!(list["data"][0]["difficulty"], "beginner");

    let response = get(&app.router, "/api/v1/templates/todo-api", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let detail = body_json(response).await;
    assert_eq!(detail["data"]["title"], "Todo API");
    assert_eq!(detail["data"]["steps"].as_array().unwrap().len(), 3);
    assert_eq!(detail["data"]["steps"][0]["position"], 1);

    let missing = get(&app.router, "/api/v1/templates/missing", None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(missing).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn mutations_require_a_valid_token() {
    let app = build_test_app(1).await;
    let step = app.steps[0].id.value();

    let response = post_json(
        &app.router,
        &format!("/api/v1/steps/{step}/quiz"),
        None,
        json!({ "answers": [0, 0] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");

    let response = post_json(
        &app.router,
        "/api/v1/templates/todo-api/start",
        Some("not-a-jwt"),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert!(app.repo.instance_keys().await.unwrap().is_empty());
    assert!(
        app.repo
            .attempts_for_step(UserId::new(1), app.steps[0].id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn quiz_flow_reaches_certificate() {
    let app = build_test_app(2).await;
    let bearer = token(1, "Ada Lovelace");
    let auth = Some(bearer.as_str());

    let started = post_json(&app.router, "/api/v1/templates/todo-api/start", auth, json!({})).await;
    assert_eq!(started.status(), StatusCode::OK);
    let started = body_json(started).await;
    assert_eq!(started["data"]["progress"], 0);
    assert_eq!(started["data"]["state"], "not_started");

    let step0 = app.steps[0].id.value();
    let first = post_json(
        &app.router,
        &format!("/api/v1/steps/{step0}/quiz"),
        auth,
        json!({ "stepId": step0, "answers": [0, 0], "score": 100 }),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;
    assert_eq!(first["data"]["passed"], true);
    assert_eq!(first["data"]["progress"]["progress"], 50);
    assert_eq!(first["data"]["progress"]["state"], "in_progress");

    let cert = get(&app.router, "/api/v1/templates/todo-api/certificate", auth).await;
    assert_eq!(cert.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(cert).await["code"], "NOT_ELIGIBLE");

    let step1 = app.steps[1].id.value();
    post_json(
        &app.router,
        &format!("/api/v1/steps/{step1}/quiz"),
        auth,
        json!({ "answers": [0, 0] }),
    )
    .await;

    let progress = body_json(get(&app.router, "/api/v1/templates/todo-api/progress", auth).await).await;
    assert_eq!(progress["data"]["progress"], 100);
    assert_eq!(progress["data"]["certificateEligible"], true);
    assert_eq!(progress["data"]["state"], "completed");
    assert_eq!(
        progress["data"]["completedSteps"],
        json!([step0, step1])
    );

    let cert = get(&app.router, "/api/v1/templates/todo-api/certificate", auth).await;
    assert_eq!(cert.status(), StatusCode::OK);
    let cert = body_json(cert).await;
    assert_eq!(cert["data"]["recipientName"], "Ada Lovelace");
    assert_eq!(cert["data"]["templateTitle"], "Todo API");
}

#[tokio::test]
async fn reported_score_does_not_count() {
    let app = build_test_app(1).await;
    let bearer = token(1, "Ada");
    let auth = Some(bearer.as_str());
    post_json(&app.router, "/api/v1/templates/todo-api/start", auth, json!({})).await;

    let step = app.steps[0].id.value();
    let response = post_json(
        &app.router,
        &format!("/api/v1/steps/{step}/quiz"),
        auth,
        json!({ "answers": [1, 1], "score": 5 }),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["score"], 0);
    assert_eq!(body["data"]["passed"], false);
    assert_eq!(body["data"]["progress"]["progress"], 0);
}

#[tokio::test]
async fn bad_submissions_are_rejected() {
    let app = build_test_app(1).await;
    let bearer = token(1, "Ada");
    let auth = Some(bearer.as_str());
    let step = app.steps[0].id.value();

    // Not started yet.
    let response = post_json(
        &app.router,
        &format!("/api/v1/steps/{step}/quiz"),
        auth,
        json!({ "answers": [0, 0] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    post_json(&app.router, "/api/v1/templates/todo-api/start", auth, json!({})).await;

    let response = post_json(
        &app.router,
        &format!("/api/v1/steps/{step}/quiz"),
        auth,
        json!({ "answers": [0, 0, 0] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = post_json(
        &app.router,
        &format!("/api/v1/steps/{step}/quiz"),
        auth,
        json!({ "stepId": step + 1, "answers": [0, 0] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app.router,
        "/api/v1/steps/999999/quiz",
        auth,
        json!({ "answers": [] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn showcase_needs_completion() {
    let app = build_test_app(1).await;
    let bearer = token(1, "Ada");
    let auth = Some(bearer.as_str());
    post_json(&app.router, "/api/v1/templates/todo-api/start", auth, json!({})).await;

    let entry = json!({
        "repoUrl": "https://github.com/ada/todo",
        "demoUrl": "https://todo.example.com",
        "description": "Done!"
    });
    let early = post_json(&app.router, "/api/v1/templates/todo-api/showcase", auth, entry.clone()).await;
    assert_eq!(early.status(), StatusCode::CONFLICT);

    let step = app.steps[0].id.value();
    post_json(
        &app.router,
        &format!("/api/v1/steps/{step}/quiz"),
        auth,
        json!({ "answers": [0, 0] }),
    )
    .await;

    let created = post_json(&app.router, "/api/v1/templates/todo-api/showcase", auth, entry).await;
    assert_eq!(created.status(), StatusCode::CREATED);

    let listed = body_json(get(&app.router, "/api/v1/showcase?limit=5", None).await).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert_eq!(listed["data"][0]["repoUrl"], "https://github.com/ada/todo");
}
