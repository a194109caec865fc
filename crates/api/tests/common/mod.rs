#![allow(dead_code)]

use std::sync::Arc;

use api::auth::{JwtConfig, generate_access_token};
use api::config::ServerConfig;
use api::router::build_app_router;
use api::state::AppState;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, header};
use folio_core::model::{Difficulty, QuestionDraft, Step, TemplateDraft, UserId};
use folio_core::time::fixed_now;
use http_body_util::BodyExt;
use services::{AppServices, Clock};
use storage::repository::{InMemoryRepository, Storage};
use tower::ServiceExt;

pub const SECRET: &str = "test-secret";

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        db_url: "sqlite::memory:".to_string(),
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig::new(SECRET),
    }
}

pub struct TestApp {
    pub router: Router,
    pub repo: InMemoryRepository,
    pub services: AppServices,
    pub steps: Vec<Step>,
}

/// App over in-memory storage with a `todo-api` template of `step_count`
/// steps; each step has two questions answered correctly by `[0, 0]`.
pub async fn build_test_app(step_count: usize) -> TestApp {
    let repo = InMemoryRepository::new();
    let services =
        AppServices::from_storage(&Storage::from_memory(repo.clone()), Clock::fixed(fixed_now()));
    let templates = services.templates();

    let template = templates
        .create_template(TemplateDraft {
            slug: "todo-api".into(),
            title: "Todo API".into(),
            description: Some("Build a REST service".into()),
            difficulty: Difficulty::Beginner,
            technologies: vec!["rust".into(), "sqlite".into()],
        })
        .await
        .unwrap();

    let mut steps = Vec::new();
    for i in 0..step_count {
        let step = templates
            .append_step(template.id(), format!("Step {}", i + 1), "Do the thing.")
            .await
            .unwrap();
        for n in 0..2 {
            templates
                .add_question(QuestionDraft {
                    step_id: step.id,
                    prompt: format!("Question {n}"),
                    options: vec!["right".into(), "wrong".into()],
                    correct_index: 0,
                })
                .await
                .unwrap();
        }
        steps.push(step);
    }

    let state = AppState {
        services: services.clone(),
        config: Arc::new(test_config()),
    };

    TestApp {
        router: build_app_router(state),
        repo,
        services,
        steps,
    }
}

pub fn token(user: u64, name: &str) -> String {
    generate_access_token(UserId::new(user), name, &JwtConfig::new(SECRET)).unwrap()
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str, bearer: Option<&str>) -> Response<Body> {
    send(app, Method::GET, uri, bearer, None).await
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    bearer: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, bearer, Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
