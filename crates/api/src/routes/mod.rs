pub mod health;
pub mod progress;
pub mod quiz;
pub mod showcase;
pub mod templates;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /templates                          list (public)
/// /templates/{slug}                   template with ordered steps (public)
/// /templates/{slug}/start             start, idempotent (auth)
/// /templates/{slug}/progress          progress snapshot (auth)
/// /templates/{slug}/certificate       certificate record (auth)
/// /templates/{slug}/showcase          publish finished work (auth)
/// /steps/{step_id}/quiz               submit answers (auth)
/// /showcase                           newest showcase entries (public)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/templates", get(templates::list_templates))
        .route("/templates/{slug}", get(templates::get_template))
        .route("/templates/{slug}/start", post(templates::start_template))
        .route("/templates/{slug}/progress", get(progress::get_progress))
        .route("/templates/{slug}/certificate", get(progress::get_certificate))
        .route("/templates/{slug}/showcase", post(showcase::submit))
        .route("/steps/{step_id}/quiz", post(quiz::submit_quiz))
        .route("/showcase", get(showcase::list))
}
