use axum::Json;
use axum::extract::{Path, State};
use folio_core::model::{AttemptId, StepId};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::routes::progress::ProgressView;
use crate::state::AppState;

/// Request body for a quiz submission.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
    /// Optional echo of the path id; must match when present.
    #[serde(default)]
    pub step_id: Option<u64>,
    pub answers: Vec<u32>,
    /// Client-computed score. Never trusted.
    #[serde(default)]
    pub score: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub attempt_id: AttemptId,
    pub step_id: StepId,
    pub score: u8,
    pub passed: bool,
    pub progress: ProgressView,
}

/// POST /api/v1/steps/{step_id}/quiz
pub async fn submit_quiz(
    State(state): State<AppState>,
    user: AuthUser,
    Path(step_id): Path<u64>,
    Json(body): Json<QuizSubmission>,
) -> AppResult<Json<DataResponse<QuizResult>>> {
    if body.step_id.is_some_and(|id| id != step_id) {
        return Err(AppError::Validation(
            "stepId in body does not match the path".into(),
        ));
    }

    let outcome = state
        .services
        .quizzes()
        .submit(user.user_id, StepId::new(step_id), body.answers, body.score)
        .await?;

    Ok(Json(DataResponse {
        data: QuizResult {
            attempt_id: outcome.attempt.id(),
            step_id: outcome.attempt.step_id(),
            score: outcome.attempt.score().value(),
            passed: outcome.attempt.passed(),
            progress: ProgressView::from(&outcome.instance),
        },
    }))
}
