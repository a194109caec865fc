use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use folio_core::model::{ShowcaseDraft, ShowcaseSubmission, SubmissionId, TemplateId, UserId};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitShowcase {
    pub repo_url: String,
    #[serde(default)]
    pub demo_url: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowcaseView {
    pub id: SubmissionId,
    pub user_id: UserId,
    pub template_id: TemplateId,
    pub repo_url: String,
    pub demo_url: Option<String>,
    pub description: String,
    pub submitted_at: DateTime<Utc>,
}

impl From<ShowcaseSubmission> for ShowcaseView {
    fn from(s: ShowcaseSubmission) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            template_id: s.template_id,
            repo_url: s.repo_url.into(),
            demo_url: s.demo_url.map(Into::into),
            description: s.description,
            submitted_at: s.submitted_at,
        }
    }
}

/// GET /api/v1/showcase
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<Vec<ShowcaseView>>>> {
    let entries = state
        .services
        .showcase()
        .list(params.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;
    Ok(Json(DataResponse {
        data: entries.into_iter().map(ShowcaseView::from).collect(),
    }))
}

/// POST /api/v1/templates/{slug}/showcase
pub async fn submit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(body): Json<SubmitShowcase>,
) -> AppResult<(StatusCode, Json<DataResponse<ShowcaseView>>)> {
    let draft = ShowcaseDraft {
        repo_url: body.repo_url,
        demo_url: body.demo_url,
        description: body.description,
    };
    let stored = state
        .services
        .showcase()
        .submit(user.user_id, &slug, draft)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: ShowcaseView::from(stored),
        }),
    ))
}
