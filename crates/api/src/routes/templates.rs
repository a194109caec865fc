use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use folio_core::model::{ProjectTemplate, Step, StepId, TemplateId, User};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::routes::progress::ProgressView;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateView {
    pub id: TemplateId,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: &'static str,
    pub technologies: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&ProjectTemplate> for TemplateView {
    fn from(t: &ProjectTemplate) -> Self {
        Self {
            id: t.id(),
            slug: t.slug().to_owned(),
            title: t.title().to_owned(),
            description: t.description().map(str::to_owned),
            difficulty: t.difficulty().as_str(),
            technologies: t.technologies().to_vec(),
            created_at: t.created_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StepView {
    pub id: StepId,
    pub position: u32,
    pub title: String,
    pub body: String,
}

impl From<Step> for StepView {
    fn from(step: Step) -> Self {
        Self {
            id: step.id,
            position: step.position,
            title: step.title,
            body: step.body,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateDetailView {
    #[serde(flatten)]
    pub template: TemplateView,
    pub steps: Vec<StepView>,
}

/// GET /api/v1/templates
pub async fn list_templates(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<Vec<TemplateView>>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let templates = state.services.templates().list_templates(limit).await?;
    Ok(Json(DataResponse {
        data: templates.iter().map(TemplateView::from).collect(),
    }))
}

/// GET /api/v1/templates/{slug}
pub async fn get_template(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<TemplateDetailView>>> {
    let detail = state.services.templates().template_detail(&slug).await?;
    Ok(Json(DataResponse {
        data: TemplateDetailView {
            template: TemplateView::from(&detail.template),
            steps: detail.steps.into_iter().map(StepView::from).collect(),
        },
    }))
}

/// POST /api/v1/templates/{slug}/start
///
/// Records the caller's display name from the token, then starts the
/// template. Starting twice returns the existing instance.
pub async fn start_template(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<ProgressView>>> {
    let learner = User::new(user.user_id, user.name)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let instance = state.services.templates().start(&learner, &slug).await?;
    Ok(Json(DataResponse {
        data: ProgressView::from(&instance),
    }))
}
