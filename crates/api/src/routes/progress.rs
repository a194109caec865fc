use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use folio_core::certificate::Certificate;
use folio_core::model::{InstanceId, ProgressState, StartedProject, StepId, TemplateId};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Progress read model for one started instance.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub instance_id: InstanceId,
    pub template_id: TemplateId,
    pub progress: u8,
    pub completed_steps: Vec<StepId>,
    pub certificate_eligible: bool,
    pub certificate_issued_at: Option<DateTime<Utc>>,
    pub state: ProgressState,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&StartedProject> for ProgressView {
    fn from(instance: &StartedProject) -> Self {
        Self {
            instance_id: instance.id(),
            template_id: instance.template_id(),
            progress: instance.progress(),
            completed_steps: instance.completed_steps().to_vec(),
            certificate_eligible: instance.certificate_eligible(),
            certificate_issued_at: instance.certificate_issued_at(),
            state: instance.state(),
            started_at: instance.started_at(),
            updated_at: instance.updated_at(),
        }
    }
}

/// GET /api/v1/templates/{slug}/progress
pub async fn get_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<ProgressView>>> {
    let template = state.services.templates().template_by_slug(&slug).await?;
    let instance = state
        .services
        .progress()
        .progress(user.user_id, template.id())
        .await?;
    Ok(Json(DataResponse {
        data: ProgressView::from(&instance),
    }))
}

/// GET /api/v1/templates/{slug}/certificate
pub async fn get_certificate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<Certificate>>> {
    let certificate = state
        .services
        .certificates()
        .certificate(user.user_id, &slug)
        .await?;
    Ok(Json(DataResponse { data: certificate }))
}
