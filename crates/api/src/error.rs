use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use services::{
    CertificateServiceError, ProgressServiceError, QuizServiceError, ShowcaseServiceError,
    TemplateServiceError,
};
use storage::repository::StorageError;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce `{ "error", "code" }` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Input failed validation; nothing was written.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The instance has not reached 100% yet.
    #[error("Not eligible: {0}")]
    NotEligible(String),

    /// Optimistic-concurrency retries were exhausted.
    #[error("Instance is busy; retry the request")]
    Contention,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::NotEligible(msg) => (StatusCode::CONFLICT, "NOT_ELIGIBLE", msg.clone()),
            AppError::Contention => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CONTENTION",
                self.to_string(),
            ),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => AppError::NotFound("resource".into()),
            // Version races are retried and surface as `ProgressServiceError::Contention`;
            // a bare storage conflict is a uniqueness violation.
            StorageError::Conflict => AppError::Conflict("resource already exists".into()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<TemplateServiceError> for AppError {
    fn from(err: TemplateServiceError) -> Self {
        match err {
            TemplateServiceError::NotFound(what) => AppError::NotFound(what.into()),
            TemplateServiceError::DuplicateSlug => {
                AppError::Conflict("template slug already exists".into())
            }
            TemplateServiceError::Template(e) => AppError::Validation(e.to_string()),
            TemplateServiceError::Quiz(e) => AppError::Validation(e.to_string()),
            TemplateServiceError::User(e) => AppError::Validation(e.to_string()),
            TemplateServiceError::Storage(e) => e.into(),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<ProgressServiceError> for AppError {
    fn from(err: ProgressServiceError) -> Self {
        match err {
            ProgressServiceError::NotFound(what) => AppError::NotFound(what.into()),
            ProgressServiceError::Contention { .. } => AppError::Contention,
            ProgressServiceError::Storage(e) => e.into(),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<QuizServiceError> for AppError {
    fn from(err: QuizServiceError) -> Self {
        match err {
            QuizServiceError::NotFound(what) => AppError::NotFound(what.into()),
            QuizServiceError::Scoring(e) => AppError::Validation(e.to_string()),
            QuizServiceError::Progress(e) => e.into(),
            QuizServiceError::Storage(e) => e.into(),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<CertificateServiceError> for AppError {
    fn from(err: CertificateServiceError) -> Self {
        match err {
            CertificateServiceError::NotFound(what) => AppError::NotFound(what.into()),
            CertificateServiceError::NotEligible => {
                AppError::NotEligible("project is not complete yet".into())
            }
            CertificateServiceError::Storage(e) => e.into(),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<ShowcaseServiceError> for AppError {
    fn from(err: ShowcaseServiceError) -> Self {
        match err {
            ShowcaseServiceError::NotFound(what) => AppError::NotFound(what.into()),
            ShowcaseServiceError::NotEligible => {
                AppError::NotEligible("only completed projects can be showcased".into())
            }
            ShowcaseServiceError::Showcase(e) => AppError::Validation(e.to_string()),
            ShowcaseServiceError::Storage(e) => e.into(),
            other => AppError::Internal(other.to_string()),
        }
    }
}
