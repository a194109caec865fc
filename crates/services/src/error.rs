//! Shared error types for the services crate.

use thiserror::Error;

use folio_core::model::{QuizError, ShowcaseError, TemplateError, UserError};
use folio_core::scoring::ScoringError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `TemplateService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TemplateServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("template slug already exists")]
    DuplicateSlug,
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Every retry lost the race for the instance row.
    #[error("instance is being updated concurrently; gave up after {attempts} attempts")]
    Contention { attempts: u32 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CertificateService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CertificateServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("project is not complete yet")]
    NotEligible,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ShowcaseService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShowcaseServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("only completed projects can be showcased")]
    NotEligible,
    #[error(transparent)]
    Showcase(#[from] ShowcaseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
