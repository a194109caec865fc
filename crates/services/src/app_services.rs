use std::sync::Arc;

use folio_core::Clock;
use storage::repository::{HealthProbe, Storage};

use crate::certificate_service::CertificateService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::quiz_service::QuizService;
use crate::showcase_service::ShowcaseService;
use crate::template_service::TemplateService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    templates: Arc<TemplateService>,
    quizzes: Arc<QuizService>,
    progress: Arc<ProgressService>,
    certificates: Arc<CertificateService>,
    showcase: Arc<ShowcaseService>,
    health: Arc<dyn HealthProbe>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if connecting or migrating fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.templates),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.instances),
        ));
        let quizzes = Arc::new(QuizService::new(
            clock,
            Arc::clone(&storage.templates),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.instances),
            Arc::clone(&progress),
        ));
        let templates = Arc::new(TemplateService::new(
            clock,
            Arc::clone(&storage.users),
            Arc::clone(&storage.templates),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.instances),
        ));
        let certificates = Arc::new(CertificateService::new(
            Arc::clone(&storage.users),
            Arc::clone(&storage.templates),
            Arc::clone(&storage.instances),
        ));
        let showcase = Arc::new(ShowcaseService::new(
            clock,
            Arc::clone(&storage.templates),
            Arc::clone(&storage.instances),
            Arc::clone(&storage.showcase),
        ));

        Self {
            templates,
            quizzes,
            progress,
            certificates,
            showcase,
            health: Arc::clone(&storage.health),
        }
    }

    #[must_use]
    pub fn templates(&self) -> Arc<TemplateService> {
        Arc::clone(&self.templates)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn certificates(&self) -> Arc<CertificateService> {
        Arc::clone(&self.certificates)
    }

    #[must_use]
    pub fn showcase(&self) -> Arc<ShowcaseService> {
        Arc::clone(&self.showcase)
    }

    #[must_use]
    pub fn health(&self) -> Arc<dyn HealthProbe> {
        Arc::clone(&self.health)
    }
}
