#![forbid(unsafe_code)]

pub mod app_services;
pub mod certificate_service;
pub mod error;
pub mod progress_service;
pub mod quiz_service;
pub mod showcase_service;
pub mod template_service;

#[cfg(test)]
mod testing;

pub use folio_core::Clock;

pub use app_services::AppServices;
pub use certificate_service::CertificateService;
pub use error::{
    AppServicesError, CertificateServiceError, ProgressServiceError, QuizServiceError,
    ShowcaseServiceError, TemplateServiceError,
};
pub use progress_service::{MAX_ATTEMPTS, ProgressService, ProgressUpdate, ReconcileReport};
pub use quiz_service::{QuizOutcome, QuizService};
pub use showcase_service::ShowcaseService;
pub use template_service::{TemplateDetail, TemplateService};
