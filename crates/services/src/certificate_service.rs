use std::sync::Arc;

use folio_core::certificate::Certificate;
use folio_core::model::UserId;
use storage::repository::{InstanceRepository, TemplateRepository, UserRepository};

use crate::error::CertificateServiceError;

/// Hands out certificate records for completed instances.
#[derive(Clone)]
pub struct CertificateService {
    users: Arc<dyn UserRepository>,
    templates: Arc<dyn TemplateRepository>,
    instances: Arc<dyn InstanceRepository>,
}

impl CertificateService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        templates: Arc<dyn TemplateRepository>,
        instances: Arc<dyn InstanceRepository>,
    ) -> Self {
        Self {
            users,
            templates,
            instances,
        }
    }

    /// # Errors
    ///
    /// Returns `CertificateServiceError::NotFound` for an unknown template,
    /// user or instance and `CertificateServiceError::NotEligible` until the
    /// instance reaches 100%.
    pub async fn certificate(
        &self,
        user: UserId,
        slug: &str,
    ) -> Result<Certificate, CertificateServiceError> {
        let template = self
            .templates
            .get_template_by_slug(slug)
            .await?
            .ok_or(CertificateServiceError::NotFound("template"))?;
        let instance = self
            .instances
            .get_instance(user, template.id())
            .await?
            .ok_or(CertificateServiceError::NotFound("instance"))?;
        if !instance.certificate_eligible() {
            return Err(CertificateServiceError::NotEligible);
        }
        let recipient = self
            .users
            .get_user(user)
            .await?
            .ok_or(CertificateServiceError::NotFound("user"))?;

        Certificate::for_instance(&instance, &template, recipient.display_name())
            .ok_or(CertificateServiceError::NotEligible)
    }
}
