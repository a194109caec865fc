use std::sync::Arc;

use folio_core::Clock;
use folio_core::model::{ShowcaseDraft, ShowcaseSubmission, UserId};
use storage::repository::{InstanceRepository, ShowcaseRepository, TemplateRepository};

use crate::error::ShowcaseServiceError;

/// Upper bound for one page of showcase entries.
pub const MAX_LIST_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct ShowcaseService {
    clock: Clock,
    templates: Arc<dyn TemplateRepository>,
    instances: Arc<dyn InstanceRepository>,
    showcase: Arc<dyn ShowcaseRepository>,
}

impl ShowcaseService {
    #[must_use]
    pub fn new(
        clock: Clock,
        templates: Arc<dyn TemplateRepository>,
        instances: Arc<dyn InstanceRepository>,
        showcase: Arc<dyn ShowcaseRepository>,
    ) -> Self {
        Self {
            clock,
            templates,
            instances,
            showcase,
        }
    }

    /// Publish finished work for a completed instance, replacing any earlier
    /// entry for it.
    ///
    /// # Errors
    ///
    /// Returns `ShowcaseServiceError::NotFound` for an unknown template or
    /// instance, `ShowcaseServiceError::NotEligible` before completion and
    /// `ShowcaseServiceError::Showcase` for invalid URLs or descriptions.
    pub async fn submit(
        &self,
        user: UserId,
        slug: &str,
        draft: ShowcaseDraft,
    ) -> Result<ShowcaseSubmission, ShowcaseServiceError> {
        let template = self
            .templates
            .get_template_by_slug(slug)
            .await?
            .ok_or(ShowcaseServiceError::NotFound("template"))?;
        let instance = self
            .instances
            .get_instance(user, template.id())
            .await?
            .ok_or(ShowcaseServiceError::NotFound("instance"))?;
        if !instance.certificate_eligible() {
            return Err(ShowcaseServiceError::NotEligible);
        }

        let validated = draft.validate(instance.id(), user, template.id(), self.clock.now())?;
        let stored = self.showcase.upsert_submission(validated).await?;
        tracing::info!(
            user_id = %user,
            template_id = %template.id(),
            submission_id = %stored.id,
            "Showcase entry published"
        );
        Ok(stored)
    }

    /// Newest entries first; `limit` is clamped to `1..=MAX_LIST_LIMIT`.
    ///
    /// # Errors
    ///
    /// Returns `ShowcaseServiceError::Storage` on repository failures.
    pub async fn list(&self, limit: u32) -> Result<Vec<ShowcaseSubmission>, ShowcaseServiceError> {
        let limit = limit.clamp(1, MAX_LIST_LIMIT);
        Ok(self.showcase.list_submissions(limit).await?)
    }
}
