use std::sync::Arc;

use folio_core::Clock;
use folio_core::model::{
    ProjectTemplate, QuestionDraft, QuizQuestion, StartedProject, Step, StepDraft, StepId,
    TemplateDraft, TemplateId, User,
};
use storage::repository::{
    InstanceRepository, QuizRepository, StorageError, TemplateRepository, UserRepository,
};

use crate::error::TemplateServiceError;

/// A template with its steps in position order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDetail {
    pub template: ProjectTemplate,
    pub steps: Vec<Step>,
}

/// Orchestrates the template catalogue and starting templates.
#[derive(Clone)]
pub struct TemplateService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    templates: Arc<dyn TemplateRepository>,
    quizzes: Arc<dyn QuizRepository>,
    instances: Arc<dyn InstanceRepository>,
}

impl TemplateService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        templates: Arc<dyn TemplateRepository>,
        quizzes: Arc<dyn QuizRepository>,
        instances: Arc<dyn InstanceRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            templates,
            quizzes,
            instances,
        }
    }

    /// Validate and persist a new template.
    ///
    /// # Errors
    ///
    /// Returns `TemplateServiceError::Template` for validation failures and
    /// `TemplateServiceError::DuplicateSlug` if the slug is taken.
    pub async fn create_template(
        &self,
        draft: TemplateDraft,
    ) -> Result<ProjectTemplate, TemplateServiceError> {
        let validated = draft.validate(self.clock.now())?;
        match self.templates.insert_template(validated).await {
            Ok(template) => Ok(template),
            Err(StorageError::Conflict) => Err(TemplateServiceError::DuplicateSlug),
            Err(err) => Err(err.into()),
        }
    }

    /// Append a step at the end of the template.
    ///
    /// # Errors
    ///
    /// Returns `TemplateServiceError::NotFound` if the template is unknown.
    pub async fn append_step(
        &self,
        template_id: TemplateId,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Step, TemplateServiceError> {
        let draft = StepDraft {
            template_id,
            title: title.into(),
            body: body.into(),
        }
        .validate()?;
        if self.templates.get_template(template_id).await?.is_none() {
            return Err(TemplateServiceError::NotFound("template"));
        }
        Ok(self.templates.append_step(draft).await?)
    }

    /// # Errors
    ///
    /// Returns `TemplateServiceError::Quiz` for invalid questions and
    /// `TemplateServiceError::NotFound` if the step is unknown.
    pub async fn add_question(
        &self,
        draft: QuestionDraft,
    ) -> Result<QuizQuestion, TemplateServiceError> {
        let draft = draft.validate()?;
        if self.templates.get_step(draft.step_id).await?.is_none() {
            return Err(TemplateServiceError::NotFound("step"));
        }
        Ok(self.quizzes.add_question(draft).await?)
    }

    /// Delete a step and its questions.
    ///
    /// Instances that completed the step keep the id until their next
    /// aggregation prunes it.
    ///
    /// # Errors
    ///
    /// Returns `TemplateServiceError::NotFound` if the step is unknown.
    pub async fn remove_step(&self, step_id: StepId) -> Result<(), TemplateServiceError> {
        match self.templates.delete_step(step_id).await {
            Ok(()) => {
                tracing::info!(step_id = %step_id, "Step removed");
                Ok(())
            }
            Err(StorageError::NotFound) => Err(TemplateServiceError::NotFound("step")),
            Err(err) => Err(err.into()),
        }
    }

    /// # Errors
    ///
    /// Returns `TemplateServiceError::Storage` if repository access fails.
    pub async fn list_templates(
        &self,
        limit: u32,
    ) -> Result<Vec<ProjectTemplate>, TemplateServiceError> {
        Ok(self.templates.list_templates(limit).await?)
    }

    /// # Errors
    ///
    /// Returns `TemplateServiceError::NotFound` if no template has `slug`.
    pub async fn template_by_slug(
        &self,
        slug: &str,
    ) -> Result<ProjectTemplate, TemplateServiceError> {
        self.templates
            .get_template_by_slug(slug)
            .await?
            .ok_or(TemplateServiceError::NotFound("template"))
    }

    /// # Errors
    ///
    /// Returns `TemplateServiceError::NotFound` if no template has `slug`.
    pub async fn template_detail(&self, slug: &str) -> Result<TemplateDetail, TemplateServiceError> {
        let template = self.template_by_slug(slug).await?;
        let steps = self.templates.steps_for_template(template.id()).await?;
        Ok(TemplateDetail { template, steps })
    }

    /// Start `slug` for `user`, recording the user's current display name.
    ///
    /// Starting an already started template returns the existing instance.
    ///
    /// # Errors
    ///
    /// Returns `TemplateServiceError::NotFound` if no template has `slug`.
    pub async fn start(
        &self,
        user: &User,
        slug: &str,
    ) -> Result<StartedProject, TemplateServiceError> {
        let template = self.template_by_slug(slug).await?;
        self.users.upsert_user(user).await?;
        let instance = self
            .instances
            .start_instance(user.id(), template.id(), self.clock.now())
            .await?;
        tracing::info!(
            user_id = %user.id(),
            template_id = %template.id(),
            instance_id = %instance.id(),
            "Template started"
        );
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::model::{Difficulty, UserId};
    use storage::repository::QuizRepository;

    use crate::testing::started;

    #[tokio::test]
    async fn duplicate_slug_is_rejected() {
        let fx = started(0).await;
        let err = fx
            .services
            .templates()
            .create_template(TemplateDraft {
                slug: "todo-api".into(),
                title: "Again".into(),
                description: None,
                difficulty: Difficulty::Intermediate,
                technologies: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TemplateServiceError::DuplicateSlug));
    }

    #[tokio::test]
    async fn detail_lists_steps_in_order() {
        let fx = started(3).await;
        let detail = fx.services.templates().template_detail("todo-api").await.unwrap();
        assert_eq!(detail.template.id(), fx.template.id());
        let titles: Vec<&str> = detail.steps.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Step 1", "Step 2", "Step 3"]);

        let err = fx
            .services
            .templates()
            .template_detail("missing")
            .await
            .unwrap_err();
        assert!(matches!(err, TemplateServiceError::NotFound("template")));
    }

    #[tokio::test]
    async fn start_is_idempotent_and_refreshes_name() {
        let fx = started(1).await;
        let templates = fx.services.templates();
        let first = fx
            .services
            .progress()
            .progress(fx.user.id(), fx.template.id())
            .await
            .unwrap();

        let renamed = User::new(fx.user.id(), "Ada L.").unwrap();
        let again = templates.start(&renamed, "todo-api").await.unwrap();
        assert_eq!(again.id(), first.id());

        let stored = fx.repo.get_user(fx.user.id()).await.unwrap().unwrap();
        assert_eq!(stored.display_name(), "Ada L.");
    }

    #[tokio::test]
    async fn questions_need_an_existing_step() {
        let fx = started(1).await;
        let err = fx
            .services
            .templates()
            .add_question(QuestionDraft {
                step_id: StepId::new(777),
                prompt: "Orphan?".into(),
                options: vec!["a".into(), "b".into()],
                correct_index: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TemplateServiceError::NotFound("step")));
    }

    #[tokio::test]
    async fn removing_step_drops_questions() {
        let fx = started(2).await;
        let templates = fx.services.templates();
        templates.remove_step(fx.steps[0].id).await.unwrap();

        assert!(
            fx.repo
                .questions_for_step(fx.steps[0].id)
                .await
                .unwrap()
                .is_empty()
        );
        let err = templates.remove_step(fx.steps[0].id).await.unwrap_err();
        assert!(matches!(err, TemplateServiceError::NotFound("step")));

        let unknown = User::new(UserId::new(3), "Grace").unwrap();
        let err = templates.start(&unknown, "nope").await.unwrap_err();
        assert!(matches!(err, TemplateServiceError::NotFound("template")));
    }
}
