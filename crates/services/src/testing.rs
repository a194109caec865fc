//! Fixtures shared by the service unit tests.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use folio_core::Clock;
use folio_core::model::{
    Difficulty, ProjectTemplate, QuestionDraft, StartedProject, Step, StepId, TemplateDraft,
    TemplateId, User, UserId,
};
use folio_core::time::fixed_now;
use storage::repository::{InMemoryRepository, InstanceRepository, Storage, StorageError};

use crate::app_services::AppServices;

pub(crate) struct Fixture {
    pub repo: InMemoryRepository,
    pub services: AppServices,
    pub template: ProjectTemplate,
    pub steps: Vec<Step>,
    pub user: User,
}

impl Fixture {
    pub fn step_ids(&self) -> Vec<StepId> {
        self.steps.iter().map(|s| s.id).collect()
    }
}

/// A started template with `step_count` steps, each with two questions whose
/// correct answer is option 0.
pub(crate) async fn started(step_count: usize) -> Fixture {
    let repo = InMemoryRepository::new();
    let storage = Storage::from_memory(repo.clone());
    let services = AppServices::from_storage(&storage, Clock::fixed(fixed_now()));
    let templates = services.templates();

    let template = templates
        .create_template(TemplateDraft {
            slug: "todo-api".into(),
            title: "Todo API".into(),
            description: None,
            difficulty: Difficulty::Beginner,
            technologies: vec!["rust".into()],
        })
        .await
        .unwrap();

    let mut steps = Vec::with_capacity(step_count);
    for i in 0..step_count {
        let step = templates
            .append_step(template.id(), format!("Step {}", i + 1), "")
            .await
            .unwrap();
        for n in 0..2 {
            templates
                .add_question(QuestionDraft {
                    step_id: step.id,
                    prompt: format!("Question {n}"),
                    options: vec!["right".into(), "wrong".into()],
                    correct_index: 0,
                })
                .await
                .unwrap();
        }
        steps.push(step);
    }

    let user = User::new(UserId::new(7), "Ada").unwrap();
    templates.start(&user, "todo-api").await.unwrap();

    Fixture {
        repo,
        services,
        template,
        steps,
        user,
    }
}

/// Store `completed` and `progress` without running aggregation, the way an
/// out-of-band edit would leave the row.
pub(crate) async fn overwrite_completed(fx: &Fixture, completed: Vec<StepId>, progress: i64) {
    let current = fx
        .repo
        .get_instance(fx.user.id(), fx.template.id())
        .await
        .unwrap()
        .unwrap();
    let damaged = StartedProject::from_persisted(
        current.id(),
        current.user_id(),
        current.template_id(),
        completed,
        progress,
        current.certificate_eligible(),
        current.certificate_issued_at(),
        current.in_progress_since(),
        current.started_at(),
        current.updated_at(),
        current.version(),
    )
    .unwrap();
    fx.repo.update_instance(&damaged).await.unwrap();
}

/// Instance repository whose next `conflicts` updates lose the race.
pub(crate) struct Contended {
    inner: InMemoryRepository,
    conflicts: AtomicU32,
}

impl Contended {
    pub fn new(repo: &InMemoryRepository, conflicts: u32) -> Self {
        Self {
            inner: repo.clone(),
            conflicts: AtomicU32::new(conflicts),
        }
    }
}

#[async_trait::async_trait]
impl InstanceRepository for Contended {
    async fn start_instance(
        &self,
        user: UserId,
        template: TemplateId,
        now: DateTime<Utc>,
    ) -> Result<StartedProject, StorageError> {
        self.inner.start_instance(user, template, now).await
    }

    async fn get_instance(
        &self,
        user: UserId,
        template: TemplateId,
    ) -> Result<Option<StartedProject>, StorageError> {
        self.inner.get_instance(user, template).await
    }

    async fn instance_keys(&self) -> Result<Vec<(UserId, TemplateId)>, StorageError> {
        self.inner.instance_keys().await
    }

    async fn update_instance(&self, instance: &StartedProject) -> Result<u64, StorageError> {
        let left = self.conflicts.load(Ordering::SeqCst);
        if left > 0 {
            self.conflicts.store(left - 1, Ordering::SeqCst);
            return Err(StorageError::Conflict);
        }
        self.inner.update_instance(instance).await
    }
}
