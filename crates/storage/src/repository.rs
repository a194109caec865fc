use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_core::model::{
    AttemptId, InstanceId, NewQuizAttempt, ProjectTemplate, QuestionDraft, QuestionId,
    QuizAttempt, QuizQuestion, ShowcaseSubmission, StartedProject, Step, StepDraft, StepId,
    SubmissionId, TemplateId, User, UserId, ValidatedSubmission, ValidatedTemplate,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// A uniqueness rule or an optimistic version check failed.
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert the user or refresh their display name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the user cannot be stored.
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;
}

/// Templates and their ordered steps.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Persist a validated template and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the slug is taken.
    async fn insert_template(
        &self,
        template: ValidatedTemplate,
    ) -> Result<ProjectTemplate, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_template(&self, id: TemplateId) -> Result<Option<ProjectTemplate>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_template_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProjectTemplate>, StorageError>;

    /// Templates ordered by id, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_templates(&self, limit: u32) -> Result<Vec<ProjectTemplate>, StorageError>;

    /// Append a step after the template's current last step.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the template does not exist.
    async fn append_step(&self, draft: StepDraft) -> Result<Step, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_step(&self, id: StepId) -> Result<Option<Step>, StorageError>;

    /// Steps of a template ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn steps_for_template(&self, id: TemplateId) -> Result<Vec<Step>, StorageError>;

    /// Remove a step together with its questions and attempts. Completed-step
    /// lists that reference it are left alone; aggregation prunes them.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the step does not exist.
    async fn delete_step(&self, id: StepId) -> Result<(), StorageError>;
}

/// Quiz questions and recorded attempts.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Append a question after the step's current last question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the step does not exist.
    async fn add_question(&self, draft: QuestionDraft) -> Result<QuizQuestion, StorageError>;

    /// Questions of a step ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn questions_for_step(&self, step: StepId) -> Result<Vec<QuizQuestion>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_attempt(&self, attempt: NewQuizAttempt) -> Result<QuizAttempt, StorageError>;

    /// A user's attempts at one step, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn attempts_for_step(
        &self,
        user: UserId,
        step: StepId,
    ) -> Result<Vec<QuizAttempt>, StorageError>;

    /// Distinct steps of `template` on which `user` has a passing attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn passed_steps(
        &self,
        user: UserId,
        template: TemplateId,
    ) -> Result<Vec<StepId>, StorageError>;
}

/// Started project instances with optimistic concurrency.
#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Create the instance for `(user, template)` or return the existing one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user or template is unknown.
    async fn start_instance(
        &self,
        user: UserId,
        template: TemplateId,
        now: DateTime<Utc>,
    ) -> Result<StartedProject, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_instance(
        &self,
        user: UserId,
        template: TemplateId,
    ) -> Result<Option<StartedProject>, StorageError>;

    /// Keys of every stored instance, ordered by instance id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn instance_keys(&self) -> Result<Vec<(UserId, TemplateId)>, StorageError>;

    /// Write the instance if its stored version still equals
    /// `instance.version()`, returning the new version.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when another writer got there first,
    /// `StorageError::NotFound` when the instance is gone.
    async fn update_instance(&self, instance: &StartedProject) -> Result<u64, StorageError>;
}

#[async_trait]
pub trait ShowcaseRepository: Send + Sync {
    /// Store the submission for its instance, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the submission cannot be stored.
    async fn upsert_submission(
        &self,
        submission: ValidatedSubmission,
    ) -> Result<ShowcaseSubmission, StorageError>;

    /// Newest submissions first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_submissions(&self, limit: u32) -> Result<Vec<ShowcaseSubmission>, StorageError>;
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the backend is unreachable.
    async fn ping(&self) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    users: HashMap<UserId, User>,
    templates: Vec<ProjectTemplate>,
    steps: Vec<Step>,
    questions: Vec<QuizQuestion>,
    attempts: Vec<QuizAttempt>,
    instances: Vec<StartedProject>,
    submissions: Vec<ShowcaseSubmission>,
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// In-memory repository for tests and prototyping.
///
/// All tables sit behind one lock so each call is atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.users.insert(user.id(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.users.get(&id).cloned())
    }
}

#[async_trait]
impl TemplateRepository for InMemoryRepository {
    async fn insert_template(
        &self,
        template: ValidatedTemplate,
    ) -> Result<ProjectTemplate, StorageError> {
        let mut guard = self.lock()?;
        if guard.templates.iter().any(|t| t.slug() == template.slug) {
            return Err(StorageError::Conflict);
        }
        let id = TemplateId::new(guard.next_id());
        let template = template.assign_id(id);
        guard.templates.push(template.clone());
        Ok(template)
    }

    async fn get_template(&self, id: TemplateId) -> Result<Option<ProjectTemplate>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.templates.iter().find(|t| t.id() == id).cloned())
    }

    async fn get_template_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProjectTemplate>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.templates.iter().find(|t| t.slug() == slug).cloned())
    }

    async fn list_templates(&self, limit: u32) -> Result<Vec<ProjectTemplate>, StorageError> {
        let guard = self.lock()?;
        let mut out = guard.templates.clone();
        out.sort_by_key(ProjectTemplate::id);
        out.truncate(limit as usize);
        Ok(out)
    }

    async fn append_step(&self, draft: StepDraft) -> Result<Step, StorageError> {
        let mut guard = self.lock()?;
        if !guard.templates.iter().any(|t| t.id() == draft.template_id) {
            return Err(StorageError::NotFound);
        }
        let position = guard
            .steps
            .iter()
            .filter(|s| s.template_id == draft.template_id)
            .map(|s| s.position + 1)
            .max()
            .unwrap_or(1);
        let step = Step {
            id: StepId::new(guard.next_id()),
            template_id: draft.template_id,
            position,
            title: draft.title,
            body: draft.body,
        };
        guard.steps.push(step.clone());
        Ok(step)
    }

    async fn get_step(&self, id: StepId) -> Result<Option<Step>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.step(id).cloned())
    }

    async fn steps_for_template(&self, id: TemplateId) -> Result<Vec<Step>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<Step> = guard
            .steps
            .iter()
            .filter(|s| s.template_id == id)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.position);
        Ok(out)
    }

    async fn delete_step(&self, id: StepId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let before = guard.steps.len();
        guard.steps.retain(|s| s.id != id);
        if guard.steps.len() == before {
            return Err(StorageError::NotFound);
        }
        guard.questions.retain(|q| q.step_id != id);
        guard.attempts.retain(|a| a.step_id() != id);
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn add_question(&self, draft: QuestionDraft) -> Result<QuizQuestion, StorageError> {
        let mut guard = self.lock()?;
        if guard.step(draft.step_id).is_none() {
            return Err(StorageError::NotFound);
        }
        let position = guard
            .questions
            .iter()
            .filter(|q| q.step_id == draft.step_id)
            .map(|q| q.position + 1)
            .max()
            .unwrap_or(0);
        let question = QuizQuestion {
            id: QuestionId::new(guard.next_id()),
            step_id: draft.step_id,
            position,
            prompt: draft.prompt,
            options: draft.options,
            correct_index: draft.correct_index,
        };
        guard.questions.push(question.clone());
        Ok(question)
    }

    async fn questions_for_step(&self, step: StepId) -> Result<Vec<QuizQuestion>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<QuizQuestion> = guard
            .questions
            .iter()
            .filter(|q| q.step_id == step)
            .cloned()
            .collect();
        out.sort_by_key(|q| q.position);
        Ok(out)
    }

    async fn append_attempt(&self, attempt: NewQuizAttempt) -> Result<QuizAttempt, StorageError> {
        let mut guard = self.lock()?;
        if guard.step(attempt.step_id()).is_none() {
            return Err(StorageError::NotFound);
        }
        let attempt = attempt.assign_id(AttemptId::new(guard.next_id()));
        guard.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn attempts_for_step(
        &self,
        user: UserId,
        step: StepId,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .attempts
            .iter()
            .filter(|a| a.user_id() == user && a.step_id() == step)
            .cloned()
            .collect())
    }

    async fn passed_steps(
        &self,
        user: UserId,
        template: TemplateId,
    ) -> Result<Vec<StepId>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<StepId> = Vec::new();
        for attempt in guard.attempts.iter().filter(|a| a.user_id() == user && a.passed()) {
            let in_template = guard
                .step(attempt.step_id())
                .is_some_and(|s| s.template_id == template);
            if in_template && !out.contains(&attempt.step_id()) {
                out.push(attempt.step_id());
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl InstanceRepository for InMemoryRepository {
    async fn start_instance(
        &self,
        user: UserId,
        template: TemplateId,
        now: DateTime<Utc>,
    ) -> Result<StartedProject, StorageError> {
        let mut guard = self.lock()?;
        if let Some(existing) = guard
            .instances
            .iter()
            .find(|i| i.user_id() == user && i.template_id() == template)
        {
            return Ok(existing.clone());
        }
        if !guard.users.contains_key(&user) || !guard.templates.iter().any(|t| t.id() == template)
        {
            return Err(StorageError::NotFound);
        }
        let instance =
            StartedProject::start(InstanceId::new(guard.next_id()), user, template, now);
        guard.instances.push(instance.clone());
        Ok(instance)
    }

    async fn get_instance(
        &self,
        user: UserId,
        template: TemplateId,
    ) -> Result<Option<StartedProject>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .instances
            .iter()
            .find(|i| i.user_id() == user && i.template_id() == template)
            .cloned())
    }

    async fn instance_keys(&self) -> Result<Vec<(UserId, TemplateId)>, StorageError> {
        let guard = self.lock()?;
        let mut instances: Vec<&StartedProject> = guard.instances.iter().collect();
        instances.sort_by_key(|i| i.id());
        Ok(instances
            .into_iter()
            .map(|i| (i.user_id(), i.template_id()))
            .collect())
    }

    async fn update_instance(&self, instance: &StartedProject) -> Result<u64, StorageError> {
        let mut guard = self.lock()?;
        let slot = guard
            .instances
            .iter_mut()
            .find(|i| i.id() == instance.id())
            .ok_or(StorageError::NotFound)?;
        if slot.version() != instance.version() {
            return Err(StorageError::Conflict);
        }
        let version = instance.version() + 1;
        let mut stored = instance.clone();
        stored.set_version(version);
        *slot = stored;
        Ok(version)
    }
}

#[async_trait]
impl ShowcaseRepository for InMemoryRepository {
    async fn upsert_submission(
        &self,
        submission: ValidatedSubmission,
    ) -> Result<ShowcaseSubmission, StorageError> {
        let mut guard = self.lock()?;
        let existing = guard
            .submissions
            .iter()
            .position(|s| s.instance_id == submission.instance_id);
        let stored = match existing {
            Some(idx) => {
                let id = guard.submissions[idx].id;
                let stored = submission.assign_id(id);
                guard.submissions[idx] = stored.clone();
                stored
            }
            None => {
                let stored = submission.assign_id(SubmissionId::new(guard.next_id()));
                guard.submissions.push(stored.clone());
                stored
            }
        };
        Ok(stored)
    }

    async fn list_submissions(&self, limit: u32) -> Result<Vec<ShowcaseSubmission>, StorageError> {
        let guard = self.lock()?;
        let mut out = guard.submissions.clone();
        out.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
        out.truncate(limit as usize);
        Ok(out)
    }
}

#[async_trait]
impl HealthProbe for InMemoryRepository {
    async fn ping(&self) -> Result<(), StorageError> {
        self.lock().map(|_| ())
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub templates: Arc<dyn TemplateRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub instances: Arc<dyn InstanceRepository>,
    pub showcase: Arc<dyn ShowcaseRepository>,
    pub health: Arc<dyn HealthProbe>,
}

impl Storage {
    /// Wrap an existing in-memory repository, keeping a handle for tests.
    #[must_use]
    pub fn from_memory(repo: InMemoryRepository) -> Self {
        Self {
            users: Arc::new(repo.clone()),
            templates: Arc::new(repo.clone()),
            quizzes: Arc::new(repo.clone()),
            instances: Arc::new(repo.clone()),
            showcase: Arc::new(repo.clone()),
            health: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::model::{Difficulty, TemplateDraft};
    use folio_core::progress::record_passed_step;
    use folio_core::time::fixed_now;

    async fn seeded() -> (InMemoryRepository, ProjectTemplate, Vec<Step>) {
        let repo = InMemoryRepository::new();
        repo.upsert_user(&User::new(UserId::new(1), "Ada").unwrap())
            .await
            .unwrap();
        let template = repo
            .insert_template(
                TemplateDraft {
                    slug: "todo".into(),
                    title: "Todo".into(),
                    description: None,
                    difficulty: Difficulty::Beginner,
                    technologies: vec![],
                }
                .validate(fixed_now())
                .unwrap(),
            )
            .await
            .unwrap();
        let mut steps = Vec::new();
        for title in ["Setup", "Model", "Persist"] {
            steps.push(
                repo.append_step(StepDraft {
                    template_id: template.id(),
                    title: title.into(),
                    body: String::new(),
                })
                .await
                .unwrap(),
            );
        }
        (repo, template, steps)
    }

    #[tokio::test]
    async fn steps_are_numbered_in_append_order() {
        let (repo, template, _) = seeded().await;
        let steps = repo.steps_for_template(template.id()).await.unwrap();
        let positions: Vec<u32> = steps.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn duplicate_slug_conflicts() {
        let (repo, _, _) = seeded().await;
        let again = TemplateDraft {
            slug: "todo".into(),
            title: "Other".into(),
            description: None,
            difficulty: Difficulty::Advanced,
            technologies: vec![],
        }
        .validate(fixed_now())
        .unwrap();
        assert!(matches!(
            repo.insert_template(again).await,
            Err(StorageError::Conflict)
        ));
    }

    #[tokio::test]
    async fn start_instance_is_idempotent() {
        let (repo, template, _) = seeded().await;
        let a = repo
            .start_instance(UserId::new(1), template.id(), fixed_now())
            .await
            .unwrap();
        let b = repo
            .start_instance(UserId::new(1), template.id(), fixed_now())
            .await
            .unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(repo.instance_keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let (repo, template, steps) = seeded().await;
        let ids: Vec<StepId> = steps.iter().map(|s| s.id).collect();
        let mut first = repo
            .start_instance(UserId::new(1), template.id(), fixed_now())
            .await
            .unwrap();
        let mut second = first.clone();

        record_passed_step(&mut first, ids[0], &ids, fixed_now());
        assert_eq!(repo.update_instance(&first).await.unwrap(), 1);

        record_passed_step(&mut second, ids[1], &ids, fixed_now());
        assert!(matches!(
            repo.update_instance(&second).await,
            Err(StorageError::Conflict)
        ));

        let stored = repo
            .get_instance(UserId::new(1), template.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.completed_steps(), &[ids[0]]);
        assert_eq!(stored.version(), 1);
    }

    #[tokio::test]
    async fn deleting_step_cascades_questions() {
        let (repo, _, steps) = seeded().await;
        repo.add_question(
            QuestionDraft {
                step_id: steps[0].id,
                prompt: "Q".into(),
                options: vec!["a".into(), "b".into()],
                correct_index: 0,
            }
            .validate()
            .unwrap(),
        )
        .await
        .unwrap();
        repo.delete_step(steps[0].id).await.unwrap();
        assert!(repo.questions_for_step(steps[0].id).await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_step(steps[0].id).await,
            Err(StorageError::NotFound)
        ));
    }
}
