use std::sync::Arc;

use folio_core::Clock;
use folio_core::model::{NewQuizAttempt, QuizAttempt, StartedProject, StepId, UserId};
use folio_core::progress::Aggregation;
use folio_core::scoring::score_answers;
use storage::repository::{InstanceRepository, QuizRepository, TemplateRepository};

use crate::error::{ProgressServiceError, QuizServiceError};
use crate::progress_service::ProgressService;

/// A stored attempt and the instance state after it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOutcome {
    pub attempt: QuizAttempt,
    pub instance: StartedProject,
    /// Present only when the attempt passed and aggregation ran.
    pub aggregation: Option<Aggregation>,
}

/// Records quiz attempts and forwards passing ones to progress aggregation.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    templates: Arc<dyn TemplateRepository>,
    quizzes: Arc<dyn QuizRepository>,
    instances: Arc<dyn InstanceRepository>,
    progress: Arc<ProgressService>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        templates: Arc<dyn TemplateRepository>,
        quizzes: Arc<dyn QuizRepository>,
        instances: Arc<dyn InstanceRepository>,
        progress: Arc<ProgressService>,
    ) -> Self {
        Self {
            clock,
            templates,
            quizzes,
            instances,
            progress,
        }
    }

    /// Score `answers` against the step's stored questions and record the
    /// attempt.
    ///
    /// `reported_score` is whatever the client claimed; it is only compared
    /// against the derived score and logged when they differ.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` for an unknown step or when the
    /// user has not started the step's template, and
    /// `QuizServiceError::Scoring` for malformed answer sets. Nothing is
    /// written in either case.
    pub async fn submit(
        &self,
        user: UserId,
        step_id: StepId,
        answers: Vec<u32>,
        reported_score: Option<u32>,
    ) -> Result<QuizOutcome, QuizServiceError> {
        let step = self
            .templates
            .get_step(step_id)
            .await?
            .ok_or(QuizServiceError::NotFound("step"))?;
        let instance = self
            .instances
            .get_instance(user, step.template_id)
            .await?
            .ok_or(QuizServiceError::NotFound("instance"))?;

        let questions = self.quizzes.questions_for_step(step_id).await?;
        let score = score_answers(&questions, &answers)?;

        if let Some(reported) = reported_score {
            if reported != u32::from(score.value()) {
                tracing::warn!(
                    user_id = %user,
                    step_id = %step_id,
                    reported,
                    derived = score.value(),
                    "Client-reported score ignored"
                );
            }
        }

        let attempt = self
            .quizzes
            .append_attempt(NewQuizAttempt::new(
                user,
                step_id,
                answers,
                score,
                self.clock.now(),
            ))
            .await?;
        tracing::info!(
            user_id = %user,
            step_id = %step_id,
            score = score.value(),
            passed = attempt.passed(),
            "Quiz attempt recorded"
        );

        if !attempt.passed() {
            return Ok(QuizOutcome {
                attempt,
                instance,
                aggregation: None,
            });
        }

        let update = match self
            .progress
            .record_passed_step(user, step.template_id, step_id)
            .await
        {
            Ok(update) => update,
            // The attempt is already stored; one more sweep picks it up from
            // the attempt log before the caller sees a failure.
            Err(ProgressServiceError::Contention { attempts }) => {
                tracing::warn!(
                    user_id = %user,
                    step_id = %step_id,
                    attempts,
                    "Progress update contended; reconciling"
                );
                self.progress.reconcile(user, step.template_id).await?
            }
            Err(err) => return Err(err.into()),
        };
        Ok(QuizOutcome {
            attempt,
            instance: update.instance,
            aggregation: Some(update.aggregation),
        })
    }
}
