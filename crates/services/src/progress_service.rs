use std::sync::Arc;
use std::time::Duration;

use folio_core::Clock;
use folio_core::model::{StartedProject, StepId, TemplateId, UserId};
use folio_core::progress::{self, Aggregation};
use storage::repository::{InstanceRepository, QuizRepository, StorageError, TemplateRepository};

use rand::Rng;

use crate::error::ProgressServiceError;

/// Read-modify-write attempts per instance before giving up.
pub const MAX_ATTEMPTS: u32 = 5;

/// Delay before the first retry; doubles on each further conflict.
const RETRY_BASE_MS: u64 = 10;

/// Backoff after the `attempt`-th conflict, with up to the same again in jitter.
fn retry_delay(attempt: u32) -> Duration {
    let base = RETRY_BASE_MS << attempt.saturating_sub(1).min(6);
    let jitter = rand::rng().random_range(0..=base);
    Duration::from_millis(base + jitter)
}

/// An instance as written, plus what the aggregation pass changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub instance: StartedProject,
    pub aggregation: Aggregation,
}

/// Totals from a `reconcile_all` sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub instances: usize,
    pub rewritten: usize,
    pub pruned: usize,
    pub backfilled: usize,
    pub certificates_issued: usize,
}

/// Applies progress aggregation to stored instances under optimistic
/// concurrency.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    templates: Arc<dyn TemplateRepository>,
    quizzes: Arc<dyn QuizRepository>,
    instances: Arc<dyn InstanceRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        templates: Arc<dyn TemplateRepository>,
        quizzes: Arc<dyn QuizRepository>,
        instances: Arc<dyn InstanceRepository>,
    ) -> Self {
        Self {
            clock,
            templates,
            quizzes,
            instances,
        }
    }

    /// Current stored state of the user's instance.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotFound` if the user never started the
    /// template.
    pub async fn progress(
        &self,
        user: UserId,
        template: TemplateId,
    ) -> Result<StartedProject, ProgressServiceError> {
        self.instances
            .get_instance(user, template)
            .await?
            .ok_or(ProgressServiceError::NotFound("instance"))
    }

    /// Add `step` to the instance's completed set after a passing attempt.
    ///
    /// Other steps with a passing attempt on record ride along, so a write
    /// that won a race also carries the passes of the writers it beat.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotFound` for a missing instance and
    /// `ProgressServiceError::Contention` when every retry conflicts.
    pub async fn record_passed_step(
        &self,
        user: UserId,
        template: TemplateId,
        step: StepId,
    ) -> Result<ProgressUpdate, ProgressServiceError> {
        let backlog: Vec<StepId> = self
            .quizzes
            .passed_steps(user, template)
            .await?
            .into_iter()
            .filter(|s| *s != step)
            .collect();
        self.apply(user, template, |instance, template_steps, now| {
            if backlog.is_empty() {
                progress::record_passed_step(instance, step, template_steps, now)
            } else {
                let mut passed = Vec::with_capacity(backlog.len() + 1);
                passed.push(step);
                passed.extend_from_slice(&backlog);
                progress::reconcile(instance, &passed, template_steps, now)
            }
        })
        .await
    }

    /// Re-run aggregation for one instance, back-filling steps that have a
    /// passing attempt on record.
    ///
    /// # Errors
    ///
    /// Same as [`Self::record_passed_step`].
    pub async fn reconcile(
        &self,
        user: UserId,
        template: TemplateId,
    ) -> Result<ProgressUpdate, ProgressServiceError> {
        let passed = self.quizzes.passed_steps(user, template).await?;
        self.apply(user, template, |instance, template_steps, now| {
            progress::reconcile(instance, &passed, template_steps, now)
        })
        .await
    }

    /// Reconcile every stored instance.
    ///
    /// An instance that keeps conflicting is logged and skipped; storage
    /// failures abort the sweep.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` on repository failures.
    pub async fn reconcile_all(&self) -> Result<ReconcileReport, ProgressServiceError> {
        let keys = self.instances.instance_keys().await?;
        let mut report = ReconcileReport::default();

        for (user, template) in keys {
            report.instances += 1;
            let update = match self.reconcile(user, template).await {
                Ok(update) => update,
                Err(ProgressServiceError::Contention { attempts }) => {
                    tracing::warn!(
                        user_id = %user,
                        template_id = %template,
                        attempts,
                        "Skipping instance under contention"
                    );
                    continue;
                }
                // Deleted between listing and loading.
                Err(ProgressServiceError::NotFound(_)) => continue,
                Err(err) => return Err(err),
            };

            let agg = &update.aggregation;
            if agg.changed() {
                report.rewritten += 1;
            }
            report.pruned += agg.pruned.len();
            report.backfilled += agg.added.len();
            if agg.certificate.is_newly_issued() {
                report.certificates_issued += 1;
            }
        }

        tracing::info!(
            instances = report.instances,
            rewritten = report.rewritten,
            pruned = report.pruned,
            backfilled = report.backfilled,
            certificates_issued = report.certificates_issued,
            "Reconciliation finished"
        );
        Ok(report)
    }

    async fn apply<F>(
        &self,
        user: UserId,
        template: TemplateId,
        aggregate: F,
    ) -> Result<ProgressUpdate, ProgressServiceError>
    where
        F: Fn(&mut StartedProject, &[StepId], chrono::DateTime<chrono::Utc>) -> Aggregation
            + Send
            + Sync,
    {
        for attempt in 1..=MAX_ATTEMPTS {
            let mut instance = self
                .instances
                .get_instance(user, template)
                .await?
                .ok_or(ProgressServiceError::NotFound("instance"))?;
            let template_steps: Vec<StepId> = self
                .templates
                .steps_for_template(template)
                .await?
                .into_iter()
                .map(|s| s.id)
                .collect();

            let aggregation = aggregate(&mut instance, &template_steps, self.clock.now());
            if !aggregation.pruned.is_empty() {
                tracing::debug!(
                    user_id = %user,
                    template_id = %template,
                    pruned = ?aggregation.pruned,
                    "Pruned stale step ids"
                );
            }
            if !aggregation.changed() {
                return Ok(ProgressUpdate {
                    instance,
                    aggregation,
                });
            }

            match self.instances.update_instance(&instance).await {
                Ok(version) => {
                    instance.set_version(version);
                    tracing::info!(
                        user_id = %user,
                        template_id = %template,
                        progress = aggregation.progress,
                        "Progress updated"
                    );
                    if aggregation.certificate.is_newly_issued() {
                        tracing::info!(
                            user_id = %user,
                            template_id = %template,
                            "Certificate issued"
                        );
                    }
                    return Ok(ProgressUpdate {
                        instance,
                        aggregation,
                    });
                }
                Err(StorageError::Conflict) => {
                    tracing::debug!(
                        user_id = %user,
                        template_id = %template,
                        attempt,
                        "Instance version moved; retrying"
                    );
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(retry_delay(attempt)).await;
                    }
                }
                Err(StorageError::NotFound) => {
                    return Err(ProgressServiceError::NotFound("instance"));
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ProgressServiceError::Contention {
            attempts: MAX_ATTEMPTS,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
