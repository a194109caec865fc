use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{InstanceId, StepId, TemplateId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InstanceError {
    #[error("progress must be between 0 and 100, got {0}")]
    InvalidProgress(i64),

    #[error("certificate issued without eligibility")]
    IssuedWithoutEligibility,
}

/// Where an instance sits in the progress dimension.
///
/// `Completed` is terminal: it follows certificate eligibility, which is never
/// revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressState::NotStarted => "not_started",
            ProgressState::InProgress => "in_progress",
            ProgressState::Completed => "completed",
        }
    }
}

/// One user's run through one project template.
///
/// Rows loaded from storage may carry duplicate or stale step ids and a
/// progress value that disagrees with them; the aggregator in
/// [`crate::progress`] normalizes all of that on the next write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedProject {
    id: InstanceId,
    user_id: UserId,
    template_id: TemplateId,
    completed_steps: Vec<StepId>,
    progress: u8,
    certificate_eligible: bool,
    certificate_issued_at: Option<DateTime<Utc>>,
    in_progress_since: Option<DateTime<Utc>>,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl StartedProject {
    /// A freshly started instance with nothing completed.
    #[must_use]
    pub fn start(
        id: InstanceId,
        user_id: UserId,
        template_id: TemplateId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            template_id,
            completed_steps: Vec::new(),
            progress: 0,
            certificate_eligible: false,
            certificate_issued_at: None,
            in_progress_since: None,
            started_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Rehydrate an instance from storage, keeping the completed list as-is.
    ///
    /// # Errors
    ///
    /// Returns `InstanceError` if progress is outside `0..=100` or an issuance
    /// timestamp exists without eligibility.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: InstanceId,
        user_id: UserId,
        template_id: TemplateId,
        completed_steps: Vec<StepId>,
        progress: i64,
        certificate_eligible: bool,
        certificate_issued_at: Option<DateTime<Utc>>,
        in_progress_since: Option<DateTime<Utc>>,
        started_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        version: u64,
    ) -> Result<Self, InstanceError> {
        let progress = u8::try_from(progress)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or(InstanceError::InvalidProgress(progress))?;
        if certificate_issued_at.is_some() && !certificate_eligible {
            return Err(InstanceError::IssuedWithoutEligibility);
        }

        Ok(Self {
            id,
            user_id,
            template_id,
            completed_steps,
            progress,
            certificate_eligible,
            certificate_issued_at,
            in_progress_since,
            started_at,
            updated_at,
            version,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn template_id(&self) -> TemplateId {
        self.template_id
    }

    /// Completed step ids in completion order.
    #[must_use]
    pub fn completed_steps(&self) -> &[StepId] {
        &self.completed_steps
    }

    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress
    }

    #[must_use]
    pub fn certificate_eligible(&self) -> bool {
        self.certificate_eligible
    }

    #[must_use]
    pub fn certificate_issued_at(&self) -> Option<DateTime<Utc>> {
        self.certificate_issued_at
    }

    /// When the first step was completed. Survives pruning.
    #[must_use]
    pub fn in_progress_since(&self) -> Option<DateTime<Utc>> {
        self.in_progress_since
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Optimistic-concurrency token; bumped by storage on every successful update.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn state(&self) -> ProgressState {
        if self.certificate_eligible {
            ProgressState::Completed
        } else if self.in_progress_since.is_some() || !self.completed_steps.is_empty() {
            ProgressState::InProgress
        } else {
            ProgressState::NotStarted
        }
    }

    pub(crate) fn replace_completed(
        &mut self,
        steps: Vec<StepId>,
        progress: u8,
        now: DateTime<Utc>,
    ) {
        self.completed_steps = steps;
        self.progress = progress.min(100);
        if self.in_progress_since.is_none() && !self.completed_steps.is_empty() {
            self.in_progress_since = Some(now);
        }
    }

    pub(crate) fn mark_eligible(&mut self, issued_at: DateTime<Utc>) {
        self.certificate_eligible = true;
        self.certificate_issued_at = Some(issued_at);
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Record the version storage assigned after a successful write.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
