use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::model::ids::{InstanceId, SubmissionId, TemplateId, UserId};

/// Longest description accepted for a showcase entry, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 2_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ShowcaseError {
    #[error("repository url is required")]
    MissingRepoUrl,

    #[error("invalid {field} url: {raw}")]
    InvalidUrl { field: &'static str, raw: String },

    #[error("description is longer than 2000 characters")]
    DescriptionTooLong,
}

fn parse_web_url(field: &'static str, raw: &str) -> Result<Url, ShowcaseError> {
    let invalid = || ShowcaseError::InvalidUrl {
        field,
        raw: raw.to_owned(),
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(url),
        _ => Err(invalid()),
    }
}

/// Finished work a learner wants to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowcaseDraft {
    pub repo_url: String,
    pub demo_url: Option<String>,
    pub description: String,
}

impl ShowcaseDraft {
    /// Validate URLs and description and bind the entry to its instance.
    ///
    /// # Errors
    ///
    /// Returns `ShowcaseError` for missing or non-http(s) URLs and overlong
    /// descriptions.
    pub fn validate(
        self,
        instance_id: InstanceId,
        user_id: UserId,
        template_id: TemplateId,
        now: DateTime<Utc>,
    ) -> Result<ValidatedSubmission, ShowcaseError> {
        if self.repo_url.trim().is_empty() {
            return Err(ShowcaseError::MissingRepoUrl);
        }
        let repo_url = parse_web_url("repository", &self.repo_url)?;
        let demo_url = self
            .demo_url
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| parse_web_url("demo", d))
            .transpose()?;

        let description = self.description.trim().to_owned();
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(ShowcaseError::DescriptionTooLong);
        }

        Ok(ValidatedSubmission {
            instance_id,
            user_id,
            template_id,
            repo_url,
            demo_url,
            description,
            submitted_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    pub instance_id: InstanceId,
    pub user_id: UserId,
    pub template_id: TemplateId,
    pub repo_url: Url,
    pub demo_url: Option<Url>,
    pub description: String,
    pub submitted_at: DateTime<Utc>,
}

impl ValidatedSubmission {
    #[must_use]
    pub fn assign_id(self, id: SubmissionId) -> ShowcaseSubmission {
        ShowcaseSubmission {
            id,
            instance_id: self.instance_id,
            user_id: self.user_id,
            template_id: self.template_id,
            repo_url: self.repo_url,
            demo_url: self.demo_url,
            description: self.description,
            submitted_at: self.submitted_at,
        }
    }
}

/// A published showcase entry; one per started instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowcaseSubmission {
    pub id: SubmissionId,
    pub instance_id: InstanceId,
    pub user_id: UserId,
    pub template_id: TemplateId,
    pub repo_url: Url,
    pub demo_url: Option<Url>,
    pub description: String,
    pub submitted_at: DateTime<Utc>,
}
