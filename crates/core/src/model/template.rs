use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{StepId, TemplateId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateError {
    #[error("template slug cannot be empty")]
    EmptySlug,

    #[error("template slug may only contain lowercase letters, digits and '-': {0}")]
    InvalidSlug(String),

    #[error("template title cannot be empty")]
    EmptyTitle,

    #[error("unknown difficulty: {0}")]
    InvalidDifficulty(String),

    #[error("step title cannot be empty")]
    EmptyStepTitle,
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    /// Parses the lowercase storage form.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::InvalidDifficulty` for any other value.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        match raw {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(TemplateError::InvalidDifficulty(other.to_owned())),
        }
    }
}

//
// ─── TEMPLATE ──────────────────────────────────────────────────────────────────
//

/// Unvalidated input for a new project template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDraft {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub technologies: Vec<String>,
}

impl TemplateDraft {
    /// Validate the draft and stamp its creation time.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError` if the slug or title is unusable.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedTemplate, TemplateError> {
        let slug = validate_slug(&self.slug)?;
        let title = self.title.trim();
        if title.is_empty() {
            return Err(TemplateError::EmptyTitle);
        }

        let description = self
            .description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        let mut technologies: Vec<String> = Vec::with_capacity(self.technologies.len());
        for tech in self.technologies {
            let tech = tech.trim();
            if !tech.is_empty() && !technologies.iter().any(|t| t == tech) {
                technologies.push(tech.to_owned());
            }
        }

        Ok(ValidatedTemplate {
            slug,
            title: title.to_owned(),
            description,
            difficulty: self.difficulty,
            technologies,
            created_at: now,
        })
    }
}

fn validate_slug(raw: &str) -> Result<String, TemplateError> {
    let slug = raw.trim();
    if slug.is_empty() {
        return Err(TemplateError::EmptySlug);
    }
    let valid = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid || slug.starts_with('-') || slug.ends_with('-') {
        return Err(TemplateError::InvalidSlug(slug.to_owned()));
    }
    Ok(slug.to_owned())
}

/// A validated template awaiting an id from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTemplate {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub technologies: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ValidatedTemplate {
    #[must_use]
    pub fn assign_id(self, id: TemplateId) -> ProjectTemplate {
        ProjectTemplate {
            id,
            slug: self.slug,
            title: self.title,
            description: self.description,
            difficulty: self.difficulty,
            technologies: self.technologies,
            created_at: self.created_at,
        }
    }
}

/// A reusable guided project definition. Steps are stored separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTemplate {
    id: TemplateId,
    slug: String,
    title: String,
    description: Option<String>,
    difficulty: Difficulty,
    technologies: Vec<String>,
    created_at: DateTime<Utc>,
}

impl ProjectTemplate {
    /// Rehydrate a template from storage.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError` if the persisted slug or title is invalid.
    pub fn from_persisted(
        id: TemplateId,
        slug: String,
        title: String,
        description: Option<String>,
        difficulty: Difficulty,
        technologies: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TemplateError> {
        let validated = TemplateDraft {
            slug,
            title,
            description,
            difficulty,
            technologies,
        }
        .validate(created_at)?;
        Ok(validated.assign_id(id))
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> TemplateId {
        self.id
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn technologies(&self) -> &[String] {
        &self.technologies
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── STEP ──────────────────────────────────────────────────────────────────────
//

/// Unvalidated input for a new step. Storage assigns the id and position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDraft {
    pub template_id: TemplateId,
    pub title: String,
    pub body: String,
}

impl StepDraft {
    /// # Errors
    ///
    /// Returns `TemplateError::EmptyStepTitle` if the title is blank.
    pub fn validate(self) -> Result<StepDraft, TemplateError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(TemplateError::EmptyStepTitle);
        }
        Ok(StepDraft {
            template_id: self.template_id,
            title: title.to_owned(),
            body: self.body.trim().to_owned(),
        })
    }
}

/// An ordered unit of a template, gated by a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub id: StepId,
    pub template_id: TemplateId,
    pub position: u32,
    pub title: String,
    pub body: String,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn draft(slug: &str, title: &str) -> TemplateDraft {
        TemplateDraft {
            slug: slug.to_owned(),
            title: title.to_owned(),
            description: Some("  ".to_owned()),
            difficulty: Difficulty::Beginner,
            technologies: vec!["rust".into(), " rust ".into(), "sqlite".into(), String::new()],
        }
    }

    #[test]
    fn validate_normalizes_fields() {
        let tpl = draft(" todo-cli ", " Todo CLI ")
            .validate(fixed_now())
            .unwrap()
            .assign_id(TemplateId::new(7));

        assert_eq!(tpl.id(), TemplateId::new(7));
        assert_eq!(tpl.slug(), "todo-cli");
        assert_eq!(tpl.title(), "Todo CLI");
        assert_eq!(tpl.description(), None);
        assert_eq!(tpl.technologies(), ["rust", "sqlite"]);
    }

    #[test]
    fn rejects_bad_slugs() {
        assert_eq!(
            draft("", "T").validate(fixed_now()).unwrap_err(),
            TemplateError::EmptySlug
        );
        assert!(matches!(
            draft("Todo App", "T").validate(fixed_now()).unwrap_err(),
            TemplateError::InvalidSlug(_)
        ));
        assert!(matches!(
            draft("-todo", "T").validate(fixed_now()).unwrap_err(),
            TemplateError::InvalidSlug(_)
        ));
    }

    #[test]
    fn rejects_blank_title() {
        assert_eq!(
            draft("todo", "   ").validate(fixed_now()).unwrap_err(),
            TemplateError::EmptyTitle
        );
    }

    #[test]
    fn difficulty_round_trips_through_storage_form() {
        for d in [
            Difficulty::Beginner,
            Difficulty::Intermediate,
            Difficulty::Advanced,
        ] {
            assert_eq!(Difficulty::parse(d.as_str()).unwrap(), d);
        }
        assert!(Difficulty::parse("expert").is_err());
    }

    #[test]
    fn step_draft_requires_title() {
        let err = StepDraft {
            template_id: TemplateId::new(1),
            title: " ".into(),
            body: String::new(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, TemplateError::EmptyStepTitle);
    }
}
