use thiserror::Error;

use crate::model::{InstanceError, QuizError, ShowcaseError, TemplateError, UserError};
use crate::scoring::ScoringError;

/// Any validation failure raised by the domain layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Instance(#[from] InstanceError),
    #[error(transparent)]
    Showcase(#[from] ShowcaseError),
    #[error(transparent)]
    User(#[from] UserError),
}
