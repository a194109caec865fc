mod ids;
mod instance;
mod quiz;
mod showcase;
mod template;
mod user;

pub use ids::{
    AttemptId, InstanceId, ParseIdError, QuestionId, StepId, SubmissionId, TemplateId, UserId,
};

pub use instance::{InstanceError, ProgressState, StartedProject};
pub use quiz::{NewQuizAttempt, QuestionDraft, QuizAttempt, QuizError, QuizQuestion};
pub use showcase::{
    MAX_DESCRIPTION_CHARS, ShowcaseDraft, ShowcaseError, ShowcaseSubmission, ValidatedSubmission,
};
pub use template::{
    Difficulty, ProjectTemplate, Step, StepDraft, TemplateDraft, TemplateError, ValidatedTemplate,
};
pub use user::{User, UserError};
