use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{AttemptId, QuestionId, StepId, UserId};
use crate::scoring::Score;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("a question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("option {0} is empty")]
    EmptyOption(usize),

    #[error("correct option {index} is out of range for {options} options")]
    CorrectIndexOutOfRange { index: u32, options: usize },
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

/// Unvalidated input for a quiz question attached to a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub step_id: StepId,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: u32,
}

impl QuestionDraft {
    /// # Errors
    ///
    /// Returns `QuizError` when the prompt or options are unusable or the
    /// correct index does not point at an option.
    pub fn validate(self) -> Result<QuestionDraft, QuizError> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(QuizError::EmptyPrompt);
        }
        if self.options.len() < 2 {
            return Err(QuizError::TooFewOptions(self.options.len()));
        }
        let mut options = Vec::with_capacity(self.options.len());
        for (i, option) in self.options.iter().enumerate() {
            let option = option.trim();
            if option.is_empty() {
                return Err(QuizError::EmptyOption(i));
            }
            options.push(option.to_owned());
        }
        if self.correct_index as usize >= options.len() {
            return Err(QuizError::CorrectIndexOutOfRange {
                index: self.correct_index,
                options: options.len(),
            });
        }

        Ok(QuestionDraft {
            step_id: self.step_id,
            prompt: prompt.to_owned(),
            options,
            correct_index: self.correct_index,
        })
    }
}

/// A multiple-choice question. Position orders questions within a step and
/// determines which answer slot is compared against `correct_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub id: QuestionId,
    pub step_id: StepId,
    pub position: u32,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: u32,
}

impl QuizQuestion {
    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn is_correct(&self, answer: u32) -> bool {
        answer == self.correct_index
    }
}

//
// ─── ATTEMPTS ──────────────────────────────────────────────────────────────────
//

/// A scored attempt not yet persisted.
///
/// Only constructible from a `Score`, so `passed` always agrees with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuizAttempt {
    user_id: UserId,
    step_id: StepId,
    answers: Vec<u32>,
    score: Score,
    attempted_at: DateTime<Utc>,
}

impl NewQuizAttempt {
    #[must_use]
    pub fn new(
        user_id: UserId,
        step_id: StepId,
        answers: Vec<u32>,
        score: Score,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            step_id,
            answers,
            score,
            attempted_at,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn step_id(&self) -> StepId {
        self.step_id
    }

    #[must_use]
    pub fn answers(&self) -> &[u32] {
        &self.answers
    }

    #[must_use]
    pub fn score(&self) -> Score {
        self.score
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.score.is_passing()
    }

    #[must_use]
    pub fn attempted_at(&self) -> DateTime<Utc> {
        self.attempted_at
    }

    #[must_use]
    pub fn assign_id(self, id: AttemptId) -> QuizAttempt {
        QuizAttempt {
            id,
            attempt: self,
        }
    }
}

/// A persisted quiz attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttempt {
    id: AttemptId,
    attempt: NewQuizAttempt,
}

impl QuizAttempt {
    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.attempt.user_id
    }

    #[must_use]
    pub fn step_id(&self) -> StepId {
        self.attempt.step_id
    }

    #[must_use]
    pub fn answers(&self) -> &[u32] {
        &self.attempt.answers
    }

    #[must_use]
    pub fn score(&self) -> Score {
        self.attempt.score
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.attempt.passed()
    }

    #[must_use]
    pub fn attempted_at(&self) -> DateTime<Utc> {
        self.attempt.attempted_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn draft(options: &[&str], correct_index: u32) -> QuestionDraft {
        QuestionDraft {
            step_id: StepId::new(1),
            prompt: " Which keyword declares a binding? ".into(),
            options: options.iter().map(|o| (*o).to_owned()).collect(),
            correct_index,
        }
    }

    #[test]
    fn valid_question_is_trimmed() {
        let q = draft(&["let ", " var"], 0).validate().unwrap();
        assert_eq!(q.prompt, "Which keyword declares a binding?");
        assert_eq!(q.options, vec!["let", "var"]);
    }

    #[test]
    fn question_needs_two_options() {
        assert_eq!(
            draft(&["let"], 0).validate().unwrap_err(),
            QuizError::TooFewOptions(1)
        );
    }

    #[test]
    fn correct_index_must_point_at_option() {
        assert_eq!(
            draft(&["a", "b"], 2).validate().unwrap_err(),
            QuizError::CorrectIndexOutOfRange {
                index: 2,
                options: 2
            }
        );
    }

    #[test]
    fn blank_option_is_rejected() {
        assert_eq!(
            draft(&["a", "  "], 0).validate().unwrap_err(),
            QuizError::EmptyOption(1)
        );
    }

    #[test]
    fn attempt_passed_follows_score() {
        let low = NewQuizAttempt::new(
            UserId::new(1),
            StepId::new(1),
            vec![1],
            Score::new(5).unwrap(),
            fixed_now(),
        );
        assert!(!low.passed());

        let high = NewQuizAttempt::new(
            UserId::new(1),
            StepId::new(1),
            vec![0],
            Score::new(80).unwrap(),
            fixed_now(),
        )
        .assign_id(AttemptId::new(9));
        assert!(high.passed());
        assert_eq!(high.id(), AttemptId::new(9));
    }
}
