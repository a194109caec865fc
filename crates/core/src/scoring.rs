//! Quiz scoring and the step completion rule.
//!
//! Scores are always derived from stored correct answers; a caller-reported
//! score is never trusted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::QuizQuestion;

/// Minimum score (inclusive) for an attempt to complete its step.
pub const PASSING_SCORE: u8 = 80;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("score must be between 0 and 100, got {0}")]
    OutOfRange(u32),

    #[error("{answers} answers submitted for {questions} questions")]
    TooManyAnswers { answers: usize, questions: usize },

    #[error("answer {answer} to question {position} is out of range for {options} options")]
    AnswerOutOfRange {
        position: usize,
        answer: u32,
        options: usize,
    },
}

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

/// A percentage score in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(u8);

impl Score {
    pub const PERFECT: Score = Score(100);

    /// # Errors
    ///
    /// Returns `ScoringError::OutOfRange` above 100.
    pub fn new(value: u32) -> Result<Self, ScoringError> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(Self)
            .ok_or(ScoringError::OutOfRange(value))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// The step completion rule: `score >= 80`.
    #[must_use]
    pub fn is_passing(self) -> bool {
        is_passing(self.0)
    }
}

/// Returns true when `score` meets the passing threshold.
#[must_use]
pub fn is_passing(score: u8) -> bool {
    score >= PASSING_SCORE
}

/// `round(100 * part / whole)` with halves rounded up, `0` when `whole` is 0.
///
/// Integer arithmetic keeps the result exact (`round(600 / 7) == 86`).
#[must_use]
pub fn rounded_percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole) as u128;
    let whole = whole as u128;
    let pct = (200 * part + whole) / (2 * whole);
    // part <= whole, so pct <= 100.
    u8::try_from(pct).unwrap_or(100)
}

/// Score an ordered answer list against the step's questions.
///
/// Answers are matched by position. Missing trailing answers count as wrong;
/// a step without questions scores 100.
///
/// # Errors
///
/// Returns `ScoringError::TooManyAnswers` when more answers than questions are
/// given, or `ScoringError::AnswerOutOfRange` when an answer names an option
/// the question does not have.
pub fn score_answers(questions: &[QuizQuestion], answers: &[u32]) -> Result<Score, ScoringError> {
    if answers.len() > questions.len() {
        return Err(ScoringError::TooManyAnswers {
            answers: answers.len(),
            questions: questions.len(),
        });
    }
    if questions.is_empty() {
        return Ok(Score::PERFECT);
    }

    let mut correct = 0usize;
    for (position, (question, answer)) in questions.iter().zip(answers).enumerate() {
        if *answer as usize >= question.option_count() {
            return Err(ScoringError::AnswerOutOfRange {
                position,
                answer: *answer,
                options: question.option_count(),
            });
        }
        if question.is_correct(*answer) {
            correct += 1;
        }
    }

    Ok(Score(rounded_percent(correct, questions.len())))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionId, StepId};

    fn question(position: u32, correct_index: u32) -> QuizQuestion {
        QuizQuestion {
            id: QuestionId::new(u64::from(position) + 1),
            step_id: StepId::new(1),
            position,
            prompt: format!("Q{position}"),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_index,
        }
    }

    fn questions(n: u32) -> Vec<QuizQuestion> {
        (0..n).map(|i| question(i, i % 3)).collect()
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(is_passing(80));
        assert!(!is_passing(79));
        assert!(is_passing(100));
        assert!(!Score::new(5).unwrap().is_passing());
    }

    #[test]
    fn score_rejects_values_above_100() {
        assert_eq!(Score::new(101).unwrap_err(), ScoringError::OutOfRange(101));
        assert_eq!(Score::new(100).unwrap(), Score::PERFECT);
    }

    #[test]
    fn rounded_percent_rounds_half_up() {
        assert_eq!(rounded_percent(6, 7), 86);
        assert_eq!(rounded_percent(1, 8), 13); // 12.5
        assert_eq!(rounded_percent(1, 3), 33);
        assert_eq!(rounded_percent(2, 3), 67);
        assert_eq!(rounded_percent(7, 7), 100);
        assert_eq!(rounded_percent(0, 0), 0);
    }

    #[test]
    fn all_correct_scores_perfect() {
        let qs = questions(5);
        let answers: Vec<u32> = qs.iter().map(|q| q.correct_index).collect();
        assert_eq!(score_answers(&qs, &answers).unwrap(), Score::PERFECT);
    }

    #[test]
    fn four_of_five_passes_exactly_at_threshold() {
        let qs = questions(5);
        let mut answers: Vec<u32> = qs.iter().map(|q| q.correct_index).collect();
        answers[4] = (answers[4] + 1) % 3;
        let score = score_answers(&qs, &answers).unwrap();
        assert_eq!(score.value(), 80);
        assert!(score.is_passing());
    }

    #[test]
    fn missing_answers_count_as_wrong() {
        let qs = questions(4);
        let score = score_answers(&qs, &[0, 1]).unwrap();
        assert_eq!(score.value(), 50);
    }

    #[test]
    fn too_many_answers_is_rejected() {
        let qs = questions(2);
        assert_eq!(
            score_answers(&qs, &[0, 1, 2]).unwrap_err(),
            ScoringError::TooManyAnswers {
                answers: 3,
                questions: 2
            }
        );
    }

    #[test]
    fn out_of_range_answer_is_rejected() {
        let qs = questions(2);
        assert!(matches!(
            score_answers(&qs, &[0, 9]).unwrap_err(),
            ScoringError::AnswerOutOfRange { position: 1, .. }
        ));
    }

    #[test]
    fn step_without_questions_scores_perfect() {
        assert_eq!(score_answers(&[], &[]).unwrap(), Score::PERFECT);
    }
}
