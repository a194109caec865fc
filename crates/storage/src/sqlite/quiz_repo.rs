use folio_core::model::{
    AttemptId, NewQuizAttempt, QuestionDraft, QuestionId, QuizAttempt, QuizQuestion, StepId,
    TemplateId, UserId,
};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    db, id_i64, json_text, map_attempt_row, map_question_row, ser, step_id_from_i64,
};
use crate::repository::{QuizRepository, StorageError};

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn add_question(&self, draft: QuestionDraft) -> Result<QuizQuestion, StorageError> {
        let step_id = id_i64("step_id", draft.step_id.value())?;
        let mut tx = self.pool.begin().await.map_err(db)?;

        let next: i64 = sqlx::query(
            "SELECT COALESCE(MAX(position) + 1, 0) AS next FROM quiz_questions WHERE step_id = ?1",
        )
        .bind(step_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db)?
        .try_get("next")
        .map_err(ser)?;

        let res = sqlx::query(
            r"
                INSERT INTO quiz_questions (step_id, position, prompt, options, correct_index)
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(step_id)
        .bind(next)
        .bind(&draft.prompt)
        .bind(json_text(&draft.options)?)
        .bind(i64::from(draft.correct_index))
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        tx.commit().await.map_err(db)?;

        Ok(QuizQuestion {
            id: QuestionId::new(
                u64::try_from(res.last_insert_rowid())
                    .map_err(|_| StorageError::Serialization("question id sign overflow".into()))?,
            ),
            step_id: draft.step_id,
            position: u32::try_from(next)
                .map_err(|_| StorageError::Serialization(format!("invalid position: {next}")))?,
            prompt: draft.prompt,
            options: draft.options,
            correct_index: draft.correct_index,
        })
    }

    async fn questions_for_step(&self, step: StepId) -> Result<Vec<QuizQuestion>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, step_id, position, prompt, options, correct_index
                FROM quiz_questions
                WHERE step_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(id_i64("step_id", step.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }

    async fn append_attempt(&self, attempt: NewQuizAttempt) -> Result<QuizAttempt, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quiz_attempts (user_id, step_id, answers, score, passed, attempted_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id_i64("user_id", attempt.user_id().value())?)
        .bind(id_i64("step_id", attempt.step_id().value())?)
        .bind(json_text(&attempt.answers())?)
        .bind(i64::from(attempt.score().value()))
        .bind(attempt.passed())
        .bind(attempt.attempted_at())
        .execute(&self.pool)
        .await
        .map_err(db)?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("attempt id sign overflow".into()))?;
        Ok(attempt.assign_id(AttemptId::new(id)))
    }

    async fn attempts_for_step(
        &self,
        user: UserId,
        step: StepId,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, step_id, answers, score, passed, attempted_at
                FROM quiz_attempts
                WHERE user_id = ?1 AND step_id = ?2
                ORDER BY attempted_at ASC, id ASC
            ",
        )
        .bind(id_i64("user_id", user.value())?)
        .bind(id_i64("step_id", step.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row(&row)?);
        }
        Ok(out)
    }

    async fn passed_steps(
        &self,
        user: UserId,
        template: TemplateId,
    ) -> Result<Vec<StepId>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT a.step_id AS step_id, MIN(a.id) AS first_pass
                FROM quiz_attempts a
                JOIN steps s ON s.id = a.step_id
                WHERE a.user_id = ?1 AND s.template_id = ?2 AND a.passed = 1
                GROUP BY a.step_id
                ORDER BY first_pass ASC
            ",
        )
        .bind(id_i64("user_id", user.value())?)
        .bind(id_i64("template_id", template.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(step_id_from_i64(row.try_get("step_id").map_err(ser)?)?);
        }
        Ok(out)
    }
}
