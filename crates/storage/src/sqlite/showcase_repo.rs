use folio_core::model::{ShowcaseSubmission, SubmissionId, ValidatedSubmission};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db, id_i64, map_submission_row, ser};
use crate::repository::{ShowcaseRepository, StorageError};

#[async_trait::async_trait]
impl ShowcaseRepository for SqliteRepository {
    async fn upsert_submission(
        &self,
        submission: ValidatedSubmission,
    ) -> Result<ShowcaseSubmission, StorageError> {
        let row = sqlx::query(
            r"
                INSERT INTO showcase_submissions (
                    instance_id, user_id, template_id, repo_url, demo_url, description, submitted_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(instance_id) DO UPDATE SET
                    repo_url = excluded.repo_url,
                    demo_url = excluded.demo_url,
                    description = excluded.description,
                    submitted_at = excluded.submitted_at
                RETURNING id
            ",
        )
        .bind(id_i64("instance_id", submission.instance_id.value())?)
        .bind(id_i64("user_id", submission.user_id.value())?)
        .bind(id_i64("template_id", submission.template_id.value())?)
        .bind(submission.repo_url.as_str())
        .bind(submission.demo_url.as_ref().map(url::Url::as_str))
        .bind(&submission.description)
        .bind(submission.submitted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db)?;

        let id: i64 = row.try_get("id").map_err(ser)?;
        let id = u64::try_from(id)
            .map_err(|_| StorageError::Serialization("submission id sign overflow".into()))?;
        Ok(submission.assign_id(SubmissionId::new(id)))
    }

    async fn list_submissions(&self, limit: u32) -> Result<Vec<ShowcaseSubmission>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, instance_id, user_id, template_id, repo_url, demo_url,
                       description, submitted_at
                FROM showcase_submissions
                ORDER BY submitted_at DESC, id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_submission_row(&row)?);
        }
        Ok(out)
    }
}
