use folio_core::model::{ProjectTemplate, Step, StepDraft, StepId, TemplateId, ValidatedTemplate};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db, id_i64, json_text, map_step_row, map_template_row, ser};
use crate::repository::{StorageError, TemplateRepository};

const TEMPLATE_COLUMNS: &str =
    "id, slug, title, description, difficulty, technologies, created_at";

#[async_trait::async_trait]
impl TemplateRepository for SqliteRepository {
    async fn insert_template(
        &self,
        template: ValidatedTemplate,
    ) -> Result<ProjectTemplate, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO templates (slug, title, description, difficulty, technologies, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(&template.slug)
        .bind(&template.title)
        .bind(template.description.as_deref())
        .bind(template.difficulty.as_str())
        .bind(json_text(&template.technologies)?)
        .bind(template.created_at)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("template id sign overflow".into()))?;
        Ok(template.assign_id(TemplateId::new(id)))
    }

    async fn get_template(&self, id: TemplateId) -> Result<Option<ProjectTemplate>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ?1"
        ))
        .bind(id_i64("template_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;
        row.as_ref().map(map_template_row).transpose()
    }

    async fn get_template_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProjectTemplate>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE slug = ?1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;
        row.as_ref().map(map_template_row).transpose()
    }

    async fn list_templates(&self, limit: u32) -> Result<Vec<ProjectTemplate>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates ORDER BY id ASC LIMIT ?1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_template_row(&row)?);
        }
        Ok(out)
    }

    async fn append_step(&self, draft: StepDraft) -> Result<Step, StorageError> {
        let template_id = id_i64("template_id", draft.template_id.value())?;
        let mut tx = self.pool.begin().await.map_err(db)?;

        let next: i64 = sqlx::query(
            "SELECT COALESCE(MAX(position), 0) + 1 AS next FROM steps WHERE template_id = ?1",
        )
        .bind(template_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db)?
        .try_get("next")
        .map_err(ser)?;

        let res = sqlx::query(
            r"
                INSERT INTO steps (template_id, position, title, body)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(template_id)
        .bind(next)
        .bind(&draft.title)
        .bind(&draft.body)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        tx.commit().await.map_err(db)?;

        Ok(Step {
            id: StepId::new(
                u64::try_from(res.last_insert_rowid())
                    .map_err(|_| StorageError::Serialization("step id sign overflow".into()))?,
            ),
            template_id: draft.template_id,
            position: u32::try_from(next)
                .map_err(|_| StorageError::Serialization(format!("invalid position: {next}")))?,
            title: draft.title,
            body: draft.body,
        })
    }

    async fn get_step(&self, id: StepId) -> Result<Option<Step>, StorageError> {
        let row = sqlx::query(
            "SELECT id, template_id, position, title, body FROM steps WHERE id = ?1",
        )
        .bind(id_i64("step_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;
        row.as_ref().map(map_step_row).transpose()
    }

    async fn steps_for_template(&self, id: TemplateId) -> Result<Vec<Step>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, template_id, position, title, body
                FROM steps
                WHERE template_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(id_i64("template_id", id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_step_row(&row)?);
        }
        Ok(out)
    }

    async fn delete_step(&self, id: StepId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM steps WHERE id = ?1")
            .bind(id_i64("step_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
