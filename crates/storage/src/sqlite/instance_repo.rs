use chrono::{DateTime, Utc};
use folio_core::model::{StartedProject, StepId, TemplateId, UserId};
use sqlx::{Row, Sqlite, SqliteConnection, Transaction};

use super::SqliteRepository;
use super::mapping::{
    db, id_i64, map_instance_row, ser, step_id_from_i64, template_id_from_i64, user_id_from_i64,
};
use crate::repository::{InstanceRepository, StorageError};

const INSTANCE_COLUMNS: &str = "id, user_id, template_id, progress, certificate_eligible, \
     certificate_issued_at, in_progress_since, started_at, updated_at, version";

async fn completed_for(
    conn: &mut SqliteConnection,
    instance_id: i64,
) -> Result<Vec<StepId>, StorageError> {
    let rows = sqlx::query(
        r"
            SELECT step_id
            FROM instance_completed_steps
            WHERE instance_id = ?1
            ORDER BY ordinal ASC
        ",
    )
    .bind(instance_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(db)?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(step_id_from_i64(row.try_get("step_id").map_err(ser)?)?);
    }
    Ok(out)
}

async fn write_completed(
    tx: &mut Transaction<'_, Sqlite>,
    instance_id: i64,
    steps: &[StepId],
) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM instance_completed_steps WHERE instance_id = ?1")
        .bind(instance_id)
        .execute(&mut **tx)
        .await
        .map_err(db)?;

    for (ordinal, step) in steps.iter().enumerate() {
        sqlx::query(
            r"
                INSERT INTO instance_completed_steps (instance_id, ordinal, step_id)
                VALUES (?1, ?2, ?3)
            ",
        )
        .bind(instance_id)
        .bind(i64::try_from(ordinal).map_err(ser)?)
        .bind(id_i64("step_id", step.value())?)
        .execute(&mut **tx)
        .await
        .map_err(db)?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl InstanceRepository for SqliteRepository {
    async fn start_instance(
        &self,
        user: UserId,
        template: TemplateId,
        now: DateTime<Utc>,
    ) -> Result<StartedProject, StorageError> {
        let user_id = id_i64("user_id", user.value())?;
        let template_id = id_i64("template_id", template.value())?;

        sqlx::query(
            r"
                INSERT INTO started_projects (
                    user_id, template_id, progress, certificate_eligible,
                    certificate_issued_at, started_at, updated_at, version
                )
                VALUES (?1, ?2, 0, 0, NULL, ?3, ?3, 0)
                ON CONFLICT(user_id, template_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(template_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        self.get_instance(user, template)
            .await?
            .ok_or(StorageError::NotFound)
    }

    async fn get_instance(
        &self,
        user: UserId,
        template: TemplateId,
    ) -> Result<Option<StartedProject>, StorageError> {
        // One transaction so the row and its completed list come from the same snapshot.
        let mut tx = self.pool.begin().await.map_err(db)?;
        let row = sqlx::query(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM started_projects WHERE user_id = ?1 AND template_id = ?2"
        ))
        .bind(id_i64("user_id", user.value())?)
        .bind(id_i64("template_id", template.value())?)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db)?;

        let instance = match row {
            Some(row) => {
                let id: i64 = row.try_get("id").map_err(ser)?;
                let completed = completed_for(&mut *tx, id).await?;
                Some(map_instance_row(&row, completed)?)
            }
            None => None,
        };
        tx.commit().await.map_err(db)?;
        Ok(instance)
    }

    async fn instance_keys(&self) -> Result<Vec<(UserId, TemplateId)>, StorageError> {
        let rows = sqlx::query("SELECT user_id, template_id FROM started_projects ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push((
                user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
                template_id_from_i64(row.try_get("template_id").map_err(ser)?)?,
            ));
        }
        Ok(out)
    }

    async fn update_instance(&self, instance: &StartedProject) -> Result<u64, StorageError> {
        let id = id_i64("instance_id", instance.id().value())?;
        let expected = id_i64("version", instance.version())?;
        let mut tx = self.pool.begin().await.map_err(db)?;

        let res = sqlx::query(
            r"
                UPDATE started_projects
                SET progress = ?1,
                    certificate_eligible = ?2,
                    certificate_issued_at = ?3,
                    in_progress_since = ?4,
                    updated_at = ?5,
                    version = version + 1
                WHERE id = ?6 AND version = ?7
            ",
        )
        .bind(i64::from(instance.progress()))
        .bind(instance.certificate_eligible())
        .bind(instance.certificate_issued_at())
        .bind(instance.in_progress_since())
        .bind(instance.updated_at())
        .bind(id)
        .bind(expected)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        if res.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM started_projects WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db)?
                .is_some();
            tx.rollback().await.map_err(db)?;
            return Err(if exists {
                StorageError::Conflict
            } else {
                StorageError::NotFound
            });
        }

        write_completed(&mut tx, id, instance.completed_steps()).await?;
        tx.commit().await.map_err(db)?;

        Ok(instance.version() + 1)
    }
}
