use folio_core::model::{User, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db, id_i64, ser};
use crate::repository::{StorageError, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO users (id, display_name)
                VALUES (?1, ?2)
                ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name
            ",
        )
        .bind(id_i64("user_id", user.id().value())?)
        .bind(user.display_name())
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query("SELECT id, display_name FROM users WHERE id = ?1")
            .bind(id_i64("user_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        row.map(|row| {
            let name: String = row.try_get("display_name").map_err(ser)?;
            User::new(id, name).map_err(ser)
        })
        .transpose()
    }
}
