use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            display_name TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS templates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            description TEXT,
            difficulty TEXT NOT NULL
                CHECK (difficulty IN ('beginner', 'intermediate', 'advanced')),
            technologies TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS steps (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            template_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 1),
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            UNIQUE (template_id, position),
            FOREIGN KEY (template_id) REFERENCES templates(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            step_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            prompt TEXT NOT NULL,
            options TEXT NOT NULL,
            correct_index INTEGER NOT NULL CHECK (correct_index >= 0),
            UNIQUE (step_id, position),
            FOREIGN KEY (step_id) REFERENCES steps(id) ON DELETE CASCADE
        );
    ",
    // `passed` is pinned to the score so no row can claim a pass it did not earn.
    r"
        CREATE TABLE IF NOT EXISTS quiz_attempts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            step_id INTEGER NOT NULL,
            answers TEXT NOT NULL,
            score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
            passed INTEGER NOT NULL CHECK (passed = (score >= 80)),
            attempted_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (step_id) REFERENCES steps(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS started_projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            template_id INTEGER NOT NULL,
            progress INTEGER NOT NULL CHECK (progress BETWEEN 0 AND 100),
            certificate_eligible INTEGER NOT NULL,
            certificate_issued_at TEXT,
            started_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 0 CHECK (version >= 0),
            UNIQUE (user_id, template_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (template_id) REFERENCES templates(id) ON DELETE CASCADE
        );
    ",
    // No foreign key on step_id: rows may outlive their step until the next
    // aggregation prunes them.
    r"
        CREATE TABLE IF NOT EXISTS instance_completed_steps (
            instance_id INTEGER NOT NULL,
            ordinal INTEGER NOT NULL,
            step_id INTEGER NOT NULL,
            PRIMARY KEY (instance_id, ordinal),
            FOREIGN KEY (instance_id) REFERENCES started_projects(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS showcase_submissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            instance_id INTEGER NOT NULL UNIQUE,
            user_id INTEGER NOT NULL,
            template_id INTEGER NOT NULL,
            repo_url TEXT NOT NULL,
            demo_url TEXT,
            description TEXT NOT NULL,
            submitted_at TEXT NOT NULL,
            FOREIGN KEY (instance_id) REFERENCES started_projects(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_quiz_attempts_user_step
            ON quiz_attempts (user_id, step_id, attempted_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_showcase_submitted
            ON showcase_submissions (submitted_at);
    ",
];

// Marks instances that ever completed a step so pruning cannot send them
// back to `not_started`. Rows with completed steps are backfilled.
const SCHEMA_V2: &[&str] = &[
    r"
        ALTER TABLE started_projects ADD COLUMN in_progress_since TEXT;
    ",
    r"
        UPDATE started_projects
        SET in_progress_since = updated_at
        WHERE id IN (SELECT instance_id FROM instance_completed_steps);
    ",
];

const MIGRATIONS: &[(i64, &[&str])] = &[(1, SCHEMA_V1), (2, SCHEMA_V2)];

/// Runs versioned migrations for the current schema.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    for (version, statements) in MIGRATIONS.iter().copied() {
        if is_applied(pool, version).await? {
            continue;
        }
        let mut tx = pool.begin().await?;

        for statement in statements.iter().copied() {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
