use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Applies every schema version not yet recorded in `schema_migrations`.
///
/// Version 1: surveys (definition stored as JSON), per-survey status, and the
/// response log with its uniqueness guard.
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

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS surveys (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    definition TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS survey_statuses (
                    survey_id INTEGER PRIMARY KEY,
                    token TEXT NOT NULL,
                    next_question_id INTEGER,
                    updated_at TEXT NOT NULL,
                    FOREIGN KEY (survey_id) REFERENCES surveys(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS survey_responses (
                    id INTEGER PRIMARY KEY,
                    survey_id INTEGER NOT NULL,
                    question_id INTEGER NOT NULL,
                    survey_token TEXT NOT NULL,
                    skipped INTEGER NOT NULL CHECK (skipped IN (0, 1)),
                    payload TEXT,
                    recorded_at TEXT NOT NULL,
                    UNIQUE (survey_id, question_id, survey_token),
                    FOREIGN KEY (survey_id) REFERENCES surveys(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_survey_responses_survey_recorded
                    ON survey_responses (survey_id, recorded_at, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied sqlite migration");
    }

    Ok(())
}
