use survey_core::model::{Survey, SurveyId};

use super::SqliteRepository;
use super::mapping::{db, id_i64, map_survey_row, survey_to_json};
use crate::repository::{StorageError, SurveyRepository};

#[async_trait::async_trait]
impl SurveyRepository for SqliteRepository {
    async fn upsert_survey(&self, survey: &Survey) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO surveys (id, title, definition, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                definition = excluded.definition,
                updated_at = excluded.updated_at
            ",
        )
        .bind(id_i64("survey_id", survey.id().value())?)
        .bind(survey.title())
        .bind(survey_to_json(survey)?)
        .bind(self.clock.now())
        .execute(&self.pool)
        .await
        .map_err(db)?;

        Ok(())
    }

    async fn get_survey(&self, id: SurveyId) -> Result<Survey, StorageError> {
        let row = sqlx::query("SELECT id, definition FROM surveys WHERE id = ?1")
            .bind(id_i64("survey_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        match row {
            Some(row) => map_survey_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn list_surveys(&self, limit: u32) -> Result<Vec<Survey>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, definition
            FROM surveys
            ORDER BY id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut surveys = Vec::with_capacity(rows.len());
        for row in rows {
            surveys.push(map_survey_row(&row)?);
        }
        Ok(surveys)
    }
}
