use survey_core::model::{SurveyId, SurveyStatus};

use super::SqliteRepository;
use super::mapping::{db, id_i64, map_status_row};
use crate::repository::{StatusRepository, StorageError};

#[async_trait::async_trait]
impl StatusRepository for SqliteRepository {
    async fn get_status(&self, survey_id: SurveyId) -> Result<Option<SurveyStatus>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT st.survey_id, s.title, st.token, st.next_question_id
            FROM survey_statuses st
            JOIN surveys s ON s.id = st.survey_id
            WHERE st.survey_id = ?1
            ",
        )
        .bind(id_i64("survey_id", survey_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        row.as_ref().map(map_status_row).transpose()
    }

    async fn put_status(&self, status: &SurveyStatus) -> Result<(), StorageError> {
        let next = status
            .next_question_id
            .map(|id| id_i64("next_question_id", id.value()))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO survey_statuses (survey_id, token, next_question_id, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(survey_id) DO UPDATE SET
                token = excluded.token,
                next_question_id = excluded.next_question_id,
                updated_at = excluded.updated_at
            ",
        )
        .bind(id_i64("survey_id", status.survey_id.value())?)
        .bind(status.token.as_str())
        .bind(next)
        .bind(self.clock.now())
        .execute(&self.pool)
        .await
        .map_err(db)?;

        Ok(())
    }
}
