use survey_core::model::{SurveyId, SurveyStatus, SurveyToken};

use super::SqliteRepository;
use super::mapping::{db, id_i64, map_response_row, response_columns};
use crate::repository::{AnswerPersistence, ResponseRecord, ResponseRepository, StorageError};

#[async_trait::async_trait]
impl ResponseRepository for SqliteRepository {
    async fn responses_for(
        &self,
        survey_id: SurveyId,
    ) -> Result<Vec<ResponseRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, survey_id, question_id, survey_token, skipped, payload, recorded_at
                FROM survey_responses
                WHERE survey_id = ?1
                ORDER BY recorded_at ASC, id ASC
            ",
        )
        .bind(id_i64("survey_id", survey_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_response_row(&row)?);
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl AnswerPersistence for SqliteRepository {
    async fn record_answer(
        &self,
        expected_token: &SurveyToken,
        record: ResponseRecord,
        next: &SurveyStatus,
    ) -> Result<i64, StorageError> {
        if record.survey_id != next.survey_id {
            return Err(StorageError::Conflict);
        }

        let survey_id = id_i64("survey_id", record.survey_id.value())?;
        let question_id = id_i64("question_id", record.question_id().value())?;
        let next_question = next
            .next_question_id
            .map(|id| id_i64("next_question_id", id.value()))
            .transpose()?;
        let (skipped, payload) = response_columns(&record.response)?;

        let mut tx = self.pool.begin().await.map_err(db)?;

        // Compare-and-swap on the token; zero rows means stale or missing.
        let advanced = sqlx::query(
            r"
            UPDATE survey_statuses
            SET token = ?1, next_question_id = ?2, updated_at = ?3
            WHERE survey_id = ?4 AND token = ?5
            ",
        )
        .bind(next.token.as_str())
        .bind(next_question)
        .bind(record.recorded_at)
        .bind(survey_id)
        .bind(expected_token.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        if advanced.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM survey_statuses WHERE survey_id = ?1")
                .bind(survey_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db)?;
            return Err(if exists.is_some() {
                StorageError::Conflict
            } else {
                StorageError::NotFound
            });
        }

        let res = sqlx::query(
            r"
                INSERT INTO survey_responses (
                    survey_id, question_id, survey_token, skipped, payload, recorded_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(survey_id)
        .bind(question_id)
        .bind(record.response.survey_token().as_str())
        .bind(skipped)
        .bind(payload)
        .bind(record.recorded_at)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        tx.commit().await.map_err(db)?;

        Ok(res.last_insert_rowid())
    }
}
