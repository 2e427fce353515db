use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use survey_core::model::{
    AnswerPayload, QuestionId, Survey, SurveyId, SurveyResponse, SurveyStatus, SurveyToken,
};

use crate::repository::{ResponseRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Unique and foreign-key violations are conflicts; everything else is a
/// connection-level failure.
pub(crate) fn db(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(inner) if inner.is_unique_violation() => StorageError::Conflict,
        sqlx::Error::Database(inner) if inner.is_foreign_key_violation() => StorageError::NotFound,
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn survey_id_from_i64(v: i64) -> Result<SurveyId, StorageError> {
    Ok(SurveyId::new(i64_to_u64("survey_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn survey_to_json(survey: &Survey) -> Result<String, StorageError> {
    serde_json::to_string(survey).map_err(ser)
}

/// Definitions are revalidated on the way out, so a hand-edited row that
/// breaks the graph surfaces as a serialization error.
pub(crate) fn map_survey_row(row: &SqliteRow) -> Result<Survey, StorageError> {
    let definition: String = row.try_get("definition").map_err(ser)?;
    let survey: Survey = serde_json::from_str(&definition).map_err(ser)?;
    let id = survey_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    if survey.id() != id {
        return Err(StorageError::Serialization(format!(
            "survey row {id} holds definition for {}",
            survey.id()
        )));
    }
    Ok(survey)
}

pub(crate) fn map_status_row(row: &SqliteRow) -> Result<SurveyStatus, StorageError> {
    Ok(SurveyStatus::new(
        survey_id_from_i64(row.try_get::<i64, _>("survey_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        SurveyToken::new(row.try_get::<String, _>("token").map_err(ser)?),
        row.try_get::<Option<i64>, _>("next_question_id")
            .map_err(ser)?
            .map(question_id_from_i64)
            .transpose()?,
    ))
}

/// Splits a response into the `(skipped, payload)` column pair.
pub(crate) fn response_columns(
    response: &SurveyResponse,
) -> Result<(i64, Option<String>), StorageError> {
    match response.payload() {
        None => Ok((1, None)),
        Some(payload) => Ok((0, Some(serde_json::to_string(payload).map_err(ser)?))),
    }
}

pub(crate) fn map_response_row(row: &SqliteRow) -> Result<ResponseRecord, StorageError> {
    let question_id = question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?;
    let token = SurveyToken::new(row.try_get::<String, _>("survey_token").map_err(ser)?);
    let skipped: i64 = row.try_get("skipped").map_err(ser)?;
    let payload: Option<String> = row.try_get("payload").map_err(ser)?;

    let response = match (skipped, payload) {
        (1, None) => SurveyResponse::skipped(question_id, token),
        (0, Some(raw)) => {
            let payload: AnswerPayload = serde_json::from_str(&raw).map_err(ser)?;
            SurveyResponse::answered(question_id, token, payload)
        }
        (flag, payload) => {
            return Err(StorageError::Serialization(format!(
                "inconsistent response row: skipped={flag}, payload present={}",
                payload.is_some()
            )));
        }
    };

    Ok(ResponseRecord {
        id: Some(row.try_get("id").map_err(ser)?),
        survey_id: survey_id_from_i64(row.try_get::<i64, _>("survey_id").map_err(ser)?)?,
        response,
        recorded_at: row.try_get("recorded_at").map_err(ser)?,
    })
}
