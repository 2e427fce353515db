use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use survey_core::model::{
    QuestionId, Survey, SurveyId, SurveyResponse, SurveyStatus, SurveyToken,
};
use thiserror::Error;

/// Errors surfaced by storage adapters and survey services.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A response as it was persisted, with the survey it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecord {
    pub id: Option<i64>,
    pub survey_id: SurveyId,
    pub response: SurveyResponse,
    pub recorded_at: DateTime<Utc>,
}

impl ResponseRecord {
    #[must_use]
    pub fn new(survey_id: SurveyId, response: SurveyResponse, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            survey_id,
            response,
            recorded_at,
        }
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.response.question_id()
    }
}

/// Survey definitions.
#[async_trait]
pub trait SurveyRepository: Send + Sync {
    /// Persist or replace a survey definition.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the survey cannot be stored.
    async fn upsert_survey(&self, survey: &Survey) -> Result<(), StorageError>;

    /// Fetch a survey by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_survey(&self, id: SurveyId) -> Result<Survey, StorageError>;

    /// List stored surveys ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_surveys(&self, limit: u32) -> Result<Vec<Survey>, StorageError>;
}

/// Per-survey progress records.
#[async_trait]
pub trait StatusRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_status(&self, survey_id: SurveyId) -> Result<Option<SurveyStatus>, StorageError>;

    /// Unconditionally store `status`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the survey does not exist, or other
    /// storage errors.
    async fn put_status(&self, status: &SurveyStatus) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ResponseRepository: Send + Sync {
    /// All responses recorded for a survey, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn responses_for(&self, survey_id: SurveyId)
    -> Result<Vec<ResponseRecord>, StorageError>;
}

/// Atomic write path for an accepted answer.
#[async_trait]
pub trait AnswerPersistence: Send + Sync {
    /// Records `record` and replaces the stored status with `next`, but only if
    /// the stored token still equals `expected_token`. Both writes happen or
    /// neither does. Returns the new response row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the token is stale or the same
    /// (question, token) pair was already recorded; `StorageError::NotFound`
    /// when there is no status to advance.
    async fn record_answer(
        &self,
        expected_token: &SurveyToken,
        record: ResponseRecord,
        next: &SurveyStatus,
    ) -> Result<i64, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    surveys: Arc<Mutex<HashMap<SurveyId, Survey>>>,
    statuses: Arc<Mutex<HashMap<SurveyId, SurveyStatus>>>,
    responses: Arc<Mutex<Vec<ResponseRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl SurveyRepository for InMemoryRepository {
    async fn upsert_survey(&self, survey: &Survey) -> Result<(), StorageError> {
        let mut guard = self.surveys.lock().map_err(poisoned)?;
        guard.insert(survey.id(), survey.clone());
        Ok(())
    }

    async fn get_survey(&self, id: SurveyId) -> Result<Survey, StorageError> {
        let guard = self.surveys.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_surveys(&self, limit: u32) -> Result<Vec<Survey>, StorageError> {
        let guard = self.surveys.lock().map_err(poisoned)?;
        let mut surveys: Vec<Survey> = guard.values().cloned().collect();
        surveys.sort_by_key(Survey::id);
        surveys.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(surveys)
    }
}

#[async_trait]
impl StatusRepository for InMemoryRepository {
    async fn get_status(&self, survey_id: SurveyId) -> Result<Option<SurveyStatus>, StorageError> {
        let guard = self.statuses.lock().map_err(poisoned)?;
        Ok(guard.get(&survey_id).cloned())
    }

    async fn put_status(&self, status: &SurveyStatus) -> Result<(), StorageError> {
        if !self
            .surveys
            .lock()
            .map_err(poisoned)?
            .contains_key(&status.survey_id)
        {
            return Err(StorageError::NotFound);
        }
        let mut guard = self.statuses.lock().map_err(poisoned)?;
        guard.insert(status.survey_id, status.clone());
        Ok(())
    }
}

#[async_trait]
impl ResponseRepository for InMemoryRepository {
    async fn responses_for(
        &self,
        survey_id: SurveyId,
    ) -> Result<Vec<ResponseRecord>, StorageError> {
        let guard = self.responses.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|record| record.survey_id == survey_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AnswerPersistence for InMemoryRepository {
    async fn record_answer(
        &self,
        expected_token: &SurveyToken,
        mut record: ResponseRecord,
        next: &SurveyStatus,
    ) -> Result<i64, StorageError> {
        if record.survey_id != next.survey_id {
            return Err(StorageError::Conflict);
        }

        // Lock order: statuses, then responses.
        let mut statuses = self.statuses.lock().map_err(poisoned)?;
        let current = statuses
            .get(&record.survey_id)
            .ok_or(StorageError::NotFound)?;
        if &current.token != expected_token {
            return Err(StorageError::Conflict);
        }

        let mut responses = self.responses.lock().map_err(poisoned)?;
        let duplicate = responses.iter().any(|existing| {
            existing.survey_id == record.survey_id
                && existing.question_id() == record.question_id()
                && existing.response.survey_token() == record.response.survey_token()
        });
        if duplicate {
            return Err(StorageError::Conflict);
        }

        let id = i64::try_from(responses.len() + 1)
            .map_err(|_| StorageError::Serialization("response id overflow".into()))?;
        record.id = Some(id);
        responses.push(record);
        statuses.insert(next.survey_id, next.clone());
        Ok(id)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub surveys: Arc<dyn SurveyRepository>,
    pub statuses: Arc<dyn StatusRepository>,
    pub responses: Arc<dyn ResponseRepository>,
    pub answers: Arc<dyn AnswerPersistence>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let surveys: Arc<dyn SurveyRepository> = Arc::new(repo.clone());
        let statuses: Arc<dyn StatusRepository> = Arc::new(repo.clone());
        let responses: Arc<dyn ResponseRepository> = Arc::new(repo.clone());
        let answers: Arc<dyn AnswerPersistence> = Arc::new(repo);
        Self {
            surveys,
            statuses,
            responses,
            answers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_core::demo::vaccination_survey;
    use survey_core::model::AnswerPayload;
    use survey_core::time::fixed_now;

    fn initial_status(survey: &Survey) -> SurveyStatus {
        SurveyStatus::new(
            survey.id(),
            survey.title(),
            SurveyToken::new("t0"),
            survey.start(),
        )
    }

    #[tokio::test]
    async fn status_requires_survey() {
        let repo = InMemoryRepository::new();
        let survey = vaccination_survey(SurveyId::new(1)).unwrap();
        let err = repo.put_status(&initial_status(&survey)).await.unwrap_err();
        assert_eq!(err, StorageError::NotFound);

        repo.upsert_survey(&survey).await.unwrap();
        repo.put_status(&initial_status(&survey)).await.unwrap();
        let stored = repo.get_status(survey.id()).await.unwrap().unwrap();
        assert_eq!(stored.next_question_id, Some(QuestionId::new(1)));
    }

    #[tokio::test]
    async fn record_answer_advances_status_once() {
        let repo = InMemoryRepository::new();
        let survey = vaccination_survey(SurveyId::new(1)).unwrap();
        repo.upsert_survey(&survey).await.unwrap();
        let status = initial_status(&survey);
        repo.put_status(&status).await.unwrap();

        let response = SurveyResponse::answered(
            QuestionId::new(1),
            status.token.clone(),
            AnswerPayload::Boolean(true),
        );
        let next = status.advanced(SurveyToken::new("t1"), Some(QuestionId::new(2)));
        let record = ResponseRecord::new(survey.id(), response, fixed_now());

        let id = repo
            .record_answer(&status.token, record.clone(), &next)
            .await
            .unwrap();
        assert_eq!(id, 1);

        let again = repo.record_answer(&status.token, record, &next).await;
        assert_eq!(again, Err(StorageError::Conflict));

        let stored = repo.get_status(survey.id()).await.unwrap().unwrap();
        assert_eq!(stored.token, SurveyToken::new("t1"));
        assert_eq!(repo.responses_for(survey.id()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_is_ordered_and_limited() {
        let repo = InMemoryRepository::new();
        for id in [3, 1, 2] {
            repo.upsert_survey(&vaccination_survey(SurveyId::new(id)).unwrap())
                .await
                .unwrap();
        }
        let listed = repo.list_surveys(2).await.unwrap();
        let ids: Vec<u64> = listed.iter().map(|s| s.id().value()).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
