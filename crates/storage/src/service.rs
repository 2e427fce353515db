use async_trait::async_trait;
use survey_core::Clock;
use survey_core::model::{QuestionId, Survey, SurveyId, SurveyResponse, SurveyStatus, SurveyToken};
use tracing::{debug, info, warn};

use crate::repository::{ResponseRecord, Storage, StorageError};

/// The remote survey backend a session talks to.
#[async_trait]
pub trait SurveyService: Send + Sync {
    /// Current progress for `survey_id`, creating a fresh record on first use.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown surveys, or transport and
    /// backend errors.
    async fn get_survey_status(&self, survey_id: SurveyId) -> Result<SurveyStatus, StorageError>;

    /// The survey definition.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown surveys, or transport and
    /// backend errors.
    async fn get_survey(&self, survey_id: SurveyId) -> Result<Survey, StorageError>;

    /// Submits `response` under `status` and returns the updated status.
    ///
    /// `next_question` is the client's lookahead; `None` means the client
    /// believes the survey ends after this answer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when `status` is stale, or transport
    /// and backend errors.
    async fn answer(
        &self,
        status: &SurveyStatus,
        response: &SurveyResponse,
        next_question: Option<QuestionId>,
    ) -> Result<SurveyStatus, StorageError>;
}

/// `SurveyService` backed by local repositories.
///
/// Mints a new token for every accepted answer, so a replayed submission with
/// an old token is rejected instead of being recorded twice.
#[derive(Clone)]
pub struct LocalSurveyService {
    storage: Storage,
    clock: Clock,
}

impl LocalSurveyService {
    #[must_use]
    pub fn new(storage: Storage, clock: Clock) -> Self {
        Self { storage, clock }
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

#[async_trait]
impl SurveyService for LocalSurveyService {
    async fn get_survey_status(&self, survey_id: SurveyId) -> Result<SurveyStatus, StorageError> {
        if let Some(status) = self.storage.statuses.get_status(survey_id).await? {
            return Ok(status);
        }

        let survey = self.storage.surveys.get_survey(survey_id).await?;
        let status = SurveyStatus::new(
            survey.id(),
            survey.title(),
            SurveyToken::generate(),
            survey.start(),
        );
        self.storage.statuses.put_status(&status).await?;
        info!(survey_id = %survey_id, "created survey status");
        Ok(status)
    }

    async fn get_survey(&self, survey_id: SurveyId) -> Result<Survey, StorageError> {
        self.storage.surveys.get_survey(survey_id).await
    }

    async fn answer(
        &self,
        status: &SurveyStatus,
        response: &SurveyResponse,
        next_question: Option<QuestionId>,
    ) -> Result<SurveyStatus, StorageError> {
        if response.survey_token() != &status.token {
            warn!(survey_id = %status.survey_id, "response token does not match status");
            return Err(StorageError::Conflict);
        }

        let survey = self.storage.surveys.get_survey(status.survey_id).await?;
        if !survey.contains(response.question_id()) {
            return Err(StorageError::NotFound);
        }
        if let Some(next) = next_question {
            if !survey.contains(next) {
                return Err(StorageError::NotFound);
            }
        }

        let next_status = status.advanced(SurveyToken::generate(), next_question);
        let record = ResponseRecord::new(status.survey_id, response.clone(), self.clock.now());
        let id = self
            .storage
            .answers
            .record_answer(&status.token, record, &next_status)
            .await?;

        debug!(
            survey_id = %status.survey_id,
            question_id = %response.question_id(),
            skipped = response.is_skipped(),
            response_id = id,
            next = ?next_question,
            "recorded answer"
        );
        Ok(next_status)
    }
}
