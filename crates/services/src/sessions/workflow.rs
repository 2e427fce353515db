use std::sync::Arc;

use storage::repository::StorageError;
use storage::service::SurveyService;
use survey_core::AnswerBuilder;
use survey_core::model::{
    Question, Selection, Survey, SurveyId, SurveyResponse, SurveyStatus, SurveyToken,
};
use tracing::{info, warn};

use super::handle::{InFlightGuard, SessionHandle};
use super::service::{PendingSubmit, SubmitOutcome, SurveySession};
use super::state::SessionState;
use crate::Clock;
use crate::error::SessionError;

/// Orchestrates loading and answering against a `SurveyService`.
///
/// All state lives in the [`SessionHandle`]; this type only holds the
/// collaborators, so one instance can drive many sessions.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    service: Arc<dyn SurveyService>,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(clock: Clock, service: Arc<dyn SurveyService>) -> Self {
        Self { clock, service }
    }

    /// A fresh session in `Loading`. Call [`load`](Self::load) next.
    #[must_use]
    pub fn open(&self, survey_id: SurveyId) -> SessionHandle {
        SessionHandle::new(survey_id, self.clock)
    }

    /// Opens a session and performs the first load.
    ///
    /// The handle is returned even when loading fails, so the caller can
    /// retry with [`load`](Self::load).
    pub async fn start(
        &self,
        survey_id: SurveyId,
    ) -> (SessionHandle, Result<SessionState, SessionError>) {
        let handle = self.open(survey_id);
        let loaded = self.load(&handle).await;
        (handle, loaded)
    }

    /// Fetches status and survey and exposes the first question, or finishes
    /// immediately if the status has nowhere left to go.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when fetching fails (the session is
    /// then in `LoadError`), `SessionError::Disposed` if the session went
    /// away meanwhile, or `SessionError::Finished` for a finished session.
    pub async fn load(&self, handle: &SessionHandle) -> Result<SessionState, SessionError> {
        let (survey_id, ticket) =
            handle.with(|s| s.begin_load().map(|ticket| (s.survey_id(), ticket)))??;

        match self.fetch(survey_id).await {
            Ok((status, survey)) => {
                handle.with(|s| s.apply_loaded(ticket, status, survey).cloned())?
            }
            Err(err) => {
                handle.with(|s| s.apply_load_error(ticket, err.to_string()).map(|_| ()))??;
                Err(SessionError::Storage(err))
            }
        }
    }

    /// Sends `response` for the current question.
    ///
    /// At most one submit per session is outstanding; extra calls return
    /// `SubmitOutcome::Ignored` without contacting the service.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when the service rejects or fails the
    /// request; the question stays current and the call can be repeated. A
    /// `Conflict` caused by an earlier attempt that was recorded without a
    /// reply is resolved by re-reading the status instead.
    pub async fn submit(
        &self,
        handle: &SessionHandle,
        response: SurveyResponse,
    ) -> Result<SubmitOutcome, SessionError> {
        let Some(pending) = handle.with(|s| s.begin_submit(response))?? else {
            return Ok(SubmitOutcome::Ignored);
        };
        let mut guard = InFlightGuard::new(handle.clone(), pending.ticket);

        let result = match self
            .service
            .answer(&pending.status, &pending.response, pending.next_question)
            .await
        {
            Err(StorageError::Conflict) => self.resync(&pending).await,
            other => other,
        };
        guard.disarm();

        match result {
            Ok(status) => handle.with(|s| s.complete_submit(guard.ticket(), status))?,
            Err(err) => {
                let disposed = handle.with(|s| {
                    s.release(guard.ticket());
                    s.is_disposed()
                })?;
                if disposed {
                    return Ok(SubmitOutcome::Discarded);
                }
                warn!(
                    question_id = %pending.response.question_id(),
                    error = %err,
                    "answer submission failed"
                );
                Err(SessionError::Storage(err))
            }
        }
    }

    /// Validates `selection` against the current question and submits it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Answer` for invalid selections (nothing is sent),
    /// plus everything [`submit`](Self::submit) can return.
    pub async fn answer(
        &self,
        handle: &SessionHandle,
        selection: &Selection,
    ) -> Result<SubmitOutcome, SessionError> {
        let response = handle.with(|s| {
            build_for_current(s, |question, token| {
                AnswerBuilder::build(question, selection, token)
            })
        })??;
        match response {
            Some(response) => self.submit(handle, response).await,
            None => Ok(SubmitOutcome::Ignored),
        }
    }

    /// Skips the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Answer` for required questions, plus everything
    /// [`submit`](Self::submit) can return.
    pub async fn skip(&self, handle: &SessionHandle) -> Result<SubmitOutcome, SessionError> {
        let response = handle.with(|s| build_for_current(s, AnswerBuilder::skip))??;
        match response {
            Some(response) => self.submit(handle, response).await,
            None => Ok(SubmitOutcome::Ignored),
        }
    }

    /// After a `Conflict`, checks whether the service already moved past the
    /// token we sent. That happens when an earlier attempt was recorded but
    /// its reply never arrived; the fresh status then completes this submit.
    async fn resync(&self, pending: &PendingSubmit) -> Result<SurveyStatus, StorageError> {
        let status = self
            .service
            .get_survey_status(pending.status.survey_id)
            .await?;
        if status.token == pending.status.token {
            return Err(StorageError::Conflict);
        }
        info!(
            survey_id = %status.survey_id,
            question_id = %pending.response.question_id(),
            "answer already recorded, resuming from service status"
        );
        Ok(status)
    }

    async fn fetch(
        &self,
        survey_id: SurveyId,
    ) -> Result<(SurveyStatus, Survey), StorageError> {
        let status = self.service.get_survey_status(survey_id).await?;
        let survey = self.service.get_survey(survey_id).await?;
        Ok((status, survey))
    }
}

/// Builds a response for the question on screen with the current token.
/// `None` means a submit is already outstanding or the survey is done.
fn build_for_current<F, E>(
    session: &SurveySession,
    build: F,
) -> Result<Option<SurveyResponse>, SessionError>
where
    F: FnOnce(&Question, &SurveyToken) -> Result<SurveyResponse, E>,
    SessionError: From<E>,
{
    if session.is_disposed() {
        return Err(SessionError::Disposed);
    }
    match session.state() {
        SessionState::Active(question) => {
            let status = session.status().ok_or(SessionError::NotActive)?;
            Ok(Some(build(question, &status.token)?))
        }
        SessionState::Submitting(_) | SessionState::Finished(_) => Ok(None),
        SessionState::Loading | SessionState::LoadError(_) => Err(SessionError::NotActive),
    }
}
