use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use survey_core::model::{Question, QuestionId, Survey, SurveyId, SurveyResponse, SurveyStatus};
use survey_core::{Clock, QuestionIterator};
use tracing::{debug, info, warn};

use super::progress::SessionProgress;
use super::state::{Completion, SessionState};
use crate::error::SessionError;

//
// ─── SUBMISSION TYPES ──────────────────────────────────────────────────────────
//

/// Everything needed to send one answer, captured while the session was
/// locked so the request itself can run without it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmit {
    pub ticket: u64,
    pub status: SurveyStatus,
    pub response: SurveyResponse,
    pub next_question: Option<QuestionId>,
}

/// How a submit call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Accepted; this question is now on screen.
    Next(Question),
    /// Accepted; that was the last question.
    Finished(Completion),
    /// Not sent: another submit is outstanding, the response is for a
    /// question that is no longer current, or the survey is already done.
    Ignored,
    /// The session went away while the request was outstanding.
    Discarded,
}

#[derive(Debug, Clone)]
struct InFlight {
    ticket: u64,
    response: SurveyResponse,
    lookahead: Option<QuestionId>,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory survey session.
///
/// Owns the traversal cursor and the latest status, and moves through
/// [`SessionState`]. It performs no I/O: the async side calls `begin_*`
/// before a request and `apply_*`/`complete_*`/`release` after it.
pub struct SurveySession {
    survey_id: SurveyId,
    clock: Clock,
    state: SessionState,
    status: Option<SurveyStatus>,
    iterator: Option<QuestionIterator>,
    in_flight: Option<InFlight>,
    load_ticket: u64,
    next_ticket: u64,
    answered: usize,
    skipped: usize,
    started_at: DateTime<Utc>,
    disposed: bool,
}

impl SurveySession {
    /// Creates a session in `Loading`; call [`begin_load`](Self::begin_load)
    /// before fetching.
    #[must_use]
    pub fn new(survey_id: SurveyId, clock: Clock) -> Self {
        Self {
            survey_id,
            clock,
            state: SessionState::Loading,
            status: None,
            iterator: None,
            in_flight: None,
            load_ticket: 0,
            next_ticket: 1,
            answered: 0,
            skipped: 0,
            started_at: clock.now(),
            disposed: false,
        }
    }

    #[must_use]
    pub fn survey_id(&self) -> SurveyId {
        self.survey_id
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn status(&self) -> Option<&SurveyStatus> {
        self.status.as_ref()
    }

    #[must_use]
    pub fn survey(&self) -> Option<&Arc<Survey>> {
        self.iterator.as_ref().map(QuestionIterator::survey)
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.state.question()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            answered: self.answered,
            skipped: self.skipped,
            is_finished: self.is_finished(),
        }
    }

    /// Marks the session dead. Outstanding requests are discarded on return.
    pub fn dispose(&mut self) {
        if !self.disposed {
            debug!(survey_id = %self.survey_id, state = self.state.label(), "session disposed");
        }
        self.disposed = true;
        self.in_flight = None;
    }

    //
    // ─── LOADING ───────────────────────────────────────────────────────────────
    //

    /// Enters `Loading` and returns the ticket the load result must carry.
    ///
    /// A newer `begin_load` supersedes any load still outstanding.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Disposed`, `SessionError::Finished`, or
    /// `SessionError::NotActive` while an answer is being submitted.
    pub fn begin_load(&mut self) -> Result<u64, SessionError> {
        if self.disposed {
            return Err(SessionError::Disposed);
        }
        if self.is_finished() {
            return Err(SessionError::Finished);
        }
        if self.in_flight.is_some() {
            return Err(SessionError::NotActive);
        }
        self.load_ticket = self.take_ticket();
        self.set_state(SessionState::Loading);
        Ok(self.load_ticket)
    }

    /// Installs a fetched status and survey and exposes the first question.
    ///
    /// A status pointing at a question the survey lacks ends in `LoadError`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Disposed` if the session went away or the ticket
    /// was superseded, and `SessionError::Traversal` for an unusable status.
    pub fn apply_loaded(
        &mut self,
        ticket: u64,
        status: SurveyStatus,
        survey: Survey,
    ) -> Result<&SessionState, SessionError> {
        self.check_load_ticket(ticket)?;

        let survey = Arc::new(survey);
        let mut iterator = match QuestionIterator::new(survey, status.next_question_id) {
            Ok(iterator) => iterator,
            Err(err) => {
                self.set_state(SessionState::LoadError(err.to_string()));
                return Err(err.into());
            }
        };
        let first = iterator.next(None)?.cloned();

        info!(
            survey_id = %self.survey_id,
            resume_at = ?status.next_question_id,
            "survey loaded"
        );
        self.status = Some(status);
        self.iterator = Some(iterator);

        match first {
            Some(question) => self.set_state(SessionState::Active(question)),
            None => {
                let completion = self.completion();
                self.set_state(SessionState::Finished(completion));
            }
        }
        Ok(&self.state)
    }

    /// Records a failed load. The session stays in `LoadError` until the next
    /// `begin_load`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Disposed` if the session went away or the ticket
    /// was superseded.
    pub fn apply_load_error(
        &mut self,
        ticket: u64,
        message: impl Into<String>,
    ) -> Result<&SessionState, SessionError> {
        self.check_load_ticket(ticket)?;
        let message = message.into();
        warn!(survey_id = %self.survey_id, error = %message, "survey load failed");
        self.set_state(SessionState::LoadError(message));
        Ok(&self.state)
    }

    fn check_load_ticket(&self, ticket: u64) -> Result<(), SessionError> {
        if self.disposed || ticket != self.load_ticket || self.state != SessionState::Loading {
            return Err(SessionError::Disposed);
        }
        Ok(())
    }

    //
    // ─── SUBMITTING ────────────────────────────────────────────────────────────
    //

    /// Claims the single submit slot for `response`.
    ///
    /// Returns `Ok(None)` when the submit must be ignored: one is already
    /// outstanding, the response is for a question that is no longer
    /// current, or the survey is finished.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Disposed`, `SessionError::NotActive` before the
    /// survey is loaded, or `SessionError::Traversal` if the lookahead cannot
    /// be computed.
    pub fn begin_submit(
        &mut self,
        response: SurveyResponse,
    ) -> Result<Option<PendingSubmit>, SessionError> {
        if self.disposed {
            return Err(SessionError::Disposed);
        }

        let question = match &self.state {
            SessionState::Active(question) => question.clone(),
            SessionState::Submitting(_) | SessionState::Finished(_) => {
                debug!(
                    survey_id = %self.survey_id,
                    question_id = %response.question_id(),
                    state = self.state.label(),
                    "submit ignored"
                );
                return Ok(None);
            }
            SessionState::Loading | SessionState::LoadError(_) => {
                return Err(SessionError::NotActive);
            }
        };

        if response.question_id() != question.id() {
            debug!(
                survey_id = %self.survey_id,
                current = %question.id(),
                question_id = %response.question_id(),
                "stale submit ignored"
            );
            return Ok(None);
        }

        let (Some(iterator), Some(status)) = (&self.iterator, &self.status) else {
            return Err(SessionError::NotActive);
        };
        let lookahead = iterator.peek(Some(&response))?;
        let status = status.clone();

        let ticket = self.take_ticket();
        self.in_flight = Some(InFlight {
            ticket,
            response: response.clone(),
            lookahead,
        });
        self.set_state(SessionState::Submitting(question));

        Ok(Some(PendingSubmit {
            ticket,
            status,
            response,
            next_question: lookahead,
        }))
    }

    /// Applies the status returned for the submit identified by `ticket`.
    ///
    /// The returned status is authoritative: if its `next_question_id`
    /// disagrees with the local lookahead, traversal resumes where the
    /// service says.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Traversal` if the service points at a question
    /// this survey does not have. The returned status is still adopted and
    /// the question becomes `Active` again.
    pub fn complete_submit(
        &mut self,
        ticket: u64,
        status: SurveyStatus,
    ) -> Result<SubmitOutcome, SessionError> {
        if self.disposed {
            return Ok(SubmitOutcome::Discarded);
        }
        let Some(in_flight) = self.in_flight.take_if(|f| f.ticket == ticket) else {
            return Ok(SubmitOutcome::Discarded);
        };
        let next = match self.advance_cursor(&in_flight, status.next_question_id) {
            Ok(next) => next,
            Err(err) => {
                // The service did accept the answer; keep its token so a retry is not a conflict.
                self.status = Some(status);
                self.restore_active();
                return Err(err);
            }
        };

        if in_flight.response.is_skipped() {
            self.skipped += 1;
        } else {
            self.answered += 1;
        }
        self.status = Some(status);

        match next {
            Some(question) => {
                self.set_state(SessionState::Active(question.clone()));
                Ok(SubmitOutcome::Next(question))
            }
            None => {
                let completion = self.completion();
                info!(
                    survey_id = %self.survey_id,
                    answered = completion.answered,
                    skipped = completion.skipped,
                    "survey finished"
                );
                self.set_state(SessionState::Finished(completion.clone()));
                Ok(SubmitOutcome::Finished(completion))
            }
        }
    }

    /// Gives up the submit identified by `ticket` without advancing; the
    /// question it was for becomes `Active` again. Returns false if that
    /// submit was no longer outstanding.
    pub fn release(&mut self, ticket: u64) -> bool {
        if self.in_flight.take_if(|f| f.ticket == ticket).is_none() {
            return false;
        }
        self.restore_active();
        true
    }

    fn advance_cursor(
        &mut self,
        in_flight: &InFlight,
        remote_next: Option<QuestionId>,
    ) -> Result<Option<Question>, SessionError> {
        let Some(iterator) = self.iterator.as_mut() else {
            return Err(SessionError::NotActive);
        };
        if remote_next == in_flight.lookahead {
            return Ok(iterator.next(Some(&in_flight.response))?.cloned());
        }

        warn!(
            survey_id = %self.survey_id,
            local = ?in_flight.lookahead,
            remote = ?remote_next,
            "service disagrees on next question, following service"
        );
        let mut resumed = QuestionIterator::new(Arc::clone(iterator.survey()), remote_next)?;
        let next = resumed.next(None)?.cloned();
        *iterator = resumed;
        Ok(next)
    }

    fn restore_active(&mut self) {
        if let SessionState::Submitting(question) = &self.state {
            let question = question.clone();
            self.set_state(SessionState::Active(question));
        }
    }

    fn take_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    fn completion(&self) -> Completion {
        let title = match (&self.status, self.survey()) {
            (Some(status), _) => status.title.clone(),
            (None, Some(survey)) => survey.title().to_owned(),
            (None, None) => String::new(),
        };
        Completion {
            survey_id: self.survey_id,
            title,
            answered: self.answered,
            skipped: self.skipped,
            started_at: self.started_at,
            completed_at: self.clock.now(),
        }
    }

    fn set_state(&mut self, state: SessionState) {
        debug!(
            survey_id = %self.survey_id,
            from = self.state.label(),
            to = state.label(),
            question_id = ?state.question().map(Question::id),
            "session transition"
        );
        self.state = state;
    }
}

impl fmt::Debug for SurveySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurveySession")
            .field("survey_id", &self.survey_id)
            .field("state", &self.state.label())
            .field("answered", &self.answered)
            .field("skipped", &self.skipped)
            .field("submitting", &self.in_flight.is_some())
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
