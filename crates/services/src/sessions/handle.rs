use std::sync::{Arc, Mutex, MutexGuard};

use survey_core::Clock;
use survey_core::model::SurveyId;

use super::progress::SessionProgress;
use super::service::SurveySession;
use super::state::SessionState;
use crate::error::SessionError;

/// Shared handle to one survey session.
///
/// The inner lock is only taken for short synchronous steps and never across
/// an `.await`.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    inner: Arc<Mutex<SurveySession>>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(survey_id: SurveyId, clock: Clock) -> Self {
        Self::from_session(SurveySession::new(survey_id, clock))
    }

    #[must_use]
    pub fn from_session(session: SurveySession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Runs `f` with the session locked.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Poisoned` if a previous holder panicked.
    pub fn with<R>(&self, f: impl FnOnce(&mut SurveySession) -> R) -> Result<R, SessionError> {
        let mut guard = self.lock()?;
        Ok(f(&mut *guard))
    }

    /// Snapshot of the current state.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Poisoned` if a previous holder panicked.
    pub fn state(&self) -> Result<SessionState, SessionError> {
        self.with(|session| session.state().clone())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Poisoned` if a previous holder panicked.
    pub fn progress(&self) -> Result<SessionProgress, SessionError> {
        self.with(|session| session.progress())
    }

    /// Disposes the session; outstanding requests are discarded when they return.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Poisoned` if a previous holder panicked.
    pub fn dispose(&self) -> Result<(), SessionError> {
        self.with(SurveySession::dispose)
    }

    fn lock(&self) -> Result<MutexGuard<'_, SurveySession>, SessionError> {
        self.inner.lock().map_err(|_| SessionError::Poisoned)
    }
}

/// Holds the submit slot for one outstanding request.
///
/// If the submitting future is dropped before the request resolves, the slot
/// is released and the question becomes answerable again.
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    handle: SessionHandle,
    ticket: u64,
    armed: bool,
}

impl InFlightGuard {
    pub(crate) fn new(handle: SessionHandle, ticket: u64) -> Self {
        Self {
            handle,
            ticket,
            armed: true,
        }
    }

    pub(crate) fn ticket(&self) -> u64 {
        self.ticket
    }

    /// The request resolved and its result has been applied.
    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.armed {
            let ticket = self.ticket;
            let _ = self.handle.with(|session| session.release(ticket));
        }
    }
}
