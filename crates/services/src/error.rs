//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use survey_core::{AnswerError, TraversalError};

/// Errors emitted by `HttpSurveyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HttpServiceError {
    #[error("survey API is not configured (set SURVEY_API_BASE_URL)")]
    Disabled,
    #[error("survey API request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("survey API returned an invalid body: {0}")]
    InvalidBody(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl From<HttpServiceError> for StorageError {
    fn from(err: HttpServiceError) -> Self {
        match err {
            HttpServiceError::HttpStatus(status) if status == reqwest::StatusCode::NOT_FOUND => {
                StorageError::NotFound
            }
            HttpServiceError::HttpStatus(status) if status == reqwest::StatusCode::CONFLICT => {
                StorageError::Conflict
            }
            HttpServiceError::InvalidBody(msg) => StorageError::Serialization(msg),
            HttpServiceError::Http(e) if e.is_decode() => StorageError::Serialization(e.to_string()),
            other => StorageError::Connection(other.to_string()),
        }
    }
}

/// Errors emitted by survey sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no question is waiting for an answer")]
    NotActive,
    #[error("survey already finished")]
    Finished,
    #[error("session was disposed")]
    Disposed,
    #[error("session state lock poisoned")]
    Poisoned,
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Traversal(#[from] TraversalError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    /// Local validation problems: re-prompt, nothing was sent.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, SessionError::Answer(_))
    }

    /// Failures a user can retry by repeating the same action.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::Storage(StorageError::Connection(_) | StorageError::Serialization(_))
        )
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Http(#[from] HttpServiceError),
}
