use thiserror::Error;

use crate::answer::AnswerError;
use crate::iterator::TraversalError;
use crate::model::SurveyError;

/// Umbrella error for callers that drive the whole core API.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Survey(#[from] SurveyError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Traversal(#[from] TraversalError),
}
