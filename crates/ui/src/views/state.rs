use dioxus::prelude::*;
use services::SessionError;
use survey_core::AnswerError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewError {
    /// Required question submitted without a selection.
    NoAnswer,
    TooLong { max: usize },
    NotOptional,
    InvalidAnswer(String),
    LoadFailed,
    SubmitFailed,
    Unknown,
}

impl ViewError {
    /// Maps errors from submit and skip. Load failures are mapped by the caller.
    #[must_use]
    pub fn from_session(err: &SessionError) -> Self {
        match err {
            SessionError::Answer(AnswerError::NoAnswer) => ViewError::NoAnswer,
            SessionError::Answer(AnswerError::AnswerTooLarge { max, .. }) => {
                ViewError::TooLong { max: *max }
            }
            SessionError::Answer(AnswerError::NotOptional) => ViewError::NotOptional,
            SessionError::Answer(other) => ViewError::InvalidAnswer(other.to_string()),
            SessionError::Storage(_) => ViewError::SubmitFailed,
            _ => ViewError::Unknown,
        }
    }

    #[must_use]
    pub fn message(&self) -> String {
        match self {
            ViewError::NoAnswer => "Please answer this question.".into(),
            ViewError::TooLong { max } => format!("Please keep it to {max} characters."),
            ViewError::NotOptional => "This question cannot be skipped.".into(),
            ViewError::InvalidAnswer(reason) => format!("That answer doesn't work: {reason}."),
            ViewError::LoadFailed => "Couldn't load the survey.".into(),
            ViewError::SubmitFailed => "Couldn't send your answer.".into(),
            ViewError::Unknown => "Something went wrong. Please try again.".into(),
        }
    }

    /// Network-side failures; the same action can simply be repeated.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ViewError::LoadFailed | ViewError::SubmitFailed)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ViewState<T> {
    Idle,
    Loading,
    Ready(T),
    Error(ViewError),
}

#[must_use]
pub fn view_state_from_resource<T: Clone>(
    resource: &Resource<Result<T, ViewError>>,
) -> ViewState<T> {
    match resource.state().cloned() {
        UseResourceState::Pending => ViewState::Loading,
        UseResourceState::Ready => match resource.value().read().as_ref() {
            Some(Ok(data)) => ViewState::Ready(data.clone()),
            Some(Err(err)) => ViewState::Error(err.clone()),
            None => ViewState::Error(ViewError::Unknown),
        },
        UseResourceState::Paused | UseResourceState::Stopped => ViewState::Idle,
    }
}
