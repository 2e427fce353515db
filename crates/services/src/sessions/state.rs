use chrono::{DateTime, Utc};
use survey_core::model::{Question, SurveyId};

/// What a finished session reports back to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub survey_id: SurveyId,
    pub title: String,
    pub answered: usize,
    pub skipped: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Observable state of a survey session.
///
/// ```text
/// Loading ──ok──▶ Active(q) ──submit──▶ Submitting(q) ──ok──▶ Active(q') | Finished
///    │ ▲                                     │
///    ▼ │ retry                               └──err──▶ Active(q)
/// LoadError
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Loading,
    LoadError(String),
    Active(Question),
    Submitting(Question),
    Finished(Completion),
}

impl SessionState {
    /// The question on screen, whether or not a request is outstanding.
    #[must_use]
    pub fn question(&self) -> Option<&Question> {
        match self {
            SessionState::Active(q) | SessionState::Submitting(q) => Some(q),
            SessionState::Loading | SessionState::LoadError(_) | SessionState::Finished(_) => None,
        }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionState::Loading | SessionState::Submitting(_))
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionState::Finished(_))
    }

    #[must_use]
    pub fn completion(&self) -> Option<&Completion> {
        match self {
            SessionState::Finished(completion) => Some(completion),
            _ => None,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Loading => "loading",
            SessionState::LoadError(_) => "load_error",
            SessionState::Active(_) => "active",
            SessionState::Submitting(_) => "submitting",
            SessionState::Finished(_) => "finished",
        }
    }
}
