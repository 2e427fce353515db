use services::Completion;
use survey_core::model::SurveyId;

use crate::vm::time_fmt::{format_datetime, format_duration};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionVm {
    pub survey_id: SurveyId,
    pub title: String,
    pub answered: usize,
    pub skipped: usize,
    pub started_at_str: String,
    pub completed_at_str: String,
    pub duration_str: String,
}

impl From<&Completion> for CompletionVm {
    fn from(completion: &Completion) -> Self {
        Self {
            survey_id: completion.survey_id,
            title: completion.title.clone(),
            answered: completion.answered,
            skipped: completion.skipped,
            started_at_str: format_datetime(completion.started_at),
            completed_at_str: format_datetime(completion.completed_at),
            duration_str: format_duration(completion.completed_at - completion.started_at),
        }
    }
}

#[must_use]
pub fn map_completion(completion: &Completion) -> CompletionVm {
    CompletionVm::from(completion)
}
