use serde::{Deserialize, Serialize};

use crate::model::ids::{QuestionId, SurveyId, SurveyToken};

/// Per-user progress through a survey, as reported by the survey service.
///
/// `token` authorizes the next submission; `next_question_id` is where the
/// user resumes. A status without a next question means the survey is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyStatus {
    pub survey_id: SurveyId,
    pub title: String,
    pub token: SurveyToken,
    pub next_question_id: Option<QuestionId>,
}

impl SurveyStatus {
    #[must_use]
    pub fn new(
        survey_id: SurveyId,
        title: impl Into<String>,
        token: SurveyToken,
        next_question_id: Option<QuestionId>,
    ) -> Self {
        Self {
            survey_id,
            title: title.into(),
            token,
            next_question_id,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.next_question_id.is_none()
    }

    /// Status after an accepted answer: new token, new resume point.
    #[must_use]
    pub fn advanced(&self, token: SurveyToken, next_question_id: Option<QuestionId>) -> Self {
        Self {
            survey_id: self.survey_id,
            title: self.title.clone(),
            token,
            next_question_id,
        }
    }
}
