use serde::{Deserialize, Serialize};

use crate::model::ids::{AnswerId, QuestionId, SurveyToken};
use crate::model::question::QuestionType;

//
// ─── PAYLOAD ──────────────────────────────────────────────────────────────────
//

/// The single answer value carried by a non-skipped response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AnswerPayload {
    Boolean(bool),
    Choice(Vec<AnswerId>),
    Text(String),
    Checklist(Vec<String>),
    Number(f64),
}

impl AnswerPayload {
    /// Returns true when this payload is the one produced by questions of `question_type`.
    ///
    /// Range and number questions share the numeric payload.
    #[must_use]
    pub fn fits(&self, question_type: QuestionType) -> bool {
        matches!(
            (self, question_type),
            (AnswerPayload::Boolean(_), QuestionType::Boolean)
                | (AnswerPayload::Choice(_), QuestionType::Choice)
                | (AnswerPayload::Text(_), QuestionType::Text)
                | (AnswerPayload::Checklist(_), QuestionType::Checklist)
                | (AnswerPayload::Number(_), QuestionType::Range | QuestionType::Number)
        )
    }
}

//
// ─── RESPONSE ─────────────────────────────────────────────────────────────────
//

/// Either a skip or exactly one answer payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "answer", rename_all = "snake_case")]
pub enum ResponseBody {
    Skipped,
    Answered(AnswerPayload),
}

/// Answer record submitted to the survey service for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    question_id: QuestionId,
    survey_token: SurveyToken,
    body: ResponseBody,
}

impl SurveyResponse {
    #[must_use]
    pub fn answered(
        question_id: QuestionId,
        survey_token: SurveyToken,
        payload: AnswerPayload,
    ) -> Self {
        Self {
            question_id,
            survey_token,
            body: ResponseBody::Answered(payload),
        }
    }

    #[must_use]
    pub fn skipped(question_id: QuestionId, survey_token: SurveyToken) -> Self {
        Self {
            question_id,
            survey_token,
            body: ResponseBody::Skipped,
        }
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn survey_token(&self) -> &SurveyToken {
        &self.survey_token
    }

    #[must_use]
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self.body, ResponseBody::Skipped)
    }

    #[must_use]
    pub fn payload(&self) -> Option<&AnswerPayload> {
        match &self.body {
            ResponseBody::Skipped => None,
            ResponseBody::Answered(payload) => Some(payload),
        }
    }

    #[must_use]
    pub fn bool_answer(&self) -> Option<bool> {
        match self.payload() {
            Some(AnswerPayload::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn answer_ids(&self) -> Option<&[AnswerId]> {
        match self.payload() {
            Some(AnswerPayload::Choice(ids)) => Some(ids),
            _ => None,
        }
    }

    #[must_use]
    pub fn text_answer(&self) -> Option<&str> {
        match self.payload() {
            Some(AnswerPayload::Text(text)) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn checklist_answer(&self) -> Option<&[String]> {
        match self.payload() {
            Some(AnswerPayload::Checklist(items)) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn number_answer(&self) -> Option<f64> {
        match self.payload() {
            Some(AnswerPayload::Number(n)) => Some(*n),
            _ => None,
        }
    }

    /// Same question and same answer, ignoring the token.
    #[must_use]
    pub fn same_answer_as(&self, other: &SurveyResponse) -> bool {
        self.question_id == other.question_id && self.body == other.body
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_response_has_no_payload() {
        let resp = SurveyResponse::skipped(QuestionId::new(2), SurveyToken::new("tok"));
        assert!(resp.is_skipped());
        assert!(resp.payload().is_none());
        assert!(resp.bool_answer().is_none());
        assert!(resp.text_answer().is_none());
    }

    #[test]
    fn only_matching_accessor_is_populated() {
        let resp = SurveyResponse::answered(
            QuestionId::new(1),
            SurveyToken::new("tok"),
            AnswerPayload::Text("fine".into()),
        );
        assert!(!resp.is_skipped());
        assert_eq!(resp.text_answer(), Some("fine"));
        assert!(resp.bool_answer().is_none());
        assert!(resp.answer_ids().is_none());
        assert!(resp.checklist_answer().is_none());
        assert!(resp.number_answer().is_none());
    }

    #[test]
    fn numeric_payload_fits_range_and_number() {
        let payload = AnswerPayload::Number(3.0);
        assert!(payload.fits(QuestionType::Range));
        assert!(payload.fits(QuestionType::Number));
        assert!(!payload.fits(QuestionType::Text));
    }

    #[test]
    fn same_answer_ignores_token() {
        let a = SurveyResponse::answered(
            QuestionId::new(1),
            SurveyToken::new("a"),
            AnswerPayload::Boolean(true),
        );
        let b = SurveyResponse::answered(
            QuestionId::new(1),
            SurveyToken::new("b"),
            AnswerPayload::Boolean(true),
        );
        assert!(a.same_answer_as(&b));
        assert_ne!(a, b);
    }
}
