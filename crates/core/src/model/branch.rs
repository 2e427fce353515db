use serde::{Deserialize, Serialize};

use crate::model::ids::{AnswerId, QuestionId};
use crate::model::response::{AnswerPayload, SurveyResponse};

/// Predicate over the answer given to the question that owns the branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum Condition {
    /// Boolean answer equals the value.
    Equals { value: bool },
    /// Choice answer contains the answer id.
    Selected { answer: AnswerId },
    /// Checklist answer contains the item.
    Checked { item: String },
    /// Numeric answer lies in `min..=max`.
    NumberBetween { min: f64, max: f64 },
    /// The question was skipped.
    Skipped,
}

impl Condition {
    #[must_use]
    pub fn equals(value: bool) -> Self {
        Condition::Equals { value }
    }

    #[must_use]
    pub fn selected(answer: AnswerId) -> Self {
        Condition::Selected { answer }
    }

    #[must_use]
    pub fn matches(&self, response: &SurveyResponse) -> bool {
        match (self, response.payload()) {
            (Condition::Skipped, None) => true,
            (Condition::Skipped, Some(_)) | (_, None) => false,
            (Condition::Equals { value }, Some(AnswerPayload::Boolean(answer))) => answer == value,
            (Condition::Selected { answer }, Some(AnswerPayload::Choice(ids))) => {
                ids.contains(answer)
            }
            (Condition::Checked { item }, Some(AnswerPayload::Checklist(items))) => {
                items.iter().any(|checked| checked == item)
            }
            (Condition::NumberBetween { min, max }, Some(AnswerPayload::Number(n))) => {
                *min <= *n && *n <= *max
            }
            _ => false,
        }
    }
}

/// Where traversal continues when a branch matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "goto", content = "id", rename_all = "snake_case")]
pub enum Target {
    Question(QuestionId),
    End,
}

/// Conditional jump evaluated after the owning question is answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub condition: Condition,
    pub target: Target,
}

impl Branch {
    #[must_use]
    pub fn new(condition: Condition, target: Target) -> Self {
        Self { condition, target }
    }

    #[must_use]
    pub fn target_question(&self) -> Option<QuestionId> {
        match self.target {
            Target::Question(id) => Some(id),
            Target::End => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::SurveyToken;

    fn answered(payload: AnswerPayload) -> SurveyResponse {
        SurveyResponse::answered(QuestionId::new(1), SurveyToken::new("t"), payload)
    }

    #[test]
    fn equals_matches_only_same_boolean() {
        let cond = Condition::equals(true);
        assert!(cond.matches(&answered(AnswerPayload::Boolean(true))));
        assert!(!cond.matches(&answered(AnswerPayload::Boolean(false))));
    }

    #[test]
    fn selected_matches_any_chosen_answer() {
        let cond = Condition::selected(AnswerId::new(3));
        let resp = answered(AnswerPayload::Choice(vec![AnswerId::new(1), AnswerId::new(3)]));
        assert!(cond.matches(&resp));
    }

    #[test]
    fn number_between_is_inclusive() {
        let cond = Condition::NumberBetween { min: 1.0, max: 5.0 };
        assert!(cond.matches(&answered(AnswerPayload::Number(5.0))));
        assert!(!cond.matches(&answered(AnswerPayload::Number(5.5))));
    }

    #[test]
    fn skipped_matches_only_skips() {
        let skip = SurveyResponse::skipped(QuestionId::new(1), SurveyToken::new("t"));
        assert!(Condition::Skipped.matches(&skip));
        assert!(!Condition::equals(true).matches(&skip));
        assert!(!Condition::Skipped.matches(&answered(AnswerPayload::Boolean(true))));
    }

    #[test]
    fn mismatched_payload_never_matches() {
        let cond = Condition::Checked {
            item: "mask".into(),
        };
        assert!(!cond.matches(&answered(AnswerPayload::Text("mask".into()))));
    }
}
