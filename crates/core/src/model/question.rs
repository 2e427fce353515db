use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::model::branch::Branch;
use crate::model::ids::{AnswerId, QuestionId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Structural problems with a single question definition.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuestionError {
    #[error("question text is empty")]
    EmptyText,

    #[error("choice question has no answers")]
    NoChoices,

    #[error("duplicate choice answer id {0}")]
    DuplicateAnswer(AnswerId),

    #[error("checklist question has no items")]
    NoChecklistItems,

    #[error("text question max length must be positive")]
    ZeroLength,

    #[error("invalid numeric bounds: min {min} > max {max}")]
    InvalidBounds { min: f64, max: f64 },

    #[error("range step must be positive, got {0}")]
    InvalidStep(f64),
}

//
// ─── CHOICE ANSWER ────────────────────────────────────────────────────────────
//

/// One selectable option of a choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub label: String,
}

impl Answer {
    #[must_use]
    pub fn new(id: AnswerId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

//
// ─── QUESTION KIND ────────────────────────────────────────────────────────────
//

/// Kind-specific shape of a question.
///
/// Every consumer matches exhaustively on this enum, so adding a kind is a
/// compile-time checked change across validation, rendering and storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    /// Yes / no.
    Boolean,
    /// Pick one (or several when `multiple`) of the listed answers.
    Choice {
        answers: Vec<Answer>,
        #[serde(default)]
        multiple: bool,
    },
    /// Free text, at most `max_length` characters.
    Text { max_length: usize },
    /// Tick any number of free-form items.
    Checklist { items: Vec<String> },
    /// Slider between `min` and `max` in increments of `step`.
    Range { min: f64, max: f64, step: f64 },
    /// Free numeric input, optionally bounded.
    Number {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
}

/// Field-less discriminant of [`QuestionKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Boolean,
    Choice,
    Text,
    Checklist,
    Range,
    Number,
}

impl QuestionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Boolean => "boolean",
            QuestionType::Choice => "choice",
            QuestionType::Text => "text",
            QuestionType::Checklist => "checklist",
            QuestionType::Range => "range",
            QuestionType::Number => "number",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl QuestionKind {
    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::Boolean => QuestionType::Boolean,
            QuestionKind::Choice { .. } => QuestionType::Choice,
            QuestionKind::Text { .. } => QuestionType::Text,
            QuestionKind::Checklist { .. } => QuestionType::Checklist,
            QuestionKind::Range { .. } => QuestionType::Range,
            QuestionKind::Number { .. } => QuestionType::Number,
        }
    }

    /// Checks the kind-specific invariants.
    ///
    /// # Errors
    ///
    /// Returns the first `QuestionError` found.
    pub fn validate(&self) -> Result<(), QuestionError> {
        match self {
            QuestionKind::Boolean => Ok(()),
            QuestionKind::Choice { answers, .. } => {
                if answers.is_empty() {
                    return Err(QuestionError::NoChoices);
                }
                let mut seen = HashSet::with_capacity(answers.len());
                for answer in answers {
                    if !seen.insert(answer.id) {
                        return Err(QuestionError::DuplicateAnswer(answer.id));
                    }
                }
                Ok(())
            }
            QuestionKind::Text { max_length } => {
                if *max_length == 0 {
                    return Err(QuestionError::ZeroLength);
                }
                Ok(())
            }
            QuestionKind::Checklist { items } => {
                if items.is_empty() {
                    return Err(QuestionError::NoChecklistItems);
                }
                Ok(())
            }
            QuestionKind::Range { min, max, step } => {
                if !(min <= max) {
                    return Err(QuestionError::InvalidBounds {
                        min: *min,
                        max: *max,
                    });
                }
                if !(*step > 0.0) || !step.is_finite() {
                    return Err(QuestionError::InvalidStep(*step));
                }
                Ok(())
            }
            QuestionKind::Number { min, max } => match (min, max) {
                (Some(min), Some(max)) if !(min <= max) => Err(QuestionError::InvalidBounds {
                    min: *min,
                    max: *max,
                }),
                _ => Ok(()),
            },
        }
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A single survey question plus the pointers used to traverse past it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    #[serde(default)]
    optional: bool,
    kind: QuestionKind,
    #[serde(default)]
    next: Option<QuestionId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    branches: Vec<Branch>,
}

impl Question {
    #[must_use]
    pub fn new(id: QuestionId, text: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            id,
            text: text.into(),
            optional: false,
            kind,
            next: None,
            branches: Vec::new(),
        }
    }

    #[must_use]
    pub fn boolean(id: QuestionId, text: impl Into<String>) -> Self {
        Self::new(id, text, QuestionKind::Boolean)
    }

    #[must_use]
    pub fn text(id: QuestionId, text: impl Into<String>, max_length: usize) -> Self {
        Self::new(id, text, QuestionKind::Text { max_length })
    }

    #[must_use]
    pub fn choice(id: QuestionId, text: impl Into<String>, answers: Vec<Answer>) -> Self {
        Self::new(
            id,
            text,
            QuestionKind::Choice {
                answers,
                multiple: false,
            },
        )
    }

    #[must_use]
    pub fn multi_choice(id: QuestionId, text: impl Into<String>, answers: Vec<Answer>) -> Self {
        Self::new(
            id,
            text,
            QuestionKind::Choice {
                answers,
                multiple: true,
            },
        )
    }

    #[must_use]
    pub fn checklist(id: QuestionId, text: impl Into<String>, items: Vec<String>) -> Self {
        Self::new(id, text, QuestionKind::Checklist { items })
    }

    #[must_use]
    pub fn range(id: QuestionId, text: impl Into<String>, min: f64, max: f64, step: f64) -> Self {
        Self::new(id, text, QuestionKind::Range { min, max, step })
    }

    #[must_use]
    pub fn number(
        id: QuestionId,
        text: impl Into<String>,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Self {
        Self::new(id, text, QuestionKind::Number { min, max })
    }

    /// Marks the question as skippable.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn with_next(mut self, next: QuestionId) -> Self {
        self.next = Some(next);
        self
    }

    #[must_use]
    pub fn with_branch(mut self, branch: Branch) -> Self {
        self.branches.push(branch);
        self
    }

    pub(crate) fn set_next(&mut self, next: Option<QuestionId>) {
        self.next = next;
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    #[must_use]
    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    #[must_use]
    pub fn next(&self) -> Option<QuestionId> {
        self.next
    }

    #[must_use]
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Every question id this question can hand over to.
    pub fn successors(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.branches
            .iter()
            .filter_map(Branch::target_question)
            .chain(self.next)
    }

    /// Validates text and kind-specific invariants.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` describing the first violation.
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        self.kind.validate()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::branch::{Condition, Target};

    #[test]
    fn choice_without_answers_is_rejected() {
        let q = Question::choice(QuestionId::new(1), "Pick", Vec::new());
        assert_eq!(q.validate().unwrap_err(), QuestionError::NoChoices);
    }

    #[test]
    fn duplicate_answer_ids_are_rejected() {
        let q = Question::choice(
            QuestionId::new(1),
            "Pick",
            vec![
                Answer::new(AnswerId::new(1), "a"),
                Answer::new(AnswerId::new(1), "b"),
            ],
        );
        assert_eq!(
            q.validate().unwrap_err(),
            QuestionError::DuplicateAnswer(AnswerId::new(1))
        );
    }

    #[test]
    fn range_requires_positive_step() {
        let q = Question::range(QuestionId::new(1), "How much?", 0.0, 10.0, 0.0);
        assert!(matches!(q.validate(), Err(QuestionError::InvalidStep(_))));
    }

    #[test]
    fn inverted_number_bounds_are_rejected() {
        let q = Question::number(QuestionId::new(1), "Age", Some(10.0), Some(1.0));
        assert!(matches!(
            q.validate(),
            Err(QuestionError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn blank_text_is_rejected() {
        let q = Question::boolean(QuestionId::new(1), "   ");
        assert_eq!(q.validate().unwrap_err(), QuestionError::EmptyText);
    }

    #[test]
    fn successors_list_branches_before_next() {
        let q = Question::boolean(QuestionId::new(1), "Vaccinated?")
            .with_branch(Branch::new(
                Condition::equals(false),
                Target::Question(QuestionId::new(5)),
            ))
            .with_branch(Branch::new(Condition::Skipped, Target::End))
            .with_next(QuestionId::new(2));

        let succ: Vec<_> = q.successors().collect();
        assert_eq!(succ, vec![QuestionId::new(5), QuestionId::new(2)]);
    }

    #[test]
    fn kind_deserializes_from_tagged_json() {
        let kind: QuestionKind =
            serde_json::from_str(r#"{"type":"text","max_length":10}"#).unwrap();
        assert_eq!(kind, QuestionKind::Text { max_length: 10 });
        assert_eq!(kind.question_type(), QuestionType::Text);
    }
}
