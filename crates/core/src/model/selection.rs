use std::collections::BTreeSet;

use crate::model::question::{QuestionKind, QuestionType};

/// Raw, unvalidated widget state collected by the presentation layer.
///
/// Each variant mirrors what the matching widget can express: a tri-state
/// toggle, a set of ticked option indices, a possibly-absent text field, a list
/// of checked items, a possibly-absent number.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Boolean(Option<bool>),
    Choice(BTreeSet<usize>),
    Text(Option<String>),
    Checklist(Vec<String>),
    Number(Option<f64>),
}

impl Selection {
    /// Initial (nothing selected) state for a question kind.
    #[must_use]
    pub fn empty_for(kind: &QuestionKind) -> Self {
        match kind {
            QuestionKind::Boolean => Selection::Boolean(None),
            QuestionKind::Choice { .. } => Selection::Choice(BTreeSet::new()),
            QuestionKind::Text { .. } => Selection::Text(None),
            QuestionKind::Checklist { .. } => Selection::Checklist(Vec::new()),
            QuestionKind::Range { .. } | QuestionKind::Number { .. } => Selection::Number(None),
        }
    }

    /// Widget family this state belongs to. Range and number share `Number`.
    #[must_use]
    pub fn widget_type(&self) -> QuestionType {
        match self {
            Selection::Boolean(_) => QuestionType::Boolean,
            Selection::Choice(_) => QuestionType::Choice,
            Selection::Text(_) => QuestionType::Text,
            Selection::Checklist(_) => QuestionType::Checklist,
            Selection::Number(_) => QuestionType::Number,
        }
    }

    /// Whether this state can be validated against a question of `question_type`.
    #[must_use]
    pub fn fits(&self, question_type: QuestionType) -> bool {
        matches!(
            (self, question_type),
            (Selection::Boolean(_), QuestionType::Boolean)
                | (Selection::Choice(_), QuestionType::Choice)
                | (Selection::Text(_), QuestionType::Text)
                | (Selection::Checklist(_), QuestionType::Checklist)
                | (Selection::Number(_), QuestionType::Range | QuestionType::Number)
        )
    }

    /// True when the widget holds nothing the user entered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Selection::Boolean(value) => value.is_none(),
            Selection::Choice(indices) => indices.is_empty(),
            Selection::Text(text) => text.as_deref().is_none_or(|t| t.trim().is_empty()),
            Selection::Checklist(items) => items.is_empty(),
            Selection::Number(value) => value.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_matches_kind() {
        let range = QuestionKind::Range {
            min: 0.0,
            max: 10.0,
            step: 1.0,
        };
        let sel = Selection::empty_for(&range);
        assert_eq!(sel, Selection::Number(None));
        assert!(sel.fits(QuestionType::Range));
        assert!(sel.is_empty());
    }

    #[test]
    fn blank_text_counts_as_empty() {
        assert!(Selection::Text(Some("   ".into())).is_empty());
        assert!(!Selection::Text(Some("ok".into())).is_empty());
    }
}
