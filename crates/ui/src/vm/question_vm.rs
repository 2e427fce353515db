use survey_core::model::{Question, QuestionId, QuestionKind, Selection};

/// One tickable entry of a choice or checklist widget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionVm {
    pub index: usize,
    pub label: String,
    pub selected: bool,
}

/// Widget state ready for rendering; mirrors `QuestionKind` one to one.
#[derive(Clone, Debug, PartialEq)]
pub enum WidgetVm {
    Boolean {
        value: Option<bool>,
    },
    Choice {
        multiple: bool,
        options: Vec<OptionVm>,
    },
    Text {
        value: String,
        length: usize,
        max_length: usize,
    },
    Checklist {
        items: Vec<OptionVm>,
    },
    Range {
        min: f64,
        max: f64,
        step: f64,
        value: Option<f64>,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
        input: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct QuestionVm {
    pub id: QuestionId,
    pub prompt: String,
    pub optional: bool,
    pub widget: WidgetVm,
}

impl QuestionVm {
    /// Text questions over their limit; the view highlights the counter.
    #[must_use]
    pub fn is_over_limit(&self) -> bool {
        matches!(self.widget, WidgetVm::Text { length, max_length, .. } if length > max_length)
    }
}

/// Maps a question and the selection being edited for it.
///
/// `number_input` is the raw text of number fields, kept so a half-typed
/// value is not lost between renders.
#[must_use]
pub fn map_question(question: &Question, selection: &Selection, number_input: &str) -> QuestionVm {
    let widget = match (question.kind(), selection) {
        (QuestionKind::Boolean, Selection::Boolean(value)) => WidgetVm::Boolean { value: *value },
        (QuestionKind::Choice { answers, multiple }, Selection::Choice(picked)) => {
            WidgetVm::Choice {
                multiple: *multiple,
                options: answers
                    .iter()
                    .enumerate()
                    .map(|(index, answer)| OptionVm {
                        index,
                        label: answer.label.clone(),
                        selected: picked.contains(&index),
                    })
                    .collect(),
            }
        }
        (QuestionKind::Text { max_length }, Selection::Text(text)) => {
            let value = text.clone().unwrap_or_default();
            WidgetVm::Text {
                length: value.chars().count(),
                value,
                max_length: *max_length,
            }
        }
        (QuestionKind::Checklist { items }, Selection::Checklist(checked)) => WidgetVm::Checklist {
            items: items
                .iter()
                .enumerate()
                .map(|(index, item)| OptionVm {
                    index,
                    label: item.clone(),
                    selected: checked.contains(item),
                })
                .collect(),
        },
        (QuestionKind::Range { min, max, step }, Selection::Number(value)) => WidgetVm::Range {
            min: *min,
            max: *max,
            step: *step,
            value: value.filter(|v| v.is_finite()),
        },
        (QuestionKind::Number { min, max }, Selection::Number(_)) => WidgetVm::Number {
            min: *min,
            max: *max,
            input: number_input.to_owned(),
        },
        // Selection left over from another question; render the empty widget.
        (kind, _) => return map_question(question, &Selection::empty_for(kind), number_input),
    };

    QuestionVm {
        id: question.id(),
        prompt: question.prompt().to_owned(),
        optional: question.is_optional(),
        widget,
    }
}
