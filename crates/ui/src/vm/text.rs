//! Plain-text rendering of the view models, for terminal front ends.

use std::fmt::Write as _;

use crate::vm::completion_vm::CompletionVm;
use crate::vm::question_vm::{OptionVm, QuestionVm, WidgetVm};

#[must_use]
pub fn render_question(question: &QuestionVm) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", question.prompt);
    match &question.widget {
        WidgetVm::Boolean { value } => {
            let mark = |on: bool| if *value == Some(on) { "*" } else { " " };
            let _ = writeln!(out, "  [{}] y) Yes   [{}] n) No", mark(true), mark(false));
        }
        WidgetVm::Choice { multiple, options } => {
            render_options(&mut out, options);
            let hint = if *multiple {
                "Enter one or more numbers, separated by commas."
            } else {
                "Enter a number."
            };
            let _ = writeln!(out, "  {hint}");
        }
        WidgetVm::Text {
            length, max_length, ..
        } => {
            let _ = writeln!(out, "  Up to {max_length} characters ({length} typed).");
        }
        WidgetVm::Checklist { items } => {
            render_options(&mut out, items);
            let _ = writeln!(out, "  Enter the numbers of all that apply, separated by commas.");
        }
        WidgetVm::Range {
            min, max, step, ..
        } => {
            let _ = writeln!(out, "  A number from {min} to {max} (step {step}).");
        }
        WidgetVm::Number { min, max, .. } => {
            let bounds = match (min, max) {
                (Some(min), Some(max)) => format!("from {min} to {max}"),
                (Some(min), None) => format!("of at least {min}"),
                (None, Some(max)) => format!("of at most {max}"),
                (None, None) => "of any size".to_owned(),
            };
            let _ = writeln!(out, "  A number {bounds}.");
        }
    }
    if question.optional {
        let _ = writeln!(out, "  (optional: enter :skip to skip)");
    }
    out
}

fn render_options(out: &mut String, options: &[OptionVm]) {
    for option in options {
        let mark = if option.selected { "x" } else { " " };
        let _ = writeln!(out, "  [{mark}] {}) {}", option.index + 1, option.label);
    }
}

#[must_use]
pub fn render_completion(completion: &CompletionVm) -> String {
    format!(
        "Thank you! \"{}\" is complete: {} answered, {} skipped, took {}.",
        completion.title, completion.answered, completion.skipped, completion.duration_str
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_core::model::QuestionId;

    #[test]
    fn checklist_lists_items_one_based() {
        let question = QuestionVm {
            id: QuestionId::new(2),
            prompt: "Symptoms?".into(),
            optional: false,
            widget: WidgetVm::Checklist {
                items: vec![
                    OptionVm {
                        index: 0,
                        label: "cough".into(),
                        selected: true,
                    },
                    OptionVm {
                        index: 1,
                        label: "fever".into(),
                        selected: false,
                    },
                ],
            },
        };
        let text = render_question(&question);
        assert!(text.starts_with("Symptoms?\n"));
        assert!(text.contains("[x] 1) cough"));
        assert!(text.contains("[ ] 2) fever"));
        assert!(!text.contains(":skip"));
    }

    #[test]
    fn optional_questions_mention_skip() {
        let question = QuestionVm {
            id: QuestionId::new(6),
            prompt: "Anything else?".into(),
            optional: true,
            widget: WidgetVm::Text {
                value: String::new(),
                length: 0,
                max_length: 140,
            },
        };
        let text = render_question(&question);
        assert!(text.contains("Up to 140 characters"));
        assert!(text.contains(":skip"));
    }
}
