use std::collections::HashSet;

use thiserror::Error;

use crate::model::{
    AnswerPayload, Question, QuestionKind, QuestionType, Selection, SurveyResponse, SurveyToken,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Why a selection could not be turned into a response.
///
/// All variants are local to the current question: the caller re-prompts and
/// the session does not move.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("no answer given")]
    NoAnswer,

    #[error("answer is too long: {len} characters, at most {max} allowed")]
    AnswerTooLarge { len: usize, max: usize },

    #[error("{found} selection given for a {expected} question")]
    KindMismatch {
        expected: QuestionType,
        found: QuestionType,
    },

    #[error("choice index {index} does not exist")]
    InvalidChoice { index: usize },

    #[error("only one answer may be selected")]
    TooManyChoices,

    #[error("checklist item {0:?} is not offered by this question")]
    UnknownChecklistItem(String),

    #[error("value {value} is outside {min}..={max}")]
    OutOfRange { value: f64, min: f64, max: f64 },

    #[error("question is not optional and cannot be skipped")]
    NotOptional,

    #[error("value is not a finite number")]
    NotANumber,
}

//
// ─── BUILDER ───────────────────────────────────────────────────────────────────
//

/// Converts raw selection state into validated `SurveyResponse`s.
///
/// Every response produced here is stamped with the token passed in, which the
/// caller takes from the current `SurveyStatus`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerBuilder;

impl AnswerBuilder {
    /// Validates `selection` against `question` and builds an answered response.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::NoAnswer` when nothing was entered, or the
    /// kind-specific error describing why the entry is not acceptable.
    pub fn build(
        question: &Question,
        selection: &Selection,
        token: &SurveyToken,
    ) -> Result<SurveyResponse, AnswerError> {
        let payload = Self::payload(question.kind(), selection)?;
        Ok(SurveyResponse::answered(
            question.id(),
            token.clone(),
            payload,
        ))
    }

    /// Builds a skip for `question`.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::NotOptional` for required questions.
    pub fn skip(question: &Question, token: &SurveyToken) -> Result<SurveyResponse, AnswerError> {
        if !question.is_optional() {
            return Err(AnswerError::NotOptional);
        }
        Ok(SurveyResponse::skipped(question.id(), token.clone()))
    }

    fn payload(kind: &QuestionKind, selection: &Selection) -> Result<AnswerPayload, AnswerError> {
        let mismatch = || AnswerError::KindMismatch {
            expected: kind.question_type(),
            found: selection.widget_type(),
        };

        match kind {
            QuestionKind::Boolean => match selection {
                Selection::Boolean(Some(value)) => Ok(AnswerPayload::Boolean(*value)),
                Selection::Boolean(None) => Err(AnswerError::NoAnswer),
                _ => Err(mismatch()),
            },

            QuestionKind::Choice { answers, multiple } => {
                let Selection::Choice(indices) = selection else {
                    return Err(mismatch());
                };
                if indices.is_empty() {
                    return Err(AnswerError::NoAnswer);
                }
                if !*multiple && indices.len() > 1 {
                    return Err(AnswerError::TooManyChoices);
                }
                let ids = indices
                    .iter()
                    .map(|&index| {
                        answers
                            .get(index)
                            .map(|answer| answer.id)
                            .ok_or(AnswerError::InvalidChoice { index })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(AnswerPayload::Choice(ids))
            }

            QuestionKind::Text { max_length } => {
                let Selection::Text(text) = selection else {
                    return Err(mismatch());
                };
                let text = match text.as_deref() {
                    Some(t) if !t.trim().is_empty() => t,
                    _ => return Err(AnswerError::NoAnswer),
                };
                let len = text.chars().count();
                if len > *max_length {
                    return Err(AnswerError::AnswerTooLarge {
                        len,
                        max: *max_length,
                    });
                }
                Ok(AnswerPayload::Text(text.to_owned()))
            }

            QuestionKind::Checklist { items } => {
                let Selection::Checklist(checked) = selection else {
                    return Err(mismatch());
                };
                if checked.is_empty() {
                    return Err(AnswerError::NoAnswer);
                }
                let mut seen = HashSet::with_capacity(checked.len());
                let mut picked = Vec::with_capacity(checked.len());
                for item in checked {
                    if !items.contains(item) {
                        return Err(AnswerError::UnknownChecklistItem(item.clone()));
                    }
                    if seen.insert(item.as_str()) {
                        picked.push(item.clone());
                    }
                }
                Ok(AnswerPayload::Checklist(picked))
            }

            QuestionKind::Range { min, max, .. } => {
                let value = Self::number(selection, mismatch)?;
                Self::within(value, Some(*min), Some(*max))?;
                Ok(AnswerPayload::Number(value))
            }

            QuestionKind::Number { min, max } => {
                let value = Self::number(selection, mismatch)?;
                Self::within(value, *min, *max)?;
                Ok(AnswerPayload::Number(value))
            }
        }
    }

    fn number(
        selection: &Selection,
        mismatch: impl FnOnce() -> AnswerError,
    ) -> Result<f64, AnswerError> {
        match selection {
            Selection::Number(Some(value)) if value.is_finite() => Ok(*value),
            Selection::Number(Some(_)) => Err(AnswerError::NotANumber),
            Selection::Number(None) => Err(AnswerError::NoAnswer),
            _ => Err(mismatch()),
        }
    }

    fn within(value: f64, min: Option<f64>, max: Option<f64>) -> Result<(), AnswerError> {
        let below = min.is_some_and(|min| value < min);
        let above = max.is_some_and(|max| value > max);
        if below || above {
            return Err(AnswerError::OutOfRange {
                value,
                min: min.unwrap_or(f64::NEG_INFINITY),
                max: max.unwrap_or(f64::INFINITY),
            });
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::model::{Answer, AnswerId, QuestionId};

    fn token() -> SurveyToken {
        SurveyToken::new("tok-1")
    }

    fn colors() -> Question {
        Question::choice(
            QuestionId::new(2),
            "Favourite color?",
            vec![
                Answer::new(AnswerId::new(10), "red"),
                Answer::new(AnswerId::new(11), "green"),
                Answer::new(AnswerId::new(12), "blue"),
            ],
        )
    }

    #[test]
    fn every_kind_without_selection_is_no_answer() {
        let questions = [
            Question::boolean(QuestionId::new(1), "Vaccinated?"),
            colors(),
            Question::checklist(QuestionId::new(3), "Symptoms", vec!["cough".into()]),
            Question::range(QuestionId::new(4), "Pain", 0.0, 10.0, 1.0),
            Question::number(QuestionId::new(5), "Age", None, None),
            Question::text(QuestionId::new(6), "Comments", 10),
        ];
        for question in &questions {
            let empty = Selection::empty_for(question.kind());
            assert_eq!(
                AnswerBuilder::build(question, &empty, &token()),
                Err(AnswerError::NoAnswer),
                "{}",
                question.question_type()
            );
        }
    }

    #[test]
    fn boolean_answer_is_stamped_with_token() {
        let q = Question::boolean(QuestionId::new(1), "Vaccinated?");
        let resp = AnswerBuilder::build(&q, &Selection::Boolean(Some(true)), &token()).unwrap();
        assert_eq!(resp.question_id(), QuestionId::new(1));
        assert_eq!(resp.survey_token(), &token());
        assert!(!resp.is_skipped());
        assert_eq!(resp.bool_answer(), Some(true));
    }

    #[test]
    fn choice_maps_indices_to_answer_ids() {
        let q = Question::multi_choice(
            QuestionId::new(2),
            "Colors",
            vec![
                Answer::new(AnswerId::new(10), "red"),
                Answer::new(AnswerId::new(11), "green"),
                Answer::new(AnswerId::new(12), "blue"),
            ],
        );
        let sel = Selection::Choice(BTreeSet::from([2, 0]));
        let resp = AnswerBuilder::build(&q, &sel, &token()).unwrap();
        assert_eq!(
            resp.answer_ids(),
            Some(&[AnswerId::new(10), AnswerId::new(12)][..])
        );
    }

    #[test]
    fn single_choice_rejects_several_indices() {
        let sel = Selection::Choice(BTreeSet::from([0, 1]));
        assert_eq!(
            AnswerBuilder::build(&colors(), &sel, &token()),
            Err(AnswerError::TooManyChoices)
        );
    }

    #[test]
    fn choice_index_out_of_bounds_is_rejected() {
        let sel = Selection::Choice(BTreeSet::from([7]));
        assert_eq!(
            AnswerBuilder::build(&colors(), &sel, &token()),
            Err(AnswerError::InvalidChoice { index: 7 })
        );
    }

    #[test]
    fn text_at_max_length_passes_and_one_more_fails() {
        let q = Question::text(QuestionId::new(6), "Comments", 10);

        let exact = Selection::Text(Some("éééééééééé".into()));
        let resp = AnswerBuilder::build(&q, &exact, &token()).unwrap();
        assert_eq!(resp.text_answer(), Some("éééééééééé"));

        let over = Selection::Text(Some("abcdefghijk".into()));
        assert_eq!(
            AnswerBuilder::build(&q, &over, &token()),
            Err(AnswerError::AnswerTooLarge { len: 11, max: 10 })
        );
    }

    #[test]
    fn whitespace_text_is_no_answer() {
        let q = Question::text(QuestionId::new(6), "Comments", 10);
        assert_eq!(
            AnswerBuilder::build(&q, &Selection::Text(Some("  \n".into())), &token()),
            Err(AnswerError::NoAnswer)
        );
    }

    #[test]
    fn checklist_deduplicates_in_order() {
        let q = Question::checklist(
            QuestionId::new(3),
            "Symptoms",
            vec!["cough".into(), "fever".into()],
        );
        let sel = Selection::Checklist(vec!["fever".into(), "cough".into(), "fever".into()]);
        let resp = AnswerBuilder::build(&q, &sel, &token()).unwrap();
        assert_eq!(
            resp.checklist_answer(),
            Some(&["fever".to_string(), "cough".to_string()][..])
        );
    }

    #[test]
    fn checklist_rejects_unknown_item() {
        let q = Question::checklist(QuestionId::new(3), "Symptoms", vec!["cough".into()]);
        let sel = Selection::Checklist(vec!["rash".into()]);
        assert_eq!(
            AnswerBuilder::build(&q, &sel, &token()),
            Err(AnswerError::UnknownChecklistItem("rash".into()))
        );
    }

    #[test]
    fn range_enforces_bounds() {
        let q = Question::range(QuestionId::new(4), "Pain", 0.0, 10.0, 1.0);
        let ok = AnswerBuilder::build(&q, &Selection::Number(Some(10.0)), &token()).unwrap();
        assert_eq!(ok.number_answer(), Some(10.0));

        assert!(matches!(
            AnswerBuilder::build(&q, &Selection::Number(Some(11.0)), &token()),
            Err(AnswerError::OutOfRange { .. })
        ));
    }

    #[test]
    fn number_rejects_nan() {
        let q = Question::number(QuestionId::new(5), "Age", Some(0.0), None);
        assert_eq!(
            AnswerBuilder::build(&q, &Selection::Number(Some(f64::NAN)), &token()),
            Err(AnswerError::NotANumber)
        );
    }

    #[test]
    fn wrong_widget_is_kind_mismatch() {
        let q = Question::boolean(QuestionId::new(1), "Vaccinated?");
        assert_eq!(
            AnswerBuilder::build(&q, &Selection::Text(Some("yes".into())), &token()),
            Err(AnswerError::KindMismatch {
                expected: QuestionType::Boolean,
                found: QuestionType::Text,
            })
        );
    }

    #[test]
    fn skip_requires_optional_question() {
        let required = Question::boolean(QuestionId::new(1), "Vaccinated?");
        assert_eq!(
            AnswerBuilder::skip(&required, &token()),
            Err(AnswerError::NotOptional)
        );

        let optional = Question::text(QuestionId::new(2), "Comments", 10).optional();
        let resp = AnswerBuilder::skip(&optional, &token()).unwrap();
        assert!(resp.is_skipped());
        assert!(resp.payload().is_none());
        assert_eq!(resp.survey_token(), &token());
    }
}
