use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::model::ids::{QuestionId, SurveyId};
use crate::model::question::{Question, QuestionError};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SurveyError {
    #[error("survey title is empty")]
    EmptyTitle,

    #[error("duplicate question id {0}")]
    DuplicateQuestion(QuestionId),

    #[error("start question {0} does not exist")]
    MissingStart(QuestionId),

    #[error("question {from} points to unknown question {to}")]
    DanglingReference { from: QuestionId, to: QuestionId },

    #[error("question {0} is part of a cycle")]
    Cycle(QuestionId),

    #[error("invalid question {id}: {source}")]
    InvalidQuestion {
        id: QuestionId,
        #[source]
        source: QuestionError,
    },
}

//
// ─── SURVEY ───────────────────────────────────────────────────────────────────
//

/// Unvalidated survey shape, as stored or received over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyDraft {
    pub id: SurveyId,
    pub title: String,
    #[serde(default)]
    pub start: Option<QuestionId>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Immutable, validated survey definition.
///
/// Construction guarantees that every pointer resolves and that the question
/// graph is acyclic, so any traversal terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SurveyDraft", into = "SurveyDraft")]
pub struct Survey {
    id: SurveyId,
    title: String,
    start: Option<QuestionId>,
    questions: Vec<Question>,
    index: HashMap<QuestionId, usize>,
}

impl Survey {
    /// Builds a survey from its parts.
    ///
    /// # Errors
    ///
    /// Returns `SurveyError` if the definition is inconsistent.
    pub fn new(
        id: SurveyId,
        title: impl Into<String>,
        start: Option<QuestionId>,
        questions: Vec<Question>,
    ) -> Result<Self, SurveyError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(SurveyError::EmptyTitle);
        }

        let mut index = HashMap::with_capacity(questions.len());
        for (pos, question) in questions.iter().enumerate() {
            question
                .validate()
                .map_err(|source| SurveyError::InvalidQuestion {
                    id: question.id(),
                    source,
                })?;
            if index.insert(question.id(), pos).is_some() {
                return Err(SurveyError::DuplicateQuestion(question.id()));
            }
        }

        if let Some(start) = start {
            if !index.contains_key(&start) {
                return Err(SurveyError::MissingStart(start));
            }
        }

        for question in &questions {
            for to in question.successors() {
                if !index.contains_key(&to) {
                    return Err(SurveyError::DanglingReference {
                        from: question.id(),
                        to,
                    });
                }
            }
        }

        let survey = Self {
            id,
            title,
            start,
            questions,
            index,
        };
        survey.ensure_acyclic()?;
        Ok(survey)
    }

    /// Builds a survey that visits `questions` in order, ignoring any `next`
    /// pointers they carry. Branches are kept.
    ///
    /// # Errors
    ///
    /// Returns `SurveyError` if the definition is inconsistent.
    pub fn linear(
        id: SurveyId,
        title: impl Into<String>,
        mut questions: Vec<Question>,
    ) -> Result<Self, SurveyError> {
        let ids: Vec<QuestionId> = questions.iter().map(Question::id).collect();
        for (pos, question) in questions.iter_mut().enumerate() {
            question.set_next(ids.get(pos + 1).copied());
        }
        let start = ids.first().copied();
        Self::new(id, title, start, questions)
    }

    #[must_use]
    pub fn id(&self) -> SurveyId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn start(&self) -> Option<QuestionId> {
        self.start
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.index.get(&id).map(|&pos| &self.questions[pos])
    }

    #[must_use]
    pub fn contains(&self, id: QuestionId) -> bool {
        self.index.contains_key(&id)
    }

    fn ensure_acyclic(&self) -> Result<(), SurveyError> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.questions.len()];

        for root in 0..self.questions.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            // Iterative DFS: (position, successors already pushed)
            let mut stack = vec![(root, false)];
            while let Some((pos, expanded)) = stack.pop() {
                if expanded {
                    marks[pos] = Mark::Done;
                    continue;
                }
                if marks[pos] != Mark::Unvisited {
                    continue;
                }
                marks[pos] = Mark::InProgress;
                stack.push((pos, true));
                for succ in self.questions[pos].successors() {
                    let next = self.index[&succ];
                    match marks[next] {
                        Mark::InProgress => return Err(SurveyError::Cycle(succ)),
                        Mark::Unvisited => stack.push((next, false)),
                        Mark::Done => {}
                    }
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<SurveyDraft> for Survey {
    type Error = SurveyError;

    fn try_from(draft: SurveyDraft) -> Result<Self, Self::Error> {
        Survey::new(draft.id, draft.title, draft.start, draft.questions)
    }
}

impl From<Survey> for SurveyDraft {
    fn from(survey: Survey) -> Self {
        Self {
            id: survey.id,
            title: survey.title,
            start: survey.start,
            questions: survey.questions,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::branch::{Branch, Condition, Target};

    fn q(id: u64) -> Question {
        Question::boolean(QuestionId::new(id), format!("Q{id}"))
    }

    #[test]
    fn linear_chains_questions_in_order() {
        let survey = Survey::linear(SurveyId::new(1), "Health", vec![q(1), q(2), q(3)]).unwrap();
        assert_eq!(survey.start(), Some(QuestionId::new(1)));
        assert_eq!(
            survey.question(QuestionId::new(1)).unwrap().next(),
            Some(QuestionId::new(2))
        );
        assert_eq!(survey.question(QuestionId::new(3)).unwrap().next(), None);
    }

    #[test]
    fn empty_linear_survey_has_no_start() {
        let survey = Survey::linear(SurveyId::new(1), "Empty", Vec::new()).unwrap();
        assert!(survey.is_empty());
        assert_eq!(survey.start(), None);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Survey::linear(SurveyId::new(1), "Dup", vec![q(1), q(1)]).unwrap_err();
        assert_eq!(err, SurveyError::DuplicateQuestion(QuestionId::new(1)));
    }

    #[test]
    fn dangling_branch_target_is_rejected() {
        let first = q(1).with_branch(Branch::new(
            Condition::equals(true),
            Target::Question(QuestionId::new(9)),
        ));
        let err = Survey::linear(SurveyId::new(1), "Dangling", vec![first, q(2)]).unwrap_err();
        assert!(matches!(err, SurveyError::DanglingReference { .. }));
    }

    #[test]
    fn missing_start_is_rejected() {
        let err = Survey::new(
            SurveyId::new(1),
            "Start",
            Some(QuestionId::new(4)),
            vec![q(1)],
        )
        .unwrap_err();
        assert_eq!(err, SurveyError::MissingStart(QuestionId::new(4)));
    }

    #[test]
    fn cycles_are_rejected() {
        let looping = q(2).with_branch(Branch::new(
            Condition::equals(false),
            Target::Question(QuestionId::new(1)),
        ));
        let err = Survey::linear(SurveyId::new(1), "Loop", vec![q(1), looping]).unwrap_err();
        assert!(matches!(err, SurveyError::Cycle(_)));
    }

    #[test]
    fn diamond_shape_is_not_a_cycle() {
        let top = q(1)
            .with_branch(Branch::new(
                Condition::equals(true),
                Target::Question(QuestionId::new(3)),
            ))
            .with_next(QuestionId::new(2));
        let left = q(2).with_next(QuestionId::new(3));
        let survey = Survey::new(
            SurveyId::new(1),
            "Diamond",
            Some(QuestionId::new(1)),
            vec![top, left, q(3)],
        );
        assert!(survey.is_ok());
    }

    #[test]
    fn json_round_trip_revalidates() {
        let json = r#"{
            "id": 7,
            "title": "Vaccination",
            "start": 1,
            "questions": [
                {"id": 1, "text": "Vaccinated?", "kind": {"type": "boolean"}, "next": 2},
                {"id": 2, "text": "Comments", "optional": true, "kind": {"type": "text", "max_length": 10}}
            ]
        }"#;
        let survey: Survey = serde_json::from_str(json).unwrap();
        assert_eq!(survey.len(), 2);
        assert!(survey.question(QuestionId::new(2)).unwrap().is_optional());

        let bad = json.replace("\"next\": 2", "\"next\": 3");
        assert!(serde_json::from_str::<Survey>(&bad).is_err());
    }
}
