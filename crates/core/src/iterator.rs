use std::sync::Arc;

use thiserror::Error;

use crate::model::{Question, QuestionId, Survey, SurveyResponse, Target};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TraversalError {
    #[error("answer is for question {found}, but the current question is {expected}")]
    AnswerMismatch {
        expected: QuestionId,
        found: QuestionId,
    },

    #[error("question {0} is current and needs an answer before moving on")]
    MissingAnswer(QuestionId),

    #[error("traversal has not started; the first call takes no answer")]
    NotStarted,

    #[error("question {0} is not part of the survey")]
    UnknownQuestion(QuestionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    NotStarted,
    At(QuestionId),
    Done,
}

/// Walks a survey one question at a time.
///
/// The first call to [`QuestionIterator::next`] takes no answer and yields the
/// starting question. Every later call takes the response to the current
/// question and yields whatever the survey graph says comes next: the first
/// branch whose condition matches, else the question's `next` pointer. Once the
/// end is reached every call yields `None`.
#[derive(Debug, Clone)]
pub struct QuestionIterator {
    survey: Arc<Survey>,
    start: Option<QuestionId>,
    cursor: Cursor,
}

impl QuestionIterator {
    /// Creates an iterator positioned before `start`.
    ///
    /// # Errors
    ///
    /// Returns `TraversalError::UnknownQuestion` if `start` is not in the survey.
    pub fn new(survey: Arc<Survey>, start: Option<QuestionId>) -> Result<Self, TraversalError> {
        if let Some(id) = start {
            if !survey.contains(id) {
                return Err(TraversalError::UnknownQuestion(id));
            }
        }
        Ok(Self {
            survey,
            start,
            cursor: Cursor::NotStarted,
        })
    }

    /// Iterator that begins at the survey's own start question.
    #[must_use]
    pub fn from_start(survey: Arc<Survey>) -> Self {
        let start = survey.start();
        Self {
            survey,
            start,
            cursor: Cursor::NotStarted,
        }
    }

    #[must_use]
    pub fn survey(&self) -> &Arc<Survey> {
        &self.survey
    }

    /// The question most recently yielded, if traversal is under way.
    #[must_use]
    pub fn current(&self) -> Option<&Question> {
        match self.cursor {
            Cursor::At(id) => self.survey.question(id),
            Cursor::NotStarted | Cursor::Done => None,
        }
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.cursor != Cursor::NotStarted
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.cursor == Cursor::Done
    }

    /// Advances past the current question.
    ///
    /// # Errors
    ///
    /// Returns `TraversalError` when `previous` does not fit the cursor; the
    /// cursor is left untouched in that case.
    pub fn next(
        &mut self,
        previous: Option<&SurveyResponse>,
    ) -> Result<Option<&Question>, TraversalError> {
        let following = self.resolve(previous)?;
        self.cursor = match following {
            Some(id) => Cursor::At(id),
            None => Cursor::Done,
        };
        Ok(following.and_then(|id| self.survey.question(id)))
    }

    /// The id [`next`](Self::next) would move to, without moving.
    ///
    /// # Errors
    ///
    /// Same conditions as `next`.
    pub fn peek(
        &self,
        previous: Option<&SurveyResponse>,
    ) -> Result<Option<QuestionId>, TraversalError> {
        self.resolve(previous)
    }

    fn resolve(
        &self,
        previous: Option<&SurveyResponse>,
    ) -> Result<Option<QuestionId>, TraversalError> {
        match (self.cursor, previous) {
            (Cursor::Done, _) => Ok(None),
            (Cursor::NotStarted, None) => Ok(self.start),
            (Cursor::NotStarted, Some(_)) => Err(TraversalError::NotStarted),
            (Cursor::At(current), None) => Err(TraversalError::MissingAnswer(current)),
            (Cursor::At(current), Some(response)) => {
                if response.question_id() != current {
                    return Err(TraversalError::AnswerMismatch {
                        expected: current,
                        found: response.question_id(),
                    });
                }
                let question = self
                    .survey
                    .question(current)
                    .ok_or(TraversalError::UnknownQuestion(current))?;
                Ok(Self::following(question, response))
            }
        }
    }

    fn following(question: &Question, response: &SurveyResponse) -> Option<QuestionId> {
        match question
            .branches()
            .iter()
            .find(|branch| branch.condition.matches(response))
        {
            Some(branch) => match branch.target {
                Target::Question(id) => Some(id),
                Target::End => None,
            },
            None => question.next(),
        }
    }
}
