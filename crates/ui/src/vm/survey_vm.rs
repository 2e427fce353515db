use services::{
    SessionError, SessionHandle, SessionLoopService, SessionProgress, SessionState, SubmitOutcome,
};
use survey_core::model::{Question, QuestionId, QuestionKind, Selection, SurveyId};

use crate::views::ViewError;
use crate::vm::completion_vm::CompletionVm;
use crate::vm::question_vm::{QuestionVm, map_question};

/// A change to the widget of the question on screen.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionEdit {
    SetBoolean(bool),
    /// Single choice replaces the pick; multiple choice toggles it.
    ToggleChoice(usize),
    SetText(String),
    ToggleChecklistItem(usize),
    /// Raw field text; parsed on every edit.
    SetNumber(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SurveyIntent {
    Edit(SelectionEdit),
    Submit,
    Skip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurveyPhase {
    Loading,
    LoadFailed,
    Answering,
    Submitting,
    Finished,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SurveyOutcome {
    Continue,
    Completed(CompletionVm),
    /// Nothing happened: another submit was outstanding or the view is stale.
    Ignored,
}

#[derive(Clone, Debug)]
struct Draft {
    question_id: QuestionId,
    selection: Selection,
    number_input: String,
}

impl Draft {
    fn for_question(question: &Question) -> Self {
        Self {
            question_id: question.id(),
            selection: Selection::empty_for(question.kind()),
            number_input: String::new(),
        }
    }

    fn apply(&mut self, kind: &QuestionKind, edit: SelectionEdit) -> bool {
        match (edit, &mut self.selection, kind) {
            (SelectionEdit::SetBoolean(value), Selection::Boolean(current), _) => {
                *current = Some(value);
                true
            }
            (
                SelectionEdit::ToggleChoice(index),
                Selection::Choice(picked),
                QuestionKind::Choice { answers, multiple },
            ) => {
                if index >= answers.len() {
                    return false;
                }
                if picked.remove(&index) {
                    return true;
                }
                if !*multiple {
                    picked.clear();
                }
                picked.insert(index);
                true
            }
            (SelectionEdit::SetText(text), Selection::Text(current), _) => {
                *current = (!text.is_empty()).then_some(text);
                true
            }
            (
                SelectionEdit::ToggleChecklistItem(index),
                Selection::Checklist(checked),
                QuestionKind::Checklist { items },
            ) => {
                let Some(item) = items.get(index) else {
                    return false;
                };
                match checked.iter().position(|c| c == item) {
                    Some(pos) => {
                        checked.remove(pos);
                    }
                    None => checked.push(item.clone()),
                }
                true
            }
            (SelectionEdit::SetNumber(raw), Selection::Number(current), _) => {
                let trimmed = raw.trim();
                *current = if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.parse().unwrap_or(f64::NAN))
                };
                self.number_input = raw;
                true
            }
            _ => false,
        }
    }
}

/// Presentation state for one survey session.
///
/// Holds a snapshot of the shared session plus the selection being edited.
/// Every async operation refreshes the snapshot when it returns.
#[derive(Clone, Debug)]
pub struct SurveyVm {
    handle: SessionHandle,
    state: SessionState,
    title: String,
    progress: SessionProgress,
    draft: Option<Draft>,
}

impl SurveyVm {
    #[must_use]
    pub fn new(handle: SessionHandle) -> Self {
        let mut vm = Self {
            handle,
            state: SessionState::Loading,
            title: String::new(),
            progress: SessionProgress::default(),
            draft: None,
        };
        vm.refresh();
        vm
    }

    #[must_use]
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn phase(&self) -> SurveyPhase {
        match self.state {
            SessionState::Loading => SurveyPhase::Loading,
            SessionState::LoadError(_) => SurveyPhase::LoadFailed,
            SessionState::Active(_) => SurveyPhase::Answering,
            SessionState::Submitting(_) => SurveyPhase::Submitting,
            SessionState::Finished(_) => SurveyPhase::Finished,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        self.progress
    }

    #[must_use]
    pub fn progress_label(&self) -> String {
        format!(
            "{} answered · {} skipped",
            self.progress.answered, self.progress.skipped
        )
    }

    #[must_use]
    pub fn selection(&self) -> Option<&Selection> {
        self.draft.as_ref().map(|draft| &draft.selection)
    }

    #[must_use]
    pub fn question(&self) -> Option<QuestionVm> {
        let question = self.state.question()?;
        let draft = self.draft.as_ref()?;
        Some(map_question(question, &draft.selection, &draft.number_input))
    }

    #[must_use]
    pub fn completion(&self) -> Option<CompletionVm> {
        self.state.completion().map(CompletionVm::from)
    }

    #[must_use]
    pub fn can_skip(&self) -> bool {
        matches!(&self.state, SessionState::Active(question) if question.is_optional())
    }

    /// Applies `edit` to the current draft. Returns false when there is no
    /// editable question or the edit does not fit its widget.
    pub fn edit(&mut self, edit: SelectionEdit) -> bool {
        let (SessionState::Active(question), Some(draft)) = (&self.state, self.draft.as_mut()) else {
            return false;
        };
        draft.apply(question.kind(), edit)
    }

    /// # Errors
    ///
    /// Returns `ViewError::LoadFailed` when the survey could not be fetched;
    /// calling `load` again retries.
    pub async fn load(&mut self, session_loop: &SessionLoopService) -> Result<(), ViewError> {
        let result = session_loop.load(&self.handle).await;
        self.refresh();
        match result {
            Ok(_) | Err(SessionError::Finished) => Ok(()),
            Err(SessionError::Storage(_) | SessionError::Traversal(_)) => Err(ViewError::LoadFailed),
            Err(_) => Err(ViewError::Unknown),
        }
    }

    /// Submits the current draft.
    ///
    /// # Errors
    ///
    /// Returns a local `ViewError` for invalid drafts and
    /// `ViewError::SubmitFailed` when sending failed.
    pub async fn submit(
        &mut self,
        session_loop: &SessionLoopService,
    ) -> Result<SurveyOutcome, ViewError> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(SurveyOutcome::Ignored);
        };
        let result = session_loop.answer(&self.handle, &selection).await;
        self.finish(result)
    }

    /// # Errors
    ///
    /// Returns `ViewError::NotOptional` for required questions and
    /// `ViewError::SubmitFailed` when sending failed.
    pub async fn skip(
        &mut self,
        session_loop: &SessionLoopService,
    ) -> Result<SurveyOutcome, ViewError> {
        let result = session_loop.skip(&self.handle).await;
        self.finish(result)
    }

    /// Ends the session; a result still in flight is dropped when it arrives.
    pub fn dispose(&self) {
        let _ = self.handle.dispose();
    }

    /// Re-reads the shared session. A new question starts with an empty draft.
    pub fn refresh(&mut self) {
        let snapshot = self.handle.with(|session| {
            (
                session.state().clone(),
                session.progress(),
                session.status().map(|status| status.title.clone()),
            )
        });
        let Ok((state, progress, title)) = snapshot else {
            return;
        };

        if let Some(title) = title {
            self.title = title;
        }
        self.progress = progress;
        match state.question() {
            Some(question) => {
                if self
                    .draft
                    .as_ref()
                    .is_none_or(|draft| draft.question_id != question.id())
                {
                    self.draft = Some(Draft::for_question(question));
                }
            }
            None => self.draft = None,
        }
        self.state = state;
    }

    fn finish(
        &mut self,
        result: Result<SubmitOutcome, SessionError>,
    ) -> Result<SurveyOutcome, ViewError> {
        self.refresh();
        match result {
            Ok(SubmitOutcome::Next(_)) => Ok(SurveyOutcome::Continue),
            Ok(SubmitOutcome::Finished(completion)) => {
                Ok(SurveyOutcome::Completed(CompletionVm::from(&completion)))
            }
            Ok(SubmitOutcome::Ignored | SubmitOutcome::Discarded) => Ok(SurveyOutcome::Ignored),
            Err(err) => Err(ViewError::from_session(&err)),
        }
    }
}

/// A view model for a fresh, not yet loaded session of `survey_id`.
#[must_use]
pub fn open_survey(session_loop: &SessionLoopService, survey_id: SurveyId) -> SurveyVm {
    SurveyVm::new(session_loop.open(survey_id))
}
