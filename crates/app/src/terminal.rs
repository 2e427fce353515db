//! Line-oriented front end over the same view model the desktop UI uses.

use std::fmt;

use services::SessionLoopService;
use survey_core::model::SurveyId;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;
use ui::vm::{
    SelectionEdit, SurveyOutcome, SurveyPhase, WidgetVm, open_survey, render_completion,
    render_question,
};

#[derive(Debug, Clone, PartialEq)]
pub enum TerminalInput {
    Skip,
    Quit,
    Edits(Vec<SelectionEdit>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    Empty,
    NotYesNo(String),
    NotAnOption(String),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Empty => write!(f, "please type an answer"),
            InputError::NotYesNo(raw) => write!(f, "expected y or n, got {raw:?}"),
            InputError::NotAnOption(raw) => write!(f, "{raw:?} is not one of the listed numbers"),
        }
    }
}

impl std::error::Error for InputError {}

/// Turns one typed line into edits for `widget`.
///
/// Choice and checklist numbers are 1-based and describe the wanted final
/// set, so only options whose state differs are toggled.
pub fn parse_input(widget: &WidgetVm, line: &str) -> Result<TerminalInput, InputError> {
    let line = line.trim();
    match line {
        ":skip" => return Ok(TerminalInput::Skip),
        ":quit" | ":q" => return Ok(TerminalInput::Quit),
        _ => {}
    }

    let edits = match widget {
        WidgetVm::Boolean { .. } => match line.to_ascii_lowercase().as_str() {
            "y" | "yes" => vec![SelectionEdit::SetBoolean(true)],
            "n" | "no" => vec![SelectionEdit::SetBoolean(false)],
            "" => return Err(InputError::Empty),
            _ => return Err(InputError::NotYesNo(line.to_owned())),
        },
        WidgetVm::Choice { multiple, options } => {
            let mut wanted = parse_indices(line, options.len())?;
            if !multiple {
                wanted.truncate(1);
            }
            if *multiple {
                options
                    .iter()
                    .filter(|option| option.selected != wanted.contains(&option.index))
                    .map(|option| SelectionEdit::ToggleChoice(option.index))
                    .collect()
            } else {
                // A single pick replaces the old one; re-picking it must not clear it.
                wanted
                    .into_iter()
                    .filter(|&index| options.get(index).is_some_and(|option| !option.selected))
                    .map(SelectionEdit::ToggleChoice)
                    .collect()
            }
        }
        WidgetVm::Checklist { items } => {
            let wanted = parse_indices(line, items.len())?;
            items
                .iter()
                .filter(|item| item.selected != wanted.contains(&item.index))
                .map(|item| SelectionEdit::ToggleChecklistItem(item.index))
                .collect()
        }
        WidgetVm::Text { .. } => vec![SelectionEdit::SetText(line.to_owned())],
        WidgetVm::Range { .. } | WidgetVm::Number { .. } => {
            vec![SelectionEdit::SetNumber(line.to_owned())]
        }
    };
    Ok(TerminalInput::Edits(edits))
}

fn parse_indices(line: &str, len: usize) -> Result<Vec<usize>, InputError> {
    if line.is_empty() {
        return Ok(Vec::new());
    }
    line.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse::<usize>() {
            Ok(n) if (1..=len).contains(&n) => Ok(n - 1),
            _ => Err(InputError::NotAnOption(part.to_owned())),
        })
        .collect()
}

/// Runs one survey to completion, reading answers from `input`.
///
/// # Errors
///
/// Returns I/O errors from `input` or `output`. Survey errors are printed
/// and the question is asked again.
pub async fn run_survey<R, W>(
    session_loop: &SessionLoopService,
    survey_id: SurveyId,
    input: R,
    mut output: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut vm = open_survey(session_loop, survey_id);

    loop {
        match vm.phase() {
            SurveyPhase::Loading | SurveyPhase::LoadFailed => {
                if let Err(err) = vm.load(session_loop).await {
                    output.write_all(format!("{}\n", err.message()).as_bytes()).await?;
                    output.write_all(b"Press enter to retry or :quit to leave.\n").await?;
                    output.flush().await?;
                    match lines.next_line().await? {
                        Some(line) if line.trim() != ":quit" && line.trim() != ":q" => continue,
                        _ => break,
                    }
                }
            }
            SurveyPhase::Finished => {
                if let Some(completion) = vm.completion() {
                    output.write_all(render_completion(&completion).as_bytes()).await?;
                    output.write_all(b"\n").await?;
                }
                break;
            }
            SurveyPhase::Answering | SurveyPhase::Submitting => {
                let Some(question) = vm.question() else {
                    break;
                };
                let header = format!("\n[{}] {}\n", vm.title(), vm.progress_label());
                output.write_all(header.as_bytes()).await?;
                output.write_all(render_question(&question).as_bytes()).await?;
                output.write_all(b"> ").await?;
                output.flush().await?;

                let Some(line) = lines.next_line().await? else {
                    debug!("input closed before the survey finished");
                    break;
                };
                let result = match parse_input(&question.widget, &line) {
                    Ok(TerminalInput::Quit) => break,
                    Ok(TerminalInput::Skip) => vm.skip(session_loop).await,
                    Ok(TerminalInput::Edits(edits)) => {
                        for edit in edits {
                            vm.edit(edit);
                        }
                        vm.submit(session_loop).await
                    }
                    Err(err) => {
                        output.write_all(format!("{err}\n").as_bytes()).await?;
                        continue;
                    }
                };
                match result {
                    Ok(SurveyOutcome::Continue | SurveyOutcome::Completed(_)) => {}
                    Ok(SurveyOutcome::Ignored) => debug!("submit ignored"),
                    Err(err) => {
                        output.write_all(format!("{}\n", err.message()).as_bytes()).await?;
                    }
                }
            }
        }
    }

    vm.dispose();
    output.flush().await
}
