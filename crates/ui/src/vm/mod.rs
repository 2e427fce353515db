mod completion_vm;
mod question_vm;
mod survey_vm;
mod text;
mod time_fmt;

pub use completion_vm::{CompletionVm, map_completion};
pub use question_vm::{OptionVm, QuestionVm, WidgetVm, map_question};
pub use survey_vm::{
    SelectionEdit, SurveyIntent, SurveyOutcome, SurveyPhase, SurveyVm, open_survey,
};
pub use text::{render_completion, render_question};
pub use time_fmt::{format_datetime, format_duration};
