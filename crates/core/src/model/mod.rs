mod branch;
mod ids;
mod question;
mod response;
mod selection;
mod status;
mod survey;

pub use ids::{AnswerId, ParseIdError, QuestionId, SurveyId, SurveyToken};

pub use branch::{Branch, Condition, Target};
pub use question::{Answer, Question, QuestionError, QuestionKind, QuestionType};
pub use response::{AnswerPayload, ResponseBody, SurveyResponse};
pub use selection::Selection;
pub use status::SurveyStatus;
pub use survey::{Survey, SurveyDraft, SurveyError};
