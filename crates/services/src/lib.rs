#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod http_survey_service;
pub mod sessions;

pub use survey_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use error::{AppServicesError, HttpServiceError, SessionError};
pub use http_survey_service::{HttpSurveyConfig, HttpSurveyService};

pub use sessions::{
    Completion, SessionHandle, SessionLoopService, SessionProgress, SessionState, SubmitOutcome,
    SurveySession,
};
pub use storage::service::{LocalSurveyService, SurveyService};
