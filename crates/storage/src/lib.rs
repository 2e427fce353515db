pub mod repository;
pub mod service;
pub mod sqlite;

pub use repository::{Storage, StorageError};
pub use service::{LocalSurveyService, SurveyService};
