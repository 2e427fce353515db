mod handle;
mod progress;
mod service;
mod state;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use handle::SessionHandle;
pub use progress::SessionProgress;
pub use service::{PendingSubmit, SubmitOutcome, SurveySession};
pub use state::{Completion, SessionState};
pub use workflow::SessionLoopService;
