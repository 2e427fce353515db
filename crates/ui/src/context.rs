use std::sync::Arc;

use services::SessionLoopService;
use survey_core::model::SurveyId;

pub trait UiApp: Send + Sync {
    fn survey_id(&self) -> SurveyId;
    fn session_loop(&self) -> Arc<SessionLoopService>;
}

#[derive(Clone)]
pub struct AppContext {
    survey_id: SurveyId,
    session_loop: Arc<SessionLoopService>,
}

impl AppContext {
    #[must_use]
    pub fn new(app: &Arc<dyn UiApp>) -> Self {
        Self {
            survey_id: app.survey_id(),
            session_loop: app.session_loop(),
        }
    }

    #[must_use]
    pub fn survey_id(&self) -> SurveyId {
        self.survey_id
    }

    #[must_use]
    pub fn session_loop(&self) -> Arc<SessionLoopService> {
        Arc::clone(&self.session_loop)
    }
}

// Provided by the composition root in `crates/app`.

/// Build an `AppContext` from a UI-facing app implementation.
#[must_use]
pub fn build_app_context(app: &Arc<dyn UiApp>) -> AppContext {
    AppContext::new(app)
}
