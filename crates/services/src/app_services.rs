use std::sync::Arc;

use storage::repository::{Storage, StorageError, SurveyRepository};
use storage::service::{LocalSurveyService, SurveyService};
use survey_core::model::Survey;
use tracing::info;

use crate::Clock;
use crate::error::{AppServicesError, HttpServiceError};
use crate::http_survey_service::{HttpSurveyConfig, HttpSurveyService};
use crate::sessions::SessionLoopService;

/// Assembles app-facing services around one survey backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Option<Storage>,
    survey_service: Arc<dyn SurveyService>,
    session_loop: Arc<SessionLoopService>,
}

impl AppServices {
    /// Services backed by process-local storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::local(Storage::in_memory(), clock)
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite_with_clock(db_url, clock).await?;
        info!(db_url, "using sqlite survey backend");
        Ok(Self::local(storage, clock))
    }

    /// Build services that talk to a remote survey API.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Http` when no base URL is configured.
    pub fn http(config: Option<HttpSurveyConfig>, clock: Clock) -> Result<Self, AppServicesError> {
        let service = HttpSurveyService::new(config);
        if !service.enabled() {
            return Err(HttpServiceError::Disabled.into());
        }
        info!("using remote survey backend");
        Ok(Self::with_service(Arc::new(service), None, clock))
    }

    /// Wires the session loop around an arbitrary backend.
    #[must_use]
    pub fn with_service(
        survey_service: Arc<dyn SurveyService>,
        storage: Option<Storage>,
        clock: Clock,
    ) -> Self {
        let session_loop = Arc::new(SessionLoopService::new(
            clock,
            Arc::clone(&survey_service),
        ));
        Self {
            storage,
            survey_service,
            session_loop,
        }
    }

    fn local(storage: Storage, clock: Clock) -> Self {
        let service = Arc::new(LocalSurveyService::new(storage.clone(), clock));
        Self::with_service(service, Some(storage), clock)
    }

    /// Local storage, if this backend has any.
    #[must_use]
    pub fn storage(&self) -> Option<&Storage> {
        self.storage.as_ref()
    }

    #[must_use]
    pub fn survey_service(&self) -> Arc<dyn SurveyService> {
        Arc::clone(&self.survey_service)
    }

    #[must_use]
    pub fn session_loop(&self) -> Arc<SessionLoopService> {
        Arc::clone(&self.session_loop)
    }

    /// Stores `survey` unless a definition with its id already exists.
    ///
    /// Returns `true` when the survey was inserted. Remote backends own their
    /// definitions, so this is a no-op for them.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage access fails.
    pub async fn ensure_survey(&self, survey: &Survey) -> Result<bool, AppServicesError> {
        let Some(storage) = &self.storage else {
            return Ok(false);
        };
        ensure_survey(storage.surveys.as_ref(), survey).await
    }
}

async fn ensure_survey(
    surveys: &dyn SurveyRepository,
    survey: &Survey,
) -> Result<bool, AppServicesError> {
    match surveys.get_survey(survey.id()).await {
        Ok(_) => Ok(false),
        Err(StorageError::NotFound) => {
            surveys.upsert_survey(survey).await?;
            info!(survey_id = %survey.id(), title = survey.title(), "seeded survey");
            Ok(true)
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_core::demo::vaccination_survey;
    use survey_core::model::SurveyId;
    use survey_core::time::fixed_clock;

    #[tokio::test]
    async fn ensure_survey_inserts_once() {
        let services = AppServices::in_memory(fixed_clock());
        let survey = vaccination_survey(SurveyId::new(1)).unwrap();

        assert!(services.ensure_survey(&survey).await.unwrap());
        assert!(!services.ensure_survey(&survey).await.unwrap());

        let status = services
            .survey_service()
            .get_survey_status(SurveyId::new(1))
            .await
            .unwrap();
        assert_eq!(status.title, "Vaccination");
    }

    #[test]
    fn http_backend_requires_a_base_url() {
        assert!(matches!(
            AppServices::http(None, fixed_clock()),
            Err(AppServicesError::Http(HttpServiceError::Disabled))
        ));
    }
}
