use std::sync::Arc;

use storage::repository::StorageError;
use survey_core::demo::{vaccination_survey, wellbeing_survey};
use survey_core::model::{QuestionId, Survey, SurveyId, SurveyResponse, SurveyStatus};

use super::test_harness::{ViewHarness, setup_survey_harness, setup_with_service};

async fn settle(harness: &mut ViewHarness) {
    harness.rebuild();
    for _ in 0..3 {
        harness.drive_async().await;
    }
}

#[tokio::test(flavor = "current_thread")]
async fn survey_view_renders_first_question() {
    let mut harness = setup_survey_harness(vaccination_survey(SurveyId::new(1)).unwrap()).await;
    settle(&mut harness).await;

    let html = harness.render();
    assert!(html.contains("Have you been vaccinated?"), "missing prompt in {html}");
    assert!(html.contains("Vaccination"), "missing title in {html}");
    assert!(html.contains("survey-next"), "missing next button in {html}");
    assert!(!html.contains("survey-skip"), "required question offers skip in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn survey_view_renders_boolean_toggles() {
    let mut harness = setup_survey_harness(wellbeing_survey(SurveyId::new(1)).unwrap()).await;
    settle(&mut harness).await;

    let html = harness.render();
    assert!(html.contains("widget--boolean"), "missing boolean widget in {html}");
    assert!(html.contains("0 answered"), "missing progress in {html}");
}

struct OfflineService;

#[async_trait::async_trait]
impl services::SurveyService for OfflineService {
    async fn get_survey_status(&self, _: SurveyId) -> Result<SurveyStatus, StorageError> {
        Err(StorageError::Connection("offline".to_string()))
    }

    async fn get_survey(&self, _: SurveyId) -> Result<Survey, StorageError> {
        Err(StorageError::Connection("offline".to_string()))
    }

    async fn answer(
        &self,
        _: &SurveyStatus,
        _: &SurveyResponse,
        _: Option<QuestionId>,
    ) -> Result<SurveyStatus, StorageError> {
        Err(StorageError::Connection("offline".to_string()))
    }
}

#[tokio::test(flavor = "current_thread")]
async fn survey_view_renders_load_error() {
    let mut harness = setup_with_service(SurveyId::new(1), Arc::new(OfflineService));
    settle(&mut harness).await;

    let html = harness.render();
    assert!(html.contains("load the survey"), "missing error in {html}");
    assert!(html.contains("Retry"), "missing retry in {html}");
}
