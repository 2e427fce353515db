use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use services::{
    AppServices, LocalSurveyService, SessionError, SessionLoopService, SessionState,
    SubmitOutcome, SurveyService,
};
use storage::repository::{Storage, StorageError, SurveyRepository};
use survey_core::demo::{vaccination_survey, wellbeing_survey};
use survey_core::model::{QuestionId, Selection, Survey, SurveyId, SurveyResponse, SurveyStatus};
use survey_core::time::{fixed_clock, fixed_now};
use survey_core::{AnswerBuilder, AnswerError};
use tokio::sync::Notify;

const SURVEY: SurveyId = SurveyId::new(1);

async fn local_backend(survey: Survey) -> LocalSurveyService {
    let storage = Storage::in_memory();
    storage.surveys.upsert_survey(&survey).await.unwrap();
    LocalSurveyService::new(storage, fixed_clock())
}

fn current_id(state: &SessionState) -> Option<u64> {
    state.question().map(|q| q.id().value())
}

/// Fails the next status fetch or answer once when asked to. With
/// `lose_reply` the answer is recorded but the caller still sees an error.
struct FlakyService {
    inner: LocalSurveyService,
    fail_status: AtomicBool,
    fail_answer: AtomicBool,
    lose_reply: AtomicBool,
}

impl FlakyService {
    fn new(inner: LocalSurveyService) -> Self {
        Self {
            inner,
            fail_status: AtomicBool::new(false),
            fail_answer: AtomicBool::new(false),
            lose_reply: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SurveyService for FlakyService {
    async fn get_survey_status(&self, survey_id: SurveyId) -> Result<SurveyStatus, StorageError> {
        if self.fail_status.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Connection("offline".into()));
        }
        self.inner.get_survey_status(survey_id).await
    }

    async fn get_survey(&self, survey_id: SurveyId) -> Result<Survey, StorageError> {
        self.inner.get_survey(survey_id).await
    }

    async fn answer(
        &self,
        status: &SurveyStatus,
        response: &SurveyResponse,
        next_question: Option<QuestionId>,
    ) -> Result<SurveyStatus, StorageError> {
        if self.fail_answer.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Connection("offline".into()));
        }
        let recorded = self.inner.answer(status, response, next_question).await?;
        if self.lose_reply.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Connection("reply lost".into()));
        }
        Ok(recorded)
    }
}

/// Holds every answer until the test releases it.
struct GatedService {
    inner: LocalSurveyService,
    entered: Notify,
    release: Notify,
    answers: AtomicUsize,
}

impl GatedService {
    fn new(inner: LocalSurveyService) -> Self {
        Self {
            inner,
            entered: Notify::new(),
            release: Notify::new(),
            answers: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SurveyService for GatedService {
    async fn get_survey_status(&self, survey_id: SurveyId) -> Result<SurveyStatus, StorageError> {
        self.inner.get_survey_status(survey_id).await
    }

    async fn get_survey(&self, survey_id: SurveyId) -> Result<Survey, StorageError> {
        self.inner.get_survey(survey_id).await
    }

    async fn answer(
        &self,
        status: &SurveyStatus,
        response: &SurveyResponse,
        next_question: Option<QuestionId>,
    ) -> Result<SurveyStatus, StorageError> {
        self.answers.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.answer(status, response, next_question).await
    }
}

#[tokio::test]
async fn vaccinated_then_skip_comments_finishes() {
    let services = AppServices::in_memory(fixed_clock());
    services
        .ensure_survey(&vaccination_survey(SURVEY).unwrap())
        .await
        .unwrap();
    let loop_svc = services.session_loop();

    let (handle, loaded) = loop_svc.start(SURVEY).await;
    let loaded = loaded.expect("load");
    assert_eq!(current_id(&loaded), Some(1));

    let outcome = loop_svc
        .answer(&handle, &Selection::Boolean(Some(true)))
        .await
        .unwrap();
    let SubmitOutcome::Next(question) = outcome else {
        panic!("expected next question, got {outcome:?}");
    };
    assert_eq!(question.id(), QuestionId::new(2));

    let outcome = loop_svc.skip(&handle).await.unwrap();
    let SubmitOutcome::Finished(completion) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(completion.survey_id, SURVEY);
    assert_eq!(completion.title, "Vaccination");
    assert_eq!((completion.answered, completion.skipped), (1, 1));
    assert_eq!(completion.completed_at, fixed_now());

    let progress = handle.progress().unwrap();
    assert!(progress.is_finished);
    assert_eq!(progress.handled(), 2);

    let recorded = services
        .storage()
        .unwrap()
        .responses
        .responses_for(SURVEY)
        .await
        .unwrap();
    assert_eq!(recorded.len(), 2);
    assert!(recorded[1].response.is_skipped());
}

#[tokio::test]
async fn missing_selection_keeps_question_current() {
    let backend = local_backend(vaccination_survey(SURVEY).unwrap()).await;
    let loop_svc = SessionLoopService::new(fixed_clock(), Arc::new(backend));
    let (handle, loaded) = loop_svc.start(SURVEY).await;
    loaded.unwrap();

    let err = loop_svc
        .answer(&handle, &Selection::Boolean(None))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(matches!(err, SessionError::Answer(AnswerError::NoAnswer)));

    let err = loop_svc.skip(&handle).await.unwrap_err();
    assert!(matches!(err, SessionError::Answer(AnswerError::NotOptional)));

    assert_eq!(current_id(&handle.state().unwrap()), Some(1));
    assert_eq!(handle.progress().unwrap().handled(), 0);
}

#[tokio::test]
async fn over_long_comment_is_rejected_locally() {
    let backend = local_backend(vaccination_survey(SURVEY).unwrap()).await;
    let loop_svc = SessionLoopService::new(fixed_clock(), Arc::new(backend));
    let (handle, loaded) = loop_svc.start(SURVEY).await;
    loaded.unwrap();
    loop_svc
        .answer(&handle, &Selection::Boolean(Some(false)))
        .await
        .unwrap();

    let err = loop_svc
        .answer(&handle, &Selection::Text(Some("0123456789x".into())))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Answer(AnswerError::AnswerTooLarge { len: 11, max: 10 })
    ));

    let outcome = loop_svc
        .answer(&handle, &Selection::Text(Some("0123456789".into())))
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Finished(_)));
}

#[tokio::test]
async fn branches_follow_the_answer() {
    let backend = local_backend(wellbeing_survey(SURVEY).unwrap()).await;
    let loop_svc = SessionLoopService::new(fixed_clock(), Arc::new(backend));
    let (handle, loaded) = loop_svc.start(SURVEY).await;
    loaded.unwrap();

    let outcome = loop_svc
        .answer(&handle, &Selection::Boolean(Some(true)))
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Next(ref q) if q.id() == QuestionId::new(4)));

    let outcome = loop_svc
        .answer(&handle, &Selection::Choice(BTreeSet::from([1])))
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Next(ref q) if q.id() == QuestionId::new(5)));

    loop_svc.skip(&handle).await.unwrap();
    let outcome = loop_svc.skip(&handle).await.unwrap();
    let SubmitOutcome::Finished(completion) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!((completion.answered, completion.skipped), (2, 2));
}

#[tokio::test]
async fn resumed_session_starts_where_the_status_points() {
    let backend = local_backend(vaccination_survey(SURVEY).unwrap()).await;
    let service: Arc<dyn SurveyService> = Arc::new(backend);
    let loop_svc = SessionLoopService::new(fixed_clock(), Arc::clone(&service));

    let (first, loaded) = loop_svc.start(SURVEY).await;
    loaded.unwrap();
    loop_svc
        .answer(&first, &Selection::Boolean(Some(true)))
        .await
        .unwrap();
    first.dispose().unwrap();

    let (second, loaded) = loop_svc.start(SURVEY).await;
    assert_eq!(current_id(&loaded.unwrap()), Some(2));
    assert_eq!(second.progress().unwrap().handled(), 0);
}

#[tokio::test]
async fn failed_submit_keeps_question_and_can_be_retried() {
    let flaky = Arc::new(FlakyService::new(
        local_backend(vaccination_survey(SURVEY).unwrap()).await,
    ));
    let loop_svc = SessionLoopService::new(fixed_clock(), flaky.clone());
    let (handle, loaded) = loop_svc.start(SURVEY).await;
    loaded.unwrap();

    flaky.fail_answer.store(true, Ordering::SeqCst);
    let err = loop_svc
        .answer(&handle, &Selection::Boolean(Some(true)))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(handle.state().unwrap(), SessionState::Active(ref q) if q.id() == QuestionId::new(1)));

    let outcome = loop_svc
        .answer(&handle, &Selection::Boolean(Some(true)))
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Next(_)));
    assert_eq!(handle.progress().unwrap().answered, 1);
}

#[tokio::test]
async fn retry_after_lost_reply_resumes_from_service_status() {
    let flaky = Arc::new(FlakyService::new(
        local_backend(vaccination_survey(SURVEY).unwrap()).await,
    ));
    let loop_svc = SessionLoopService::new(fixed_clock(), flaky.clone());
    let (handle, loaded) = loop_svc.start(SURVEY).await;
    loaded.unwrap();

    flaky.lose_reply.store(true, Ordering::SeqCst);
    let err = loop_svc
        .answer(&handle, &Selection::Boolean(Some(true)))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Storage(StorageError::Connection(_))));
    assert!(matches!(handle.state().unwrap(), SessionState::Active(ref q) if q.id() == QuestionId::new(1)));

    // The retry carries the consumed token; the session picks up the recorded answer.
    let outcome = loop_svc
        .answer(&handle, &Selection::Boolean(Some(true)))
        .await
        .unwrap();
    let SubmitOutcome::Next(question) = outcome else {
        panic!("expected next question, got {outcome:?}");
    };
    assert_eq!(question.id(), QuestionId::new(2));
    assert_eq!(handle.progress().unwrap().answered, 1);

    let outcome = loop_svc.skip(&handle).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Finished(_)));
    let recorded = flaky
        .inner
        .storage()
        .responses
        .responses_for(SURVEY)
        .await
        .unwrap();
    assert_eq!(recorded.len(), 2);
}

#[tokio::test]
async fn load_error_is_recoverable() {
    let flaky = Arc::new(FlakyService::new(
        local_backend(vaccination_survey(SURVEY).unwrap()).await,
    ));
    flaky.fail_status.store(true, Ordering::SeqCst);
    let loop_svc = SessionLoopService::new(fixed_clock(), flaky.clone());

    let (handle, loaded) = loop_svc.start(SURVEY).await;
    assert!(matches!(loaded, Err(SessionError::Storage(StorageError::Connection(_)))));
    assert!(matches!(handle.state().unwrap(), SessionState::LoadError(_)));

    let err = loop_svc
        .answer(&handle, &Selection::Boolean(Some(true)))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotActive));

    let state = loop_svc.load(&handle).await.unwrap();
    assert_eq!(current_id(&state), Some(1));
}

#[tokio::test]
async fn unknown_survey_ends_in_load_error() {
    let backend = local_backend(vaccination_survey(SURVEY).unwrap()).await;
    let loop_svc = SessionLoopService::new(fixed_clock(), Arc::new(backend));

    let (handle, loaded) = loop_svc.start(SurveyId::new(99)).await;
    assert!(matches!(loaded, Err(SessionError::Storage(StorageError::NotFound))));
    assert!(matches!(handle.state().unwrap(), SessionState::LoadError(_)));
}

#[tokio::test]
async fn repeated_identical_submit_is_not_counted_twice() {
    let services = AppServices::in_memory(fixed_clock());
    services
        .ensure_survey(&vaccination_survey(SURVEY).unwrap())
        .await
        .unwrap();
    let loop_svc = services.session_loop();
    let (handle, loaded) = loop_svc.start(SURVEY).await;
    loaded.unwrap();

    let response = handle
        .with(|s| {
            let question = s.current_question().cloned().unwrap();
            let token = s.status().unwrap().token.clone();
            AnswerBuilder::build(&question, &Selection::Boolean(Some(true)), &token)
        })
        .unwrap()
        .unwrap();

    let first = loop_svc.submit(&handle, response.clone()).await.unwrap();
    assert!(matches!(first, SubmitOutcome::Next(_)));
    let again = loop_svc.submit(&handle, response).await.unwrap();
    assert!(matches!(again, SubmitOutcome::Ignored));

    let recorded = services
        .storage()
        .unwrap()
        .responses
        .responses_for(SURVEY)
        .await
        .unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(handle.progress().unwrap().answered, 1);
}

#[tokio::test]
async fn second_submit_while_outstanding_is_ignored() {
    let gated = Arc::new(GatedService::new(
        local_backend(vaccination_survey(SURVEY).unwrap()).await,
    ));
    let loop_svc = Arc::new(SessionLoopService::new(fixed_clock(), gated.clone()));
    let (handle, loaded) = loop_svc.start(SURVEY).await;
    loaded.unwrap();

    let first = tokio::spawn({
        let loop_svc = Arc::clone(&loop_svc);
        let handle = handle.clone();
        async move {
            let selection = Selection::Boolean(Some(true));
            loop_svc.answer(&handle, &selection).await
        }
    });
    gated.entered.notified().await;
    assert!(handle.state().unwrap().is_busy());

    let second = loop_svc
        .answer(&handle, &Selection::Boolean(Some(false)))
        .await
        .unwrap();
    assert!(matches!(second, SubmitOutcome::Ignored));

    gated.release.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert!(matches!(outcome, SubmitOutcome::Next(ref q) if q.id() == QuestionId::new(2)));
    assert_eq!(gated.answers.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dispose_discards_outstanding_result() {
    let gated = Arc::new(GatedService::new(
        local_backend(vaccination_survey(SURVEY).unwrap()).await,
    ));
    let loop_svc = Arc::new(SessionLoopService::new(fixed_clock(), gated.clone()));
    let (handle, loaded) = loop_svc.start(SURVEY).await;
    loaded.unwrap();

    let pending = tokio::spawn({
        let loop_svc = Arc::clone(&loop_svc);
        let handle = handle.clone();
        async move {
            let selection = Selection::Boolean(Some(true));
            loop_svc.answer(&handle, &selection).await
        }
    });
    gated.entered.notified().await;
    handle.dispose().unwrap();
    gated.release.notify_one();

    let outcome = pending.await.unwrap().unwrap();
    assert!(matches!(outcome, SubmitOutcome::Discarded));
    assert_eq!(handle.progress().unwrap().answered, 0);
    assert!(matches!(
        loop_svc.skip(&handle).await,
        Err(SessionError::Disposed)
    ));
}

#[tokio::test]
async fn dropped_submit_frees_the_question() {
    let gated = Arc::new(GatedService::new(
        local_backend(vaccination_survey(SURVEY).unwrap()).await,
    ));
    let loop_svc = SessionLoopService::new(fixed_clock(), gated.clone());
    let (handle, loaded) = loop_svc.start(SURVEY).await;
    loaded.unwrap();

    let selection = Selection::Boolean(Some(true));
    let timed_out = tokio::time::timeout(
        Duration::from_millis(50),
        loop_svc.answer(&handle, &selection),
    )
    .await;
    assert!(timed_out.is_err());
    assert!(matches!(handle.state().unwrap(), SessionState::Active(_)));
}
