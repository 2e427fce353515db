use std::sync::Arc;

use dioxus::core::NoOpMutations;
use dioxus::prelude::*;
use dioxus_router::{Routable, Router};
use services::{AppServices, Clock, SessionLoopService, SurveyService};
use survey_core::model::{Survey, SurveyId};
use survey_core::time::fixed_now;

use crate::context::{UiApp, build_app_context};
use crate::views::SurveyView;

#[derive(Clone)]
struct TestApp {
    survey_id: SurveyId,
    session_loop: Arc<SessionLoopService>,
}

impl UiApp for TestApp {
    fn survey_id(&self) -> SurveyId {
        self.survey_id
    }

    fn session_loop(&self) -> Arc<SessionLoopService> {
        Arc::clone(&self.session_loop)
    }
}

#[derive(Props, Clone)]
struct ViewHarnessProps {
    app: Arc<TestApp>,
}

impl PartialEq for ViewHarnessProps {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for ViewHarnessProps {}

#[component]
fn ViewRouterHarness(props: ViewHarnessProps) -> Element {
    let app: Arc<dyn UiApp> = props.app.clone();
    use_context_provider(|| build_app_context(&app));
    rsx! { Router::<TestRoute> {} }
}

#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum TestRoute {
    #[route("/")]
    Root {},
}

#[component]
fn Root() -> Element {
    rsx! { SurveyView {} }
}

pub struct ViewHarness {
    pub dom: VirtualDom,
}

impl ViewHarness {
    pub fn rebuild(&mut self) {
        self.dom.rebuild_in_place();
        drive_dom(&mut self.dom);
    }

    pub async fn drive_async(&mut self) {
        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            self.dom.wait_for_work(),
        )
        .await;
        self.dom.render_immediate(&mut NoOpMutations);
        self.dom.process_events();
    }

    pub fn render(&self) -> String {
        dioxus_ssr::render(&self.dom)
    }
}

pub fn drive_dom(dom: &mut VirtualDom) {
    dom.process_events();
    dom.render_immediate(&mut NoOpMutations);
    dom.process_events();
}

pub async fn setup_survey_harness(survey: Survey) -> ViewHarness {
    let services = AppServices::in_memory(Clock::fixed(fixed_now()));
    services.ensure_survey(&survey).await.expect("seed survey");
    setup_with_service(survey.id(), services.survey_service())
}

pub fn setup_with_service(survey_id: SurveyId, service: Arc<dyn SurveyService>) -> ViewHarness {
    let session_loop = Arc::new(SessionLoopService::new(Clock::fixed(fixed_now()), service));
    let app = Arc::new(TestApp {
        survey_id,
        session_loop,
    });
    let dom = VirtualDom::new_with_props(ViewRouterHarness, ViewHarnessProps { app });
    ViewHarness { dom }
}
