use std::env;
use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use storage::repository::StorageError;
use storage::service::SurveyService;
use survey_core::model::{
    AnswerId, QuestionId, Survey, SurveyId, SurveyResponse, SurveyStatus, SurveyToken,
};
use tracing::debug;

use crate::error::HttpServiceError;

#[derive(Clone)]
pub struct HttpSurveyConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl HttpSurveyConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Reads `SURVEY_API_BASE_URL` and the optional `SURVEY_API_KEY`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("SURVEY_API_BASE_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let api_key = env::var("SURVEY_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        Some(Self { base_url, api_key })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for HttpSurveyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSurveyConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .finish()
    }
}

/// `SurveyService` talking JSON to a remote survey API.
///
/// Endpoints, relative to the configured base URL:
/// - `GET surveys/{id}/status`
/// - `GET surveys/{id}`
/// - `POST surveys/{id}/answers`
#[derive(Clone)]
pub struct HttpSurveyService {
    client: Client,
    config: Option<HttpSurveyConfig>,
}

impl HttpSurveyService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(HttpSurveyConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<HttpSurveyConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// # Errors
    ///
    /// Returns `HttpServiceError` when the service is disabled, the request
    /// fails, or the body does not describe `survey_id`.
    pub async fn fetch_status(&self, survey_id: SurveyId) -> Result<SurveyStatus, HttpServiceError> {
        let config = self.config()?;
        let url = config.endpoint(&format!("surveys/{survey_id}/status"));
        debug!(%url, "fetching survey status");

        let dto: StatusDto = send(authorize(config, self.client.get(url))).await?;
        dto.into_status(survey_id, None)
    }

    /// # Errors
    ///
    /// Returns `HttpServiceError` when the service is disabled, the request
    /// fails, or the definition is invalid or belongs to another survey.
    pub async fn fetch_survey(&self, survey_id: SurveyId) -> Result<Survey, HttpServiceError> {
        let config = self.config()?;
        let url = config.endpoint(&format!("surveys/{survey_id}"));
        debug!(%url, "fetching survey definition");

        let survey: Survey = send(authorize(config, self.client.get(url))).await?;
        if survey.id() != survey_id {
            return Err(HttpServiceError::InvalidBody(format!(
                "expected survey {survey_id}, got {}",
                survey.id()
            )));
        }
        Ok(survey)
    }

    /// # Errors
    ///
    /// Returns `HttpServiceError` when the service is disabled, the request
    /// fails or is rejected, or the returned status is malformed.
    pub async fn post_answer(
        &self,
        status: &SurveyStatus,
        response: &SurveyResponse,
        next_question: Option<QuestionId>,
    ) -> Result<SurveyStatus, HttpServiceError> {
        let config = self.config()?;
        let url = config.endpoint(&format!("surveys/{}/answers", status.survey_id));
        let payload = AnswerRequest::new(response, next_question);
        debug!(
            %url,
            question_id = %response.question_id(),
            skipped = payload.skipped,
            "posting answer"
        );

        let dto: StatusDto = send(authorize(config, self.client.post(url)).json(&payload)).await?;
        dto.into_status(status.survey_id, Some(&status.title))
    }

    fn config(&self) -> Result<&HttpSurveyConfig, HttpServiceError> {
        self.config.as_ref().ok_or(HttpServiceError::Disabled)
    }
}

#[async_trait]
impl SurveyService for HttpSurveyService {
    async fn get_survey_status(&self, survey_id: SurveyId) -> Result<SurveyStatus, StorageError> {
        Ok(self.fetch_status(survey_id).await?)
    }

    async fn get_survey(&self, survey_id: SurveyId) -> Result<Survey, StorageError> {
        Ok(self.fetch_survey(survey_id).await?)
    }

    async fn answer(
        &self,
        status: &SurveyStatus,
        response: &SurveyResponse,
        next_question: Option<QuestionId>,
    ) -> Result<SurveyStatus, StorageError> {
        Ok(self.post_answer(status, response, next_question).await?)
    }
}

fn authorize(config: &HttpSurveyConfig, request: RequestBuilder) -> RequestBuilder {
    match &config.api_key {
        Some(key) => request.bearer_auth(key),
        None => request,
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, HttpServiceError> {
    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(HttpServiceError::HttpStatus(response.status()));
    }
    Ok(response.json().await?)
}

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRequest<'a> {
    question_id: QuestionId,
    survey_token: &'a SurveyToken,
    skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    bool_answer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    answer_ids: Option<&'a [AnswerId]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_answer: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checklist_answer: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    number_answer: Option<f64>,
    next_question_id: Option<QuestionId>,
}

impl<'a> AnswerRequest<'a> {
    fn new(response: &'a SurveyResponse, next_question: Option<QuestionId>) -> Self {
        Self {
            question_id: response.question_id(),
            survey_token: response.survey_token(),
            skipped: response.is_skipped(),
            bool_answer: response.bool_answer(),
            answer_ids: response.answer_ids(),
            text_answer: response.text_answer(),
            checklist_answer: response.checklist_answer(),
            number_answer: response.number_answer(),
            next_question_id: next_question,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusDto {
    survey_id: SurveyId,
    #[serde(default)]
    title: Option<String>,
    survey_token: SurveyToken,
    #[serde(default)]
    next_question_id: Option<QuestionId>,
}

impl StatusDto {
    fn into_status(
        self,
        expected: SurveyId,
        fallback_title: Option<&str>,
    ) -> Result<SurveyStatus, HttpServiceError> {
        if self.survey_id != expected {
            return Err(HttpServiceError::InvalidBody(format!(
                "expected status for survey {expected}, got {}",
                self.survey_id
            )));
        }
        if self.survey_token.as_str().trim().is_empty() {
            return Err(HttpServiceError::InvalidBody("empty survey token".into()));
        }
        let title = self
            .title
            .or_else(|| fallback_title.map(str::to_owned))
            .unwrap_or_default();
        Ok(SurveyStatus::new(
            self.survey_id,
            title,
            self.survey_token,
            self.next_question_id,
        ))
    }
}
