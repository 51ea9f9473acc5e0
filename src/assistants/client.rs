use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::types::{
    ApiError, ApiResult, Assistant, CreateAssistant, CreateMessage, CreateRun, Message,
    MessageList, Role, Run, Thread,
};
use crate::config::{self, ApiSettings};

/// Operations against a hosted Assistants service.
///
/// Implementations are stateless pass-throughs: no retries, no caching and no
/// checks on what the service returns.
#[async_trait]
pub trait AssistantsApi: Send + Sync {
    async fn create_assistant(&self, request: &CreateAssistant) -> ApiResult<Assistant>;

    async fn create_thread(&self) -> ApiResult<Thread>;

    async fn add_message(&self, thread_id: &str, role: Role, content: &str) -> ApiResult<Message>;

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: Option<&str>,
    ) -> ApiResult<Run>;

    async fn get_run(&self, thread_id: &str, run_id: &str) -> ApiResult<Run>;

    /// Messages of a thread, newest first
    async fn list_messages(&self, thread_id: &str) -> ApiResult<MessageList>;

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> ApiResult<Run>;
}

/// HTTP client for the Assistants API (v2)
pub struct AssistantsClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl AssistantsClient {
    pub fn new(api_key: impl Into<String>) -> ApiResult<Self> {
        Self::build(
            api_key.into(),
            config::DEFAULT_BASE_URL,
            Duration::from_secs(config::DEFAULT_REQUEST_TIMEOUT),
        )
    }

    /// Build a client from configuration. Fails when no API key is configured.
    pub fn from_settings(settings: &ApiSettings) -> ApiResult<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| ApiError::Config(format!("{} is not set", config::ENV_API_KEY)))?;
        Self::build(
            api_key,
            &settings.base_url,
            Duration::from_secs(settings.request_timeout),
        )
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build(api_key: String, base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("OpenAI-Beta", HeaderValue::from_static("assistants=v2"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(self.client.get(self.url(path))).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = request.bearer_auth(&self.api_key).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl AssistantsApi for AssistantsClient {
    async fn create_assistant(&self, request: &CreateAssistant) -> ApiResult<Assistant> {
        let assistant: Assistant = self.post("/assistants", request).await?;
        tracing::info!("Created assistant: {}", assistant.id);
        Ok(assistant)
    }

    async fn create_thread(&self) -> ApiResult<Thread> {
        let thread: Thread = self.post("/threads", &serde_json::json!({})).await?;
        tracing::info!("Created thread: {}", thread.id);
        Ok(thread)
    }

    async fn add_message(&self, thread_id: &str, role: Role, content: &str) -> ApiResult<Message> {
        let body = CreateMessage { role, content };
        let message: Message = self
            .post(&format!("/threads/{}/messages", thread_id), &body)
            .await?;
        tracing::info!("Added message {} to thread {}", message.id, thread_id);
        Ok(message)
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: Option<&str>,
    ) -> ApiResult<Run> {
        let body = CreateRun { assistant_id, instructions };
        let run: Run = self
            .post(&format!("/threads/{}/runs", thread_id), &body)
            .await?;
        tracing::info!("Started run: {}", run.id);
        Ok(run)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> ApiResult<Run> {
        self.get(&format!("/threads/{}/runs/{}", thread_id, run_id))
            .await
    }

    async fn list_messages(&self, thread_id: &str) -> ApiResult<MessageList> {
        self.get(&format!("/threads/{}/messages?order=desc", thread_id))
            .await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> ApiResult<Run> {
        self.post(
            &format!("/threads/{}/runs/{}/cancel", thread_id, run_id),
            &serde_json::json!({}),
        )
        .await
    }
}

/// Pull `error.message` out of an error body, or fall back to the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
