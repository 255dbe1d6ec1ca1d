use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use cofoundry_core::config::{LlmConfig, LlmProvider};

const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const AZURE_API_VERSION: &str = "2024-06-01";

/// Provider failures are split by whether a retry could help. Timeouts,
/// connection failures, 429 and 5xx are transient; everything else
/// (authentication, bad request, malformed response body) is permanent.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("transient llm failure: {message}")]
    Transient { message: String },
    #[error("permanent llm failure: {message}")]
    Permanent { message: String },
}

impl LlmError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub(crate) fn transient(message: impl Into<String>) -> Self {
        Self::Transient { message: message.into() }
    }

    pub(crate) fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent { message: message.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self { system: system.into(), user: user.into(), temperature: 0.2, max_tokens: 700 }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, base_delay: Duration::from_millis(500) }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Bounded-retry decorator. Only transient failures are retried; permanent
/// failures propagate immediately.
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C> RetryingClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<C> LlmClient for RetryingClient<C>
where
    C: LlmClient,
{
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let mut attempt = 0u32;
        loop {
            match self.inner.complete(request).await {
                Ok(text) => return Ok(text),
                Err(error) if error.is_transient() && attempt < self.policy.max_retries => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    tracing::warn!(
                        event_name = "agent.llm.retry",
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "transient llm failure, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Chat-completions client for OpenAI and Azure OpenAI deployments.
pub struct OpenAiClient {
    http: Client,
    provider: LlmProvider,
    api_key: String,
    model: String,
    endpoint: Option<String>,
    deployment: Option<String>,
}

impl OpenAiClient {
    /// Returns `None` when the configuration carries no usable credentials;
    /// callers then run without LLM enrichment.
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }

        let api_key = config.api_key.as_ref()?.expose_secret().trim().to_string();
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .ok()?;

        Some(Self {
            http,
            provider: config.provider,
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            deployment: config.deployment.clone(),
        })
    }

    fn request_url(&self) -> String {
        match self.provider {
            LlmProvider::OpenAi => OPENAI_CHAT_COMPLETIONS_URL.to_string(),
            LlmProvider::AzureOpenAi => {
                let endpoint =
                    self.endpoint.as_deref().unwrap_or_default().trim_end_matches('/');
                let deployment = self.deployment.as_deref().unwrap_or_default();
                format!(
                    "{endpoint}/openai/deployments/{deployment}/chat/completions\
                     ?api-version={AZURE_API_VERSION}"
                )
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let mut payload = json!({
            "messages": [
                {"role": "system", "content": request.system.as_str()},
                {"role": "user", "content": request.user.as_str()},
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if self.provider == LlmProvider::OpenAi {
            payload["model"] = json!(self.model);
        }

        let mut builder = self.http.post(self.request_url()).json(&payload);
        builder = match self.provider {
            LlmProvider::OpenAi => builder.bearer_auth(&self.api_key),
            LlmProvider::AzureOpenAi => builder.header("api-key", &self.api_key),
        };

        let response = builder.send().await.map_err(|error| {
            if error.is_timeout() || error.is_connect() {
                LlmError::transient(format!("request failed: {error}"))
            } else {
                LlmError::transient(format!("transport failure: {error}"))
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(LlmError::transient(format!("provider returned {status}")));
        }
        if !status.is_success() {
            return Err(LlmError::permanent(format!("provider returned {status}")));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|error| LlmError::permanent(format!("malformed completion body: {error}")))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::permanent("completion carried no content".to_string()))
    }
}

/// Pulls the outermost `{...}` window out of a completion that wraps its JSON
/// in prose or code fences.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end >= start {
        Some(&text[start..=end])
    } else {
        None
    }
}
