//! Text generation: a single-attempt backend behind a retrying client.

use std::sync::Arc;

use async_trait::async_trait;
use devlog_shared::{DevlogError, GenerationError, GenerationSettings, Result, read_api_key};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::retry::{RetryExhausted, RetryPolicy};

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("devlog/", env!("CARGO_PKG_VERSION"));

/// Longest response body kept in a `Rejected` error.
const MAX_ERROR_BODY: usize = 500;

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// One attempt at turning a prompt into text. Retrying is the caller's job.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete_once(
        &self,
        prompt: &str,
        max_tokens: u32,
    ) -> std::result::Result<String, GenerationError>;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible chat completions
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Chat completions over HTTP with bearer auth.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleBackend {
    http: Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiCompatibleBackend {
    pub fn new(settings: &GenerationSettings, api_key: impl Into<String>) -> Result<Self> {
        Url::parse(&settings.api_url).map_err(|e| {
            DevlogError::config(format!("invalid generation API URL {}: {e}", settings.api_url))
        })?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| DevlogError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url: settings.api_url.clone(),
            api_key: api_key.into(),
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }

    /// Build a backend reading the key from `settings.api_key_env`.
    pub fn from_env(settings: &GenerationSettings) -> Result<Self> {
        let key = read_api_key(&settings.api_key_env)?;
        Self::new(settings, key)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatibleBackend {
    async fn complete_once(
        &self,
        prompt: &str,
        max_tokens: u32,
    ) -> std::result::Result<String, GenerationError> {
        let request = ChatCompletionsRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens,
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(GenerationError::RateLimited { retry_after_secs });
        }
        if status.is_server_error() {
            return Err(GenerationError::Network(format!("HTTP {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(GenerationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(transport_error)?;
        let parsed: ChatCompletionsResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::MalformedResponse(format!("invalid JSON: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::MalformedResponse("no choices[0].message.content".into()))?;

        if content.trim().is_empty() {
            return Err(GenerationError::MalformedResponse("empty content".into()));
        }

        debug!(chars = content.len(), "completion received");
        Ok(content)
    }
}

fn transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout(e.to_string())
    } else {
        GenerationError::Network(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// GenerationClient
// ---------------------------------------------------------------------------

/// Prompt in, text out, with bounded retries. Holds no per-call state.
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn CompletionBackend>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Complete `prompt`, retrying per the policy. Never panics on failure.
    #[instrument(skip_all, fields(max_tokens, prompt_chars = prompt.len()))]
    pub async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
    ) -> std::result::Result<String, RetryExhausted> {
        self.policy
            .run("completion", |_| self.backend.complete_once(prompt, max_tokens))
            .await
    }
}
