//! Chat completion backends
//!
//! Both backends implement the core `LanguageModel` contract: a list of
//! chat messages in, the assistant's reply text out. Transient failures
//! (connection errors, 5xx, transport timeouts) are retried with
//! exponential backoff; 4xx responses fail immediately.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use shadow_config::{LlmProvider, LlmSettings};
use shadow_core::{LanguageModel, Message, Result};

use crate::LlmError;

/// Azure OpenAI REST API version used for chat completions
pub const AZURE_API_VERSION: &str = "2024-02-01";

/// Backend configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Model name/ID (Azure: deployment name)
    pub model: String,
    /// API base URL
    pub endpoint: String,
    /// API key (optional for local servers)
    pub api_key: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
    /// Azure API version; switches URL and auth header format
    pub api_version: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: "qwen2.5:3b-instruct-q4_K_M".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            api_key: None,
            max_tokens: 512,
            temperature: 0.7,
            timeout: Duration::from_secs(25),
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            api_version: None,
        }
    }
}

impl From<&LlmSettings> for BackendConfig {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            model: settings.model.clone(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: Duration::from_secs(settings.timeout_secs),
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            api_version: (settings.provider == LlmProvider::Azure)
                .then(|| AZURE_API_VERSION.to_string()),
        }
    }
}

fn build_client(timeout: Duration) -> std::result::Result<Client, LlmError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

/// Map a transport error, keeping timeouts distinct
fn transport_error(err: reqwest::Error, timeout: Duration) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout(timeout)
    } else {
        LlmError::from(err)
    }
}

/// Run `attempt` until it succeeds, fails permanently, or retries run out
async fn with_retries<T, F, Fut>(config: &BackendConfig, mut attempt: F) -> std::result::Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, LlmError>>,
{
    let mut last_error = None;
    let mut backoff = config.initial_backoff;

    for n in 0..=config.max_retries {
        if n > 0 {
            tracing::warn!(
                "LLM request failed, retrying in {:?} (attempt {}/{})",
                backoff,
                n,
                config.max_retries
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }

        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => last_error = Some(e),
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| LlmError::Network("Max retries exceeded".to_string())))
}

/// Turn a non-success HTTP response into an error; 5xx stays retryable
async fn check_status(response: reqwest::Response) -> std::result::Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        Err(LlmError::Network(format!("Server error {}: {}", status, body)))
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        Err(LlmError::RateLimited(format!("HTTP {}: {}", status, body)))
    } else {
        Err(LlmError::Api(format!("HTTP {}: {}", status, body)))
    }
}

// =============================================================================
// Ollama
// =============================================================================

/// Ollama `/api/chat` backend
#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    config: BackendConfig,
}

impl OllamaBackend {
    pub fn new(config: BackendConfig) -> std::result::Result<Self, LlmError> {
        let client = build_client(config.timeout)?;
        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint, path)
    }

    async fn execute_request(&self, request: &OllamaChatRequest) -> std::result::Result<String, LlmError> {
        let response = self
            .client
            .post(self.api_url("/chat"))
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;

        let body: OllamaChatResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(body.message.content)
    }

    /// Send a chat request with retries
    pub async fn chat(&self, messages: &[Message]) -> std::result::Result<String, LlmError> {
        let request = OllamaChatRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(ChatMessage::from).collect(),
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens as i32,
            },
        };

        with_retries(&self.config, || self.execute_request(&request)).await
    }
}

#[async_trait]
impl LanguageModel for OllamaBackend {
    async fn ask(&self, messages: &[Message]) -> Result<String> {
        Ok(self.chat(messages).await?)
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(self.api_url("/tags"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: i32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

// =============================================================================
// OpenAI-compatible
// =============================================================================

/// OpenAI-compatible chat completions backend
///
/// Works with OpenAI, Azure OpenAI (when `api_version` is set) and local
/// servers exposing `/v1/chat/completions`.
pub struct OpenAIBackend {
    client: Client,
    config: BackendConfig,
}

impl OpenAIBackend {
    pub fn new(config: BackendConfig) -> std::result::Result<Self, LlmError> {
        let is_local = config.endpoint.starts_with("http://localhost")
            || config.endpoint.starts_with("http://127.0.0.1");
        if config.api_key.is_none() && !is_local {
            return Err(LlmError::Configuration(
                "API key required for remote endpoints".to_string(),
            ));
        }

        let client = build_client(config.timeout)?;
        Ok(Self { client, config })
    }

    fn chat_url(&self) -> String {
        match &self.config.api_version {
            // Azure: {endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...
            Some(api_version) => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.config.endpoint, self.config.model, api_version
            ),
            None => format!("{}/chat/completions", self.config.endpoint),
        }
    }

    fn build_headers(&self) -> reqwest::header::HeaderMap {
        use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

        let mut headers = HeaderMap::new();
        let Some(key) = self.config.api_key.as_deref() else {
            return headers;
        };

        if self.config.api_version.is_some() {
            if let Ok(val) = HeaderValue::from_str(key) {
                headers.insert("api-key", val);
            }
        } else if let Ok(val) = HeaderValue::from_str(&format!("Bearer {}", key)) {
            headers.insert(AUTHORIZATION, val);
        }
        headers
    }

    async fn execute_request(&self, request: &OpenAIChatRequest) -> std::result::Result<String, LlmError> {
        let response = self
            .client
            .post(self.chat_url())
            .headers(self.build_headers())
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;

        let body: OpenAIChatResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))
    }

    /// Send a chat request with retries
    pub async fn chat(&self, messages: &[Message]) -> std::result::Result<String, LlmError> {
        let request = OpenAIChatRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(ChatMessage::from).collect(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        with_retries(&self.config, || self.execute_request(&request)).await
    }
}

#[async_trait]
impl LanguageModel for OpenAIBackend {
    async fn ask(&self, messages: &[Message]) -> Result<String> {
        Ok(self.chat(messages).await?)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: ChatMessage,
}

/// Wire format shared by both APIs
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
}

impl From<&Message> for ChatMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.to_string(),
            content: msg.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_retries: u32) -> BackendConfig {
        BackendConfig {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let calls = AtomicU32::new(0);
        let result = with_retries(&fast_config(2), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LlmError::Network("reset".into()))
            } else {
                Ok("hello")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "hello");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_api_errors() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<(), _> = with_retries(&fast_config(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::Api("401".into()))
        })
        .await;

        assert!(matches!(result, Err(LlmError::Api(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<(), _> = with_retries(&fast_config(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::Timeout(Duration::from_secs(1)))
        })
        .await;

        assert!(matches!(result, Err(LlmError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_azure_url_and_headers() {
        let backend = OpenAIBackend::new(BackendConfig {
            endpoint: "https://example.openai.azure.com".into(),
            model: "gpt-4o".into(),
            api_key: Some("secret".into()),
            api_version: Some(AZURE_API_VERSION.into()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            backend.chat_url(),
            format!(
                "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version={}",
                AZURE_API_VERSION
            )
        );
        assert!(backend.build_headers().contains_key("api-key"));
    }

    #[test]
    fn test_remote_openai_requires_key() {
        let result = OpenAIBackend::new(BackendConfig {
            endpoint: "https://api.openai.com/v1".into(),
            ..Default::default()
        });
        assert!(matches!(result, Err(LlmError::Configuration(_))));
    }

    #[test]
    fn test_config_from_settings() {
        let settings = LlmSettings {
            provider: LlmProvider::Azure,
            model: "deploy".into(),
            endpoint: "https://x.azure.com/".into(),
            api_key: Some(String::new()),
            max_tokens: 128,
            temperature: 0.2,
            timeout_secs: 5,
            max_retries: 1,
            initial_backoff_ms: 50,
        };
        let config = BackendConfig::from(&settings);
        assert_eq!(config.endpoint, "https://x.azure.com");
        assert_eq!(config.api_key, None);
        assert_eq!(config.api_version.as_deref(), Some(AZURE_API_VERSION));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
