//! LLM Factory
//!
//! Builds the configured completion backend and wraps it with the shared
//! request budget.

use std::sync::Arc;

use async_trait::async_trait;

use shadow_config::{LlmProvider, LlmSettings};
use shadow_core::{LanguageModel, Message, Result};

use crate::backend::{BackendConfig, OllamaBackend, OpenAIBackend};
use crate::rate_limit::RateLimiter;
use crate::LlmError;

/// Factory for creating language models
pub struct LlmFactory;

impl LlmFactory {
    /// Create the backend named by `settings.provider`
    ///
    /// `LlmProvider::None` yields `Ok(None)`: the assistant runs without
    /// AI classification or chat.
    pub fn create(settings: &LlmSettings) -> std::result::Result<Option<Arc<dyn LanguageModel>>, LlmError> {
        let config = BackendConfig::from(settings);
        let model: Arc<dyn LanguageModel> = match settings.provider {
            LlmProvider::Ollama => Arc::new(OllamaBackend::new(config)?),
            LlmProvider::OpenAI | LlmProvider::Azure => Arc::new(OpenAIBackend::new(config)?),
            LlmProvider::None => {
                tracing::info!("No AI provider configured");
                return Ok(None);
            }
        };

        tracing::info!(
            provider = ?settings.provider,
            model = %model.model_name(),
            "Created language model"
        );
        Ok(Some(model))
    }

    /// Create the backend and put it behind `limiter`
    pub fn create_rate_limited(
        settings: &LlmSettings,
        limiter: Arc<RateLimiter>,
    ) -> std::result::Result<Option<Arc<dyn LanguageModel>>, LlmError> {
        Ok(Self::create(settings)?
            .map(|inner| Arc::new(RateLimitedModel::new(inner, limiter)) as Arc<dyn LanguageModel>))
    }
}

/// Language model that spends one budget unit per request
///
/// An exhausted budget short-circuits with `Error::RateLimited` before any
/// network call is made.
pub struct RateLimitedModel {
    inner: Arc<dyn LanguageModel>,
    limiter: Arc<RateLimiter>,
}

impl RateLimitedModel {
    pub fn new(inner: Arc<dyn LanguageModel>, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

#[async_trait]
impl LanguageModel for RateLimitedModel {
    async fn ask(&self, messages: &[Message]) -> Result<String> {
        self.limiter.try_acquire()?;

        let result = self.inner.ask(messages).await;
        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("shadow_ai_requests_total", "outcome" => outcome).increment(1);
        result
    }

    async fn is_available(&self) -> bool {
        self.inner.is_available().await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
