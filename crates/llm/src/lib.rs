//! AI completion backends
//!
//! Features:
//! - Ollama and OpenAI-compatible (OpenAI, Azure) chat backends
//! - Retry with exponential backoff for transient failures
//! - Injected per-minute/per-day request budget
//! - Factory building a ready `LanguageModel` from settings

pub mod backend;
pub mod factory;
pub mod rate_limit;

pub use backend::{BackendConfig, OllamaBackend, OpenAIBackend};
pub use factory::{LlmFactory, RateLimitedModel};
pub use rate_limit::{RateLimiter, RateLimitUsage};

use std::time::Duration;

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Only transport failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Network(_) | LlmError::Timeout(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

impl From<LlmError> for shadow_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::RateLimited(msg) => shadow_core::Error::RateLimited(msg),
            LlmError::Timeout(after) => shadow_core::Error::timeout("language model request", after),
            other => shadow_core::Error::Llm(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_keeps_kind() {
        let core: shadow_core::Error = LlmError::RateLimited("minute".into()).into();
        assert!(core.is_rate_limited());

        let core: shadow_core::Error = LlmError::Timeout(Duration::from_secs(2)).into();
        assert!(core.is_timeout());

        let core: shadow_core::Error = LlmError::Api("bad key".into()).into();
        assert!(matches!(core, shadow_core::Error::Llm(_)));
    }

    #[test]
    fn test_retryable() {
        assert!(LlmError::Network("reset".into()).is_retryable());
        assert!(LlmError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!LlmError::Api("400".into()).is_retryable());
        assert!(!LlmError::RateLimited("day".into()).is_retryable());
    }
}
