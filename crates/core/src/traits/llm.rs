//! Language Model trait

use async_trait::async_trait;

use crate::{Message, Result};

/// AI completion service
///
/// Implementations:
/// - `OllamaBackend` - local Ollama inference
/// - `OpenAIBackend` - OpenAI-compatible APIs (OpenAI, Azure, vLLM)
///
/// Callers must assume latency in the order of seconds and apply their own
/// timeout around [`LanguageModel::ask`].
///
/// # Example
///
/// ```ignore
/// let llm: Arc<dyn LanguageModel> = LlmFactory::create(&settings.llm, limiter)?;
/// let reply = llm.ask(&[Message::user("Tell me a joke")]).await?;
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Send an ordered list of `{role, content}` messages and return the reply text
    async fn ask(&self, messages: &[Message]) -> Result<String>;

    /// Check if the backend is reachable
    async fn is_available(&self) -> bool {
        true
    }

    /// Model name for logging
    fn model_name(&self) -> &str;
}
