//! Conversational core of the Shadow assistant
//!
//! Features:
//! - Four-tier intent classification with a reminder fast-path
//! - Follow-up resolution against conversation context
//! - Bounded conversation context with mood tracking
//! - Dispatch to capability services under timeouts
//! - Localized response templates (English, Urdu, Pashto)
//! - Background outbound message queue
//! - Voice loop over any [`shadow_core::SpeechIo`]

pub mod assistant;
pub mod classifier;
pub mod composer;
pub mod context;
pub mod dispatcher;
pub mod queue;
pub mod timeparse;

pub use assistant::{Assistant, AssistantBuilder, Turn, EMPTY_INPUT_REPLY, GENERIC_ERROR_REPLY};
pub use classifier::IntentClassifier;
pub use composer::{ActionCategory, Question, ResponseComposer, TemplateKey};
pub use context::{ContextSnapshot, ContextStore, ConversationState};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use queue::{MessageQueue, OutboundMessage, QueueStats};

use thiserror::Error;

/// Agent errors
///
/// Only construction can fail. A running turn always produces a reply.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Text processing error: {0}")]
    TextProcessing(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Message queue is full")]
    QueueFull,

    #[error("Message queue is closed")]
    QueueClosed,
}

impl From<shadow_text_processing::TableError> for AgentError {
    fn from(err: shadow_text_processing::TableError) -> Self {
        AgentError::TextProcessing(err.to_string())
    }
}

impl From<shadow_llm::LlmError> for AgentError {
    fn from(err: shadow_llm::LlmError) -> Self {
        AgentError::Llm(err.to_string())
    }
}

impl From<shadow_tools::CapabilityError> for AgentError {
    fn from(err: shadow_tools::CapabilityError) -> Self {
        AgentError::Capability(err.to_string())
    }
}

impl From<shadow_config::ConfigError> for AgentError {
    fn from(err: shadow_config::ConfigError) -> Self {
        AgentError::Config(err.to_string())
    }
}
