//! Configuration management for the Shadow assistant
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default`, `config/{env}`)
//! - Environment variables (`SHADOW__` prefix, `__` separator)
//!
//! Tunable classifier thresholds, rate-limit budgets, timeouts and the
//! real/no-op choice for each capability all live in [`Settings`].

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, AssistantConfig, AutomationConfig, CapabilitiesConfig, CapabilityMode,
    ClassifierConfig, DispatchConfig, FileOpsConfig, KnowledgeConfig, LlmProvider,
    LlmSettings, MessagingConfig, ObservabilityConfig, QueueConfig, RateLimitConfig,
    ServerConfig, ServerMode, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
