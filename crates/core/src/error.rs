//! Error types shared across the assistant crates

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Capability unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a timeout error for a named operation
    pub fn timeout(operation: impl Into<String>, after: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after_ms: after.as_millis() as u64,
        }
    }

    /// Whether this error came from a deadline rather than a failure
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether this error came from an exhausted request budget
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Result alias using the core error
pub type Result<T> = std::result::Result<T, Error>;
