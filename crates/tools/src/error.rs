//! Capability errors

use thiserror::Error;

/// Errors raised inside capability services
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Not permitted: {0}")]
    NotPermitted(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CapabilityError {
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    pub fn not_permitted(msg: impl Into<String>) -> Self {
        Self::NotPermitted(msg.into())
    }
}

impl From<reqwest::Error> for CapabilityError {
    fn from(err: reqwest::Error) -> Self {
        CapabilityError::Http(err.to_string())
    }
}

impl From<CapabilityError> for shadow_core::Error {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::InvalidParams(msg) => shadow_core::Error::InvalidParams(msg),
            CapabilityError::Unavailable(msg) => shadow_core::Error::Unavailable(msg),
            other => shadow_core::Error::Capability(other.to_string()),
        }
    }
}
