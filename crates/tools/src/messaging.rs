//! Outbound messaging
//!
//! The real backend posts `{platform, contact, message}` JSON to a webhook
//! (a WhatsApp/SMS bridge). Delivery is always asynchronous from the
//! user's point of view: the agent queues sends and a worker calls these.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use shadow_core::{CapabilityResult, Messenger, Result};

use crate::CapabilityError;

/// Platforms a message can go out on
pub const SUPPORTED_PLATFORMS: &[&str] = &["whatsapp", "sms"];

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    platform: &'a str,
    contact: &'a str,
    message: &'a str,
}

/// Messenger posting to an HTTP webhook
#[derive(Clone)]
pub struct WebhookMessenger {
    client: Client,
    url: String,
}

impl WebhookMessenger {
    pub fn new(url: impl Into<String>, timeout: Duration) -> std::result::Result<Self, CapabilityError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CapabilityError::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

fn validate(platform: &str, contact: &str, body: &str) -> std::result::Result<(), CapabilityError> {
    if !SUPPORTED_PLATFORMS.contains(&platform) {
        return Err(CapabilityError::invalid_params(format!("unsupported platform '{}'", platform)));
    }
    if contact.trim().is_empty() {
        return Err(CapabilityError::invalid_params("missing recipient"));
    }
    if body.trim().is_empty() {
        return Err(CapabilityError::invalid_params("missing message body"));
    }
    Ok(())
}

#[async_trait]
impl Messenger for WebhookMessenger {
    async fn send_message(&self, platform: &str, contact: &str, body: &str) -> Result<CapabilityResult> {
        validate(platform, contact, body)?;

        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload {
                platform,
                contact,
                message: body,
            })
            .send()
            .await
            .map_err(CapabilityError::from)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(%status, platform, contact, "Message delivery failed");
            return Ok(CapabilityResult::failure(format!("HTTP {}: {}", status, detail)));
        }

        tracing::info!(platform, contact, "Message delivered");
        Ok(CapabilityResult::ok(format!("Message sent to {} via {}.", contact, platform)))
    }
}

/// Messenger used when delivery is switched off
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMessenger;

#[async_trait]
impl Messenger for NoOpMessenger {
    async fn send_message(&self, platform: &str, contact: &str, body: &str) -> Result<CapabilityResult> {
        validate(platform, contact, body)?;
        tracing::debug!(platform, contact, "Messaging disabled, dropping message");
        Ok(CapabilityResult::failure("Messaging is not enabled."))
    }
}
