//! Capability service traits
//!
//! Each capability has a real and a no-op implementation in the tools crate.
//! The dispatcher only ever talks to these traits.

use async_trait::async_trait;

use crate::{CapabilityResult, FileAction, KnowledgeQuery, Parameters, Result, ScheduleRequest};

/// Outbound messaging (WhatsApp, SMS, ...)
#[async_trait]
pub trait Messenger: Send + Sync + 'static {
    async fn send_message(&self, platform: &str, contact: &str, body: &str)
        -> Result<CapabilityResult>;
}

/// Reminders, timers and alarms
#[async_trait]
pub trait Scheduler: Send + Sync + 'static {
    async fn schedule(&self, request: ScheduleRequest) -> Result<CapabilityResult>;

    async fn list(&self) -> Result<CapabilityResult>;

    async fn cancel(&self, task_id: u64) -> Result<CapabilityResult>;
}

/// Information lookups
#[async_trait]
pub trait KnowledgeService: Send + Sync + 'static {
    async fn lookup(&self, query: KnowledgeQuery) -> Result<CapabilityResult>;
}

/// Desktop and system automation
///
/// Actions are verbs such as `open_app`, `open_url`, `volume_down`,
/// `shutdown`. Unknown actions answer with a failed result.
#[async_trait]
pub trait Automation: Send + Sync + 'static {
    async fn automate(&self, action: &str, params: &Parameters) -> Result<CapabilityResult>;
}

/// File management
#[async_trait]
pub trait FileOps: Send + Sync + 'static {
    async fn run(&self, action: FileAction) -> Result<CapabilityResult>;
}
