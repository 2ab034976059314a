//! Capability Registry
//!
//! Holds one implementation per capability, chosen once at startup from
//! configuration. The dispatcher only sees the trait objects.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use shadow_config::{CapabilitiesConfig, CapabilityMode};
use shadow_core::{Automation, FileOps, KnowledgeService, Messenger, Scheduler};

use crate::automation::{NoOpAutomation, ProcessAutomation};
use crate::file_ops::{LocalFileOps, NoOpFileOps};
use crate::knowledge::{HttpKnowledge, NoOpKnowledge};
use crate::messaging::{NoOpMessenger, WebhookMessenger};
use crate::scheduler::{Notification, NoOpScheduler, TokioScheduler};
use crate::CapabilityError;

/// The set of capability services the dispatcher routes to
#[derive(Clone)]
pub struct CapabilityRegistry {
    pub messenger: Arc<dyn Messenger>,
    pub scheduler: Arc<dyn Scheduler>,
    pub knowledge: Arc<dyn KnowledgeService>,
    pub automation: Arc<dyn Automation>,
    pub file_ops: Arc<dyn FileOps>,
    notifications: Arc<Mutex<Option<mpsc::UnboundedReceiver<Notification>>>>,
}

impl CapabilityRegistry {
    /// Every capability switched off
    pub fn noop() -> Self {
        Self {
            messenger: Arc::new(NoOpMessenger),
            scheduler: Arc::new(NoOpScheduler),
            knowledge: Arc::new(NoOpKnowledge),
            automation: Arc::new(NoOpAutomation),
            file_ops: Arc::new(NoOpFileOps),
            notifications: Arc::new(Mutex::new(None)),
        }
    }

    /// Build from settings
    ///
    /// `request_timeout` bounds outbound HTTP calls made by real backends.
    pub fn from_settings(
        config: &CapabilitiesConfig,
        request_timeout: Duration,
    ) -> Result<Self, CapabilityError> {
        let mut registry = Self::noop();

        if config.messaging.mode == CapabilityMode::Real {
            let url = config.messaging.webhook_url.as_deref().ok_or_else(|| {
                CapabilityError::Configuration("messaging.webhook_url is required in real mode".into())
            })?;
            registry.messenger = Arc::new(WebhookMessenger::new(url, request_timeout)?);
        }

        if config.scheduler == CapabilityMode::Real {
            let (scheduler, rx) = TokioScheduler::new();
            registry.scheduler = Arc::new(scheduler);
            registry.notifications = Arc::new(Mutex::new(Some(rx)));
        }

        if config.knowledge.mode == CapabilityMode::Real {
            registry.knowledge = Arc::new(HttpKnowledge::new(&config.knowledge, request_timeout)?);
        }

        if config.automation.mode == CapabilityMode::Real {
            registry.automation = Arc::new(ProcessAutomation::new(&config.automation));
        }

        if config.file_ops.mode == CapabilityMode::Real {
            registry.file_ops = Arc::new(LocalFileOps::new(&config.file_ops));
        }

        tracing::info!(
            messaging = ?config.messaging.mode,
            scheduler = ?config.scheduler,
            knowledge = ?config.knowledge.mode,
            automation = ?config.automation.mode,
            file_ops = ?config.file_ops.mode,
            "Capability registry ready"
        );
        Ok(registry)
    }

    pub fn with_messenger(mut self, messenger: Arc<dyn Messenger>) -> Self {
        self.messenger = messenger;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeService>) -> Self {
        self.knowledge = knowledge;
        self
    }

    pub fn with_automation(mut self, automation: Arc<dyn Automation>) -> Self {
        self.automation = automation;
        self
    }

    pub fn with_file_ops(mut self, file_ops: Arc<dyn FileOps>) -> Self {
        self.file_ops = file_ops;
        self
    }

    /// Take the scheduler's notification stream; `None` after the first call
    /// or when the real scheduler is not in use
    pub fn take_notifications(&self) -> Option<mpsc::UnboundedReceiver<Notification>> {
        self.notifications.lock().take()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::noop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_core::{KnowledgeQuery, ScheduleRequest, When};

    #[tokio::test]
    async fn test_default_settings_enable_only_scheduler() {
        let registry =
            CapabilityRegistry::from_settings(&CapabilitiesConfig::default(), Duration::from_secs(1)).unwrap();

        let scheduled = registry
            .scheduler
            .schedule(ScheduleRequest::reminder("water plants", When::After(Duration::from_secs(60))))
            .await
            .unwrap();
        assert!(scheduled.success);

        let lookup = registry
            .knowledge
            .lookup(KnowledgeQuery::Fact { topic: "owls".into() })
            .await
            .unwrap();
        assert!(!lookup.success);

        assert!(registry.take_notifications().is_some());
        assert!(registry.take_notifications().is_none());
    }

    #[test]
    fn test_real_messaging_needs_webhook() {
        let mut config = CapabilitiesConfig::default();
        config.messaging.mode = CapabilityMode::Real;
        let err = CapabilityRegistry::from_settings(&config, Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, CapabilityError::Configuration(_)));
    }
}
