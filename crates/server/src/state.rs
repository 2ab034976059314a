//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use shadow_agent::Assistant;
use shadow_config::Settings;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
    pub settings: Arc<Settings>,
    /// Present when the Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(assistant: Arc<Assistant>, settings: Settings) -> Self {
        Self {
            assistant,
            settings: Arc::new(settings),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
