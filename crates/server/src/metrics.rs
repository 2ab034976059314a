//! Prometheus metrics
//!
//! Counters are recorded through the `metrics` facade across the
//! workspace; this module installs the exporter and serves `/metrics`.

use axum::extract::State;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;
use crate::ServerError;

/// Install the global Prometheus recorder
///
/// Returns `None` when a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            describe();
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed");
            None
        }
    }
}

fn describe() {
    metrics::describe_counter!("shadow_classifications_total", "Utterances classified, by tier");
    metrics::describe_counter!("shadow_dispatch_total", "Dispatched intents, by handler and outcome");
    metrics::describe_counter!("shadow_ai_requests_total", "AI backend requests, by outcome");
    metrics::describe_counter!("shadow_http_queries_total", "Queries received over HTTP");
}

/// Prometheus text exposition
pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, ServerError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(ServerError::MetricsDisabled)
}
