//! Prometheus metrics recorder and the `/api/v1/metrics` endpoint handler.

use std::sync::Arc;

use axum::extract::State;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::AppState;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render the metrics endpoint. Must be called
/// once at server startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render Prometheus text format from the recorder behind the app state.
pub async fn render_metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}

// Metric name constants to avoid typos across modules.

/// Events accepted (counter, labels: hook).
pub const INGEST_EVENTS_TOTAL: &str = "ingest_events_total";
/// Ingestion requests rejected by validation (counter).
pub const INGEST_REJECTED_TOTAL: &str = "ingest_rejected_total";
/// Ingestion requests failed in the store (counter).
pub const INGEST_ERRORS_TOTAL: &str = "ingest_errors_total";
/// Push notifications delivered (counter).
pub const PUSH_DELIVERIES_TOTAL: &str = "push_deliveries_total";
/// Push notifications that failed (counter, labels: outcome).
pub const PUSH_FAILURES_TOTAL: &str = "push_failures_total";
