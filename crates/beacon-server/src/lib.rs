//! HTTP API over the telemetry store.
//!
//! Route map (every route behind the bearer-token gate):
//!
//! - `POST /api/v1/events`: ingest one event
//! - `GET  /api/v1/ping`: liveness + server version
//! - `GET  /api/v1/devices`: devices with live active-session counts
//! - `GET  /api/v1/devices/{device_id}/sessions`: sessions per device
//! - `GET  /api/v1/sessions`: sessions across devices
//! - `GET  /api/v1/sessions/{session_id}/events`: event feed, newest first
//! - `POST /api/v1/push/register`: push-token upsert
//! - `GET  /api/v1/metrics`: Prometheus text

pub mod alerts;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
#[cfg(feature = "apns")]
pub mod platform;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use beacon_events::TelemetryStore;

use crate::auth::{AuthConfig, bearer_auth};

/// Shared state handed to every handler. The store is an explicit
/// dependency here rather than process-global, so tests can stand up an
/// isolated instance per case.
pub struct AppState {
    /// The durable store.
    pub store: Arc<TelemetryStore>,
    /// Handle for rendering the metrics endpoint.
    pub metrics: PrometheusHandle,
    /// APNS delivery, when configured.
    #[cfg(feature = "apns")]
    pub apns: Option<Arc<platform::apns::ApnsService>>,
}

impl AppState {
    /// State without push delivery.
    pub fn new(store: Arc<TelemetryStore>, metrics: PrometheusHandle) -> Self {
        Self {
            store,
            metrics,
            #[cfg(feature = "apns")]
            apns: None,
        }
    }

    /// Attach an APNS client.
    #[cfg(feature = "apns")]
    pub fn with_apns(mut self, apns: Option<Arc<platform::apns::ApnsService>>) -> Self {
        self.apns = apns;
        self
    }
}

/// Build the full router with the credential gate over every route.
pub fn build_router(state: Arc<AppState>, auth: AuthConfig) -> Router {
    Router::new()
        .route("/api/v1/ping", get(handlers::ping::ping))
        .route("/api/v1/events", post(handlers::events::ingest_event))
        .route("/api/v1/devices", get(handlers::devices::list_devices))
        .route(
            "/api/v1/devices/{device_id}/sessions",
            get(handlers::devices::list_device_sessions),
        )
        .route("/api/v1/sessions", get(handlers::sessions::list_sessions))
        .route(
            "/api/v1/sessions/{session_id}/events",
            get(handlers::sessions::list_session_events),
        )
        .route(
            "/api/v1/push/register",
            post(handlers::push::register_push_token),
        )
        .route("/api/v1/metrics", get(metrics::render_metrics))
        .route_layer(middleware::from_fn_with_state(auth, bearer_auth))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
