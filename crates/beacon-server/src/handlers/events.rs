//! Ingestion endpoint: `POST /api/v1/events`.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use tracing::info;

use beacon_events::EventEnvelope;

use crate::AppState;
use crate::error::ApiError;
use crate::metrics::{INGEST_ERRORS_TOTAL, INGEST_EVENTS_TOTAL, INGEST_REJECTED_TOTAL};

/// Body of a successful ingestion response.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Assigned event id.
    pub id: i64,
    /// The event's timestamp, echoed back.
    pub timestamp: String,
}

/// Accept one event: validate, apply the projection atomically, respond
/// with the new event's identity.
///
/// Exactly one event row plus at most one changed device row and one
/// changed/created session row, all in a single store transaction.
pub async fn ingest_event(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<EventEnvelope>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    if let Err(err) = validate_envelope(&envelope) {
        metrics::counter!(INGEST_REJECTED_TOTAL).increment(1);
        return Err(err);
    }

    let receipt = state.store.ingest(&envelope).inspect_err(|_| {
        metrics::counter!(INGEST_ERRORS_TOTAL).increment(1);
    })?;

    metrics::counter!(INGEST_EVENTS_TOTAL, "hook" => envelope.event.hook_event_name.clone())
        .increment(1);
    info!(
        device_id = %envelope.device.device_id,
        session_id = %envelope.event.session_id,
        hook = %envelope.event.hook_event_name,
        event_id = receipt.event_id,
        "event ingested"
    );

    #[cfg(feature = "apns")]
    crate::alerts::dispatch_for_event(&state, &envelope.event, &envelope.device.device_id);

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            id: receipt.event_id,
            timestamp: receipt.timestamp,
        }),
    ))
}

/// Reject envelopes missing a required field, naming the field.
fn validate_envelope(envelope: &EventEnvelope) -> Result<(), ApiError> {
    if envelope.device.device_id.is_empty() {
        return Err(ApiError::Validation("device_id is required".into()));
    }
    if envelope.event.session_id.is_empty() {
        return Err(ApiError::Validation("session_id is required".into()));
    }
    if envelope.event.hook_event_name.is_empty() {
        return Err(ApiError::Validation("hook_event_name is required".into()));
    }
    if chrono::DateTime::parse_from_rfc3339(&envelope.timestamp).is_err() {
        return Err(ApiError::Validation(
            "timestamp must be valid RFC 3339".into(),
        ));
    }
    Ok(())
}
