//! Session read endpoints: `GET /api/v1/sessions` and
//! `GET /api/v1/sessions/{session_id}/events`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use beacon_events::sqlite::repositories::event::EventPage;
use beacon_events::sqlite::row_types::EventRow;

use crate::AppState;
use crate::error::ApiError;
use crate::handlers::devices::{SessionListParams, SessionListResponse};

/// Body of the event feed response.
#[derive(Debug, Serialize)]
pub struct EventListResponse {
    /// Events, newest first.
    pub events: Vec<EventRow>,
}

/// Query parameters for the event feed.
#[derive(Debug, Default, Deserialize)]
pub struct EventFeedParams {
    /// Page size; defaults to 100.
    #[serde(default)]
    pub limit: Option<i64>,
    /// Exclusive upper bound on event id. Pass the smallest id of the
    /// previous page to continue backward through history.
    #[serde(default)]
    pub before: Option<i64>,
}

/// List sessions across all devices, most recent activity first.
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionListParams>,
) -> Result<Json<SessionListResponse>, ApiError> {
    let sessions = state
        .store
        .list_all_sessions(params.active.unwrap_or(false), params.limit)?;
    Ok(Json(SessionListResponse { sessions }))
}

/// List one session's events, newest first, paged by id cursor.
///
/// An unknown `session_id` yields an empty list, not an error.
pub async fn list_session_events(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<EventFeedParams>,
) -> Result<Json<EventListResponse>, ApiError> {
    let events = state.store.list_events_by_session(
        &session_id,
        &EventPage {
            limit: params.limit,
            before: params.before,
        },
    )?;
    Ok(Json(EventListResponse { events }))
}
