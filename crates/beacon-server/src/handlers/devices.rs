//! Device read endpoints: `GET /api/v1/devices` and
//! `GET /api/v1/devices/{device_id}/sessions`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use beacon_events::sqlite::row_types::{DeviceRow, SessionRow};

use crate::AppState;
use crate::error::ApiError;

/// Body of the device list response.
#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    /// All known devices, most recently seen first.
    pub devices: Vec<DeviceRow>,
}

/// Body of a session list response.
#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    /// Sessions, most recent activity first.
    pub sessions: Vec<SessionRow>,
}

/// Query parameters accepted by the session list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SessionListParams {
    /// `?active=true` excludes sessions whose status is `ended`.
    #[serde(default)]
    pub active: Option<bool>,
    /// Page size cap.
    #[serde(default)]
    pub limit: Option<i64>,
}

/// List all devices. Each carries its active-session count, computed at
/// read time against `status != 'ended'`.
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DeviceListResponse>, ApiError> {
    let devices = state.store.list_devices()?;
    Ok(Json(DeviceListResponse { devices }))
}

/// List one device's sessions, most recent activity first.
///
/// An unknown `device_id` yields an empty list, not an error.
pub async fn list_device_sessions(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    Query(params): Query<SessionListParams>,
) -> Result<Json<SessionListResponse>, ApiError> {
    let sessions = state.store.list_sessions_by_device(
        &device_id,
        params.active.unwrap_or(false),
        params.limit,
    )?;
    Ok(Json(SessionListResponse { sessions }))
}
