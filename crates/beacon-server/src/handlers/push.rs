//! Push-token registration: `POST /api/v1/push/register`.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;
use crate::error::ApiError;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct PushRegisterRequest {
    /// Device registering for push delivery.
    pub device_id: String,
    /// Token platform (e.g. `"ios"`).
    pub platform: String,
    /// The push token string.
    pub token: String,
    /// Whether the token targets the sandbox push environment.
    #[serde(default)]
    pub sandbox: bool,
}

/// Minimal acknowledgement body.
#[derive(Debug, Serialize)]
pub struct StatusOk {
    /// Always `"ok"`.
    pub status: &'static str,
}

/// Upsert the token for `(device_id, platform, sandbox)`.
pub async fn register_push_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PushRegisterRequest>,
) -> Result<Json<StatusOk>, ApiError> {
    if request.device_id.is_empty() {
        return Err(ApiError::Validation("device_id is required".into()));
    }
    if request.platform.is_empty() {
        return Err(ApiError::Validation("platform is required".into()));
    }
    if request.token.is_empty() {
        return Err(ApiError::Validation("token is required".into()));
    }

    state.store.upsert_push_token(
        &request.device_id,
        &request.platform,
        &request.token,
        request.sandbox,
    )?;

    info!(
        device_id = %request.device_id,
        platform = %request.platform,
        sandbox = request.sandbox,
        "push token registered"
    );

    Ok(Json(StatusOk { status: "ok" }))
}
