//! Health check: `GET /api/v1/ping`. Authenticated like everything else.

use axum::Json;
use serde::Serialize;

/// Ping response body.
#[derive(Debug, Serialize)]
pub struct PingResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Server crate version.
    pub server_version: &'static str,
}

/// Report liveness and the running server version.
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        server_version: env!("CARGO_PKG_VERSION"),
    })
}
