//! Row structs returned by the repositories.
//!
//! These serialize directly into the read-API responses, so field names are
//! part of the wire contract.

use serde::Serialize;

/// One reporting device, with its live active-session count.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceRow {
    /// Unique device key.
    pub device_id: String,
    /// Latest reported device name.
    pub device_name: String,
    /// Latest reported platform.
    pub platform: String,
    /// Timestamp of the device's first event. Never changes.
    pub first_seen: String,
    /// Timestamp of the device's most recent event.
    pub last_seen: String,
    /// Number of this device's sessions whose status is not `ended`,
    /// counted at read time rather than stored.
    pub active_sessions: i64,
}

/// One session row, joined with its owning device's display fields.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRow {
    /// Unique session key.
    pub session_id: String,
    /// Owning device.
    pub device_id: String,
    /// Timestamp of the session's first event. Never changes.
    pub started_at: String,
    /// Timestamp of the most recent event.
    pub last_event: String,
    /// Derived status string.
    pub status: String,
    /// Working directory, if any event carried one.
    pub cwd: Option<String>,
    /// Captured title, if a prompt was seen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Owning device's name (join; absent if the device row is missing).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    /// Owning device's platform (join).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

/// One recorded event, as returned by the session event feed.
#[derive(Debug, Clone, Serialize)]
pub struct EventRow {
    /// Surrogate id; insertion order.
    pub id: i64,
    /// Event kind.
    pub hook_event_name: String,
    /// Client-supplied timestamp.
    pub timestamp: String,
    /// Tool involved, when present.
    pub tool_name: Option<String>,
    /// Notification subtype, when present.
    pub notification_type: Option<String>,
    /// Free-text message extracted from the stored payload.
    pub message: Option<String>,
}

/// One registered push token.
#[derive(Debug, Clone)]
pub struct PushTokenRow {
    /// Device that registered the token.
    pub device_id: String,
    /// Token platform (e.g. `"ios"`).
    pub platform: String,
    /// The current token string.
    pub token: String,
    /// Whether the token targets the sandbox push environment.
    pub sandbox: bool,
    /// Last registration time.
    pub updated_at: String,
}
