//! Wire types for the ingestion envelope and the derived session status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inbound ingestion envelope: reporting device, the hook event itself, and
/// the client-supplied timestamp for the event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    /// Identity of the reporting device.
    pub device: DeviceInfo,
    /// The lifecycle event.
    pub event: HookEvent,
    /// Client-supplied RFC 3339 timestamp.
    pub timestamp: String,
}

/// Identity of a reporting device, sent with every event.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceInfo {
    /// Client-chosen unique device identifier.
    pub device_id: String,
    /// Human-readable device name (hostname, usually).
    pub device_name: String,
    /// Platform string, e.g. `"macos"`.
    pub platform: String,
}

/// One lifecycle hook event.
///
/// Only the fields the projection reads are typed; any additional keys a
/// newer client sends are captured in `extra` and round-trip into the
/// persisted payload, so the event log stays forward compatible without
/// degenerating into an untyped map.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HookEvent {
    /// Client-chosen session identifier.
    pub session_id: String,
    /// Event kind, e.g. `"SessionStart"`. Open-ended: unknown kinds are
    /// recorded without affecting the session status.
    pub hook_event_name: String,
    /// Working directory of the session, if the event carries it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Tool involved, for tool-related events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Notification subtype; only meaningful for `Notification` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
    /// Free-text message (prompt text for `UserPromptSubmit`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Forward-compatible catch-all for keys this server version does not
    /// know about. Persisted verbatim in the event payload.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Derived session status.
///
/// Always a function of the most recent status-relevant event, never a
/// running aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session is actively working.
    Active,
    /// Agent stopped and is waiting for the next user prompt.
    WaitingForInput,
    /// Agent is blocked on a permission prompt.
    WaitingForPermission,
    /// Session went idle.
    Idle,
    /// Session ended. Terminal, but further events are still accepted.
    Ended,
}

impl SessionStatus {
    /// Stable string form stored in the database and used in filters.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::WaitingForInput => "waiting_for_input",
            Self::WaitingForPermission => "waiting_for_permission",
            Self::Idle => "idle",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "waiting_for_input" => Ok(Self::WaitingForInput),
            "waiting_for_permission" => Ok(Self::WaitingForPermission),
            "idle" => Ok(Self::Idle),
            "ended" => Ok(Self::Ended),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Error for a status string that is not one of the known variants.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown session status: {0}")]
pub struct UnknownStatus(pub String);

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
