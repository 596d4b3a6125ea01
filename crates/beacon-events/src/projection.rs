//! Pure projection: one incoming event → the device and session writes it
//! implies.
//!
//! Nothing here touches storage. The set-once fields (`first_seen`,
//! `started_at`, `cwd`, `title`) are produced as candidates; the upsert SQL
//! keeps whichever value landed first, which is what makes re-applying the
//! same event (client retries) idempotent for the projection.

use beacon_core::text::truncate_str;

use crate::types::{EventEnvelope, SessionStatus};

/// Maximum stored title length in bytes. Longer prompts are cut at the
/// nearest char boundary below this.
pub const TITLE_MAX_BYTES: usize = 200;

/// Device fields written on every event from that device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceUpsert<'a> {
    /// Unique device key.
    pub device_id: &'a str,
    /// Overwritten on every event.
    pub device_name: &'a str,
    /// Overwritten on every event.
    pub platform: &'a str,
    /// Becomes `first_seen` on creation and `last_seen` always.
    pub seen_at: &'a str,
}

/// Session fields written for the incoming event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUpsert<'a> {
    /// Unique session key.
    pub session_id: &'a str,
    /// Owning device (fixed at session creation).
    pub device_id: &'a str,
    /// Becomes `started_at` on creation and `last_event` always.
    pub event_at: &'a str,
    /// Derived status; `None` leaves the stored status untouched.
    pub status: Option<SessionStatus>,
    /// Set-once candidate working directory.
    pub cwd: Option<&'a str>,
    /// Set-once candidate title (truncated prompt text).
    pub title: Option<String>,
}

/// The full projection of one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection<'a> {
    /// Device-side write.
    pub device: DeviceUpsert<'a>,
    /// Session-side write.
    pub session: SessionUpsert<'a>,
}

/// Compute the projection implied by one incoming envelope.
pub fn project(envelope: &EventEnvelope) -> Projection<'_> {
    let event = &envelope.event;
    Projection {
        device: DeviceUpsert {
            device_id: &envelope.device.device_id,
            device_name: &envelope.device.device_name,
            platform: &envelope.device.platform,
            seen_at: &envelope.timestamp,
        },
        session: SessionUpsert {
            session_id: &event.session_id,
            device_id: &envelope.device.device_id,
            event_at: &envelope.timestamp,
            status: derive_status(&event.hook_event_name, event.notification_type.as_deref()),
            cwd: event.cwd.as_deref(),
            title: title_candidate(&event.hook_event_name, event.message.as_deref()),
        },
    }
}

/// Status implied by a single event, or `None` when the event kind carries
/// no status information (the event is still recorded).
pub fn derive_status(
    hook_event_name: &str,
    notification_type: Option<&str>,
) -> Option<SessionStatus> {
    match hook_event_name {
        "SessionStart" | "UserPromptSubmit" => Some(SessionStatus::Active),
        "Stop" => Some(SessionStatus::WaitingForInput),
        "SessionEnd" => Some(SessionStatus::Ended),
        "Notification" => match notification_type {
            Some("permission_prompt") => Some(SessionStatus::WaitingForPermission),
            Some("idle_prompt") => Some(SessionStatus::Idle),
            _ => None,
        },
        _ => None,
    }
}

/// Candidate session title: the prompt text of a `UserPromptSubmit`,
/// truncated to [`TITLE_MAX_BYTES`]. Whether it is actually stored is up to
/// the set-once upsert; an existing title always wins.
pub fn title_candidate(hook_event_name: &str, message: Option<&str>) -> Option<String> {
    if hook_event_name != "UserPromptSubmit" {
        return None;
    }
    message
        .filter(|m| !m.is_empty())
        .map(|m| truncate_str(m, TITLE_MAX_BYTES).to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
