//! Maps ingested events to user-facing alerts and fans them out to
//! registered push tokens.
//!
//! Dispatch happens strictly after the ingest transaction commits, in a
//! spawned task; delivery failures are logged and never affect the
//! ingesting client's response.

use beacon_events::HookEvent;

/// Title and body of one user-facing alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertContent {
    /// Alert title: the session's captured title when present, otherwise a
    /// kind-specific fallback.
    pub title: String,
    /// Alert body.
    pub body: String,
}

/// Decide whether an event warrants an alert, and build its content.
///
/// Alert-worthy events: `Stop`, and `Notification` with the
/// `permission_prompt` or `idle_prompt` subtype.
pub fn alert_for_event(event: &HookEvent, session_title: Option<&str>) -> Option<AlertContent> {
    let title = |fallback: &str| {
        session_title
            .filter(|t| !t.is_empty())
            .unwrap_or(fallback)
            .to_string()
    };

    match event.hook_event_name.as_str() {
        "Stop" => {
            let reason = event.message.as_deref().unwrap_or("No reason given");
            Some(AlertContent {
                title: title("Session Stopped"),
                body: format!("Session stopped: {reason}"),
            })
        }
        "Notification" => match event.notification_type.as_deref() {
            Some("permission_prompt") => Some(AlertContent {
                title: title("Permission Required"),
                body: permission_body(event.tool_name.as_deref(), event.message.as_deref()),
            }),
            Some("idle_prompt") => {
                let reason = event.message.as_deref().unwrap_or("Waiting for input");
                Some(AlertContent {
                    title: title("Session Idle"),
                    body: format!("Session idle: {reason}"),
                })
            }
            _ => None,
        },
        _ => None,
    }
}

fn permission_body(tool_name: Option<&str>, message: Option<&str>) -> String {
    match (tool_name, message) {
        (Some(tool), Some(msg)) => format!("Permission required: {tool} — {msg}"),
        (Some(tool), None) => format!("Permission required: {tool}"),
        (None, Some(msg)) => format!("Permission required: {msg}"),
        (None, None) => "A session needs permission to continue".to_string(),
    }
}

/// Fan an alert out to every registered token, in the background.
#[cfg(feature = "apns")]
pub fn dispatch_for_event(
    state: &std::sync::Arc<crate::AppState>,
    event: &HookEvent,
    device_id: &str,
) {
    use crate::platform::apns::{AlertPush, ApnsOutcome};
    use beacon_core::text::truncate_str;
    use tracing::{debug, warn};

    let Some(apns) = state.apns.clone() else {
        return;
    };
    // Cheap pre-filter; the real decision happens once the session title
    // has been fetched.
    if !matches!(event.hook_event_name.as_str(), "Stop" | "Notification") {
        return;
    }

    let store = std::sync::Arc::clone(&state.store);
    let event = event.clone();
    let device_id = device_id.to_string();

    let _ = tokio::spawn(async move {
        let session_title = store
            .get_session(&event.session_id)
            .ok()
            .flatten()
            .and_then(|s| s.title);
        let Some(content) = alert_for_event(&event, session_title.as_deref()) else {
            return;
        };

        let tokens = match store.list_push_tokens() {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!(error = %err, "failed to list push tokens, skipping alert");
                return;
            }
        };

        let push = AlertPush {
            title: content.title,
            body: content.body,
            // APNS caps collapse ids at 64 bytes.
            collapse_id: Some(truncate_str(&event.session_id, 64).to_string()),
            alert_id: uuid::Uuid::new_v4().to_string(),
            session_id: event.session_id.clone(),
            device_id,
        };

        for token in &tokens {
            match apns.send(&token.token, token.sandbox, &push).await {
                ApnsOutcome::Delivered => {
                    metrics::counter!(crate::metrics::PUSH_DELIVERIES_TOTAL).increment(1);
                    debug!(
                        token_prefix = truncate_str(&token.token, 8),
                        "push delivered"
                    );
                }
                ApnsOutcome::TokenGone => {
                    metrics::counter!(crate::metrics::PUSH_FAILURES_TOTAL, "outcome" => "gone")
                        .increment(1);
                    debug!(
                        token_prefix = truncate_str(&token.token, 8),
                        "push token gone, removing"
                    );
                    if let Err(err) = store.remove_push_token(&token.token) {
                        warn!(error = %err, "failed to remove dead push token");
                    }
                }
                ApnsOutcome::Unauthorized => {
                    metrics::counter!(crate::metrics::PUSH_FAILURES_TOTAL, "outcome" => "auth")
                        .increment(1);
                    tracing::error!("APNS rejected our credentials, check key configuration");
                }
                ApnsOutcome::Throttled => {
                    metrics::counter!(crate::metrics::PUSH_FAILURES_TOTAL, "outcome" => "throttled")
                        .increment(1);
                    warn!("APNS throttled, skipping remaining tokens");
                    break;
                }
                ApnsOutcome::Failed(reason) => {
                    metrics::counter!(crate::metrics::PUSH_FAILURES_TOTAL, "outcome" => "error")
                        .increment(1);
                    warn!(reason = %reason, "push delivery failed");
                }
            }
        }
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
