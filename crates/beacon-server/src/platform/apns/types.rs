//! APNS type definitions.

/// Credentials and addressing for APNS delivery.
#[derive(Debug, Clone)]
pub struct ApnsConfig {
    /// Path to the `.p8` ES256 private key.
    pub key_path: String,
    /// Key id issued with the key.
    pub key_id: String,
    /// Apple developer team id (JWT issuer).
    pub team_id: String,
    /// App bundle id (`apns-topic` header).
    pub bundle_id: String,
}

/// One push to deliver. The same push goes to every registered token; the
/// per-token sandbox flag picks the APNS host at send time.
#[derive(Debug, Clone)]
pub struct AlertPush {
    /// Alert title.
    pub title: String,
    /// Alert body.
    pub body: String,
    /// `apns-collapse-id` so repeated alerts for one session replace each
    /// other on the device (64-byte cap enforced by the caller).
    pub collapse_id: Option<String>,
    /// Server-assigned alert id, carried in the payload for client dedup.
    pub alert_id: String,
    /// Session the alert refers to (also the notification thread id).
    pub session_id: String,
    /// Device the triggering event came from.
    pub device_id: String,
}

/// Outcome of sending one push to one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApnsOutcome {
    /// Accepted by APNS.
    Delivered,
    /// APNS says the token is no longer valid; drop it.
    TokenGone,
    /// Our credentials were rejected.
    Unauthorized,
    /// Rate limited; stop sending for now.
    Throttled,
    /// Anything else, with a reason for the log.
    Failed(String),
}
