//! APNS delivery: ES256 JWT signing and HTTP/2 transport.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use tracing::{debug, info, warn};

use beacon_core::text::truncate_str;

use super::types::{AlertPush, ApnsConfig, ApnsOutcome};

/// JWT validity window. Apple expires provider tokens after an hour;
/// refresh a little before that.
const TOKEN_VALIDITY: Duration = Duration::from_secs(55 * 60);

/// JWT claims for APNS provider authentication.
#[derive(Debug, Serialize)]
struct ApnsClaims {
    /// Issuer (team id).
    iss: String,
    /// Issued at (Unix timestamp).
    iat: i64,
}

struct CachedToken {
    token: String,
    created_at: Instant,
}

/// APNS client. One instance serves both the production and sandbox hosts;
/// each send picks the host from the target token's sandbox flag.
pub struct ApnsService {
    config: ApnsConfig,
    encoding_key: EncodingKey,
    client: reqwest::Client,
    cached_token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for ApnsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApnsService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ApnsService {
    /// Read the private key and build the HTTP/2 client.
    pub fn new(config: ApnsConfig) -> Result<Self, ApnsError> {
        let key_pem = std::fs::read(&config.key_path).map_err(|e| ApnsError::KeyRead {
            path: config.key_path.clone(),
            reason: e.to_string(),
        })?;

        let encoding_key = EncodingKey::from_ec_pem(&key_pem).map_err(|e| ApnsError::KeyParse {
            reason: e.to_string(),
        })?;

        // APNS requires HTTP/2; reqwest stays on HTTP/1.1 unless forced.
        let client = reqwest::Client::builder()
            .http2_prior_knowledge()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApnsError::ClientBuild {
                reason: e.to_string(),
            })?;

        info!(
            key_id = %config.key_id,
            team_id = %config.team_id,
            bundle_id = %config.bundle_id,
            "APNS service initialized"
        );

        Ok(Self {
            config,
            encoding_key,
            client,
            cached_token: Mutex::new(None),
        })
    }

    /// Send one push to one device token.
    pub async fn send(&self, device_token: &str, sandbox: bool, push: &AlertPush) -> ApnsOutcome {
        let jwt = match self.get_or_refresh_token() {
            Ok(t) => t,
            Err(e) => return ApnsOutcome::Failed(format!("JWT generation failed: {e}")),
        };

        let host = if sandbox {
            "api.sandbox.push.apple.com"
        } else {
            "api.push.apple.com"
        };
        let url = format!("https://{host}/3/device/{device_token}");
        let payload = build_payload(push);

        let mut request = self
            .client
            .post(&url)
            .header("authorization", format!("bearer {jwt}"))
            .header("apns-topic", &self.config.bundle_id)
            .header("apns-push-type", "alert")
            .header("apns-priority", "10")
            .header("apns-expiration", "0");
        if let Some(ref collapse_id) = push.collapse_id {
            request = request.header("apns-collapse-id", collapse_id);
        }

        match request.json(&payload).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if response.status().is_success() {
                    debug!(
                        status,
                        token_prefix = truncate_str(device_token, 8),
                        "APNS send ok"
                    );
                    return ApnsOutcome::Delivered;
                }

                let body = response.text().await.unwrap_or_default();
                let reason = serde_json::from_str::<serde_json::Value>(&body)
                    .ok()
                    .and_then(|v| v.get("reason")?.as_str().map(String::from));
                warn!(
                    status,
                    reason = ?reason,
                    token_prefix = truncate_str(device_token, 8),
                    "APNS send failed"
                );

                match status {
                    410 => ApnsOutcome::TokenGone,
                    403 => ApnsOutcome::Unauthorized,
                    429 => ApnsOutcome::Throttled,
                    _ => ApnsOutcome::Failed(
                        reason.unwrap_or_else(|| format!("HTTP {status}")),
                    ),
                }
            }
            Err(e) => {
                warn!(error = %e, "APNS transport error");
                ApnsOutcome::Failed(e.to_string())
            }
        }
    }

    /// Get a cached JWT or sign a new one.
    fn get_or_refresh_token(&self) -> Result<String, ApnsError> {
        let mut cached = self
            .cached_token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(ref token) = *cached {
            if token.created_at.elapsed() < TOKEN_VALIDITY {
                return Ok(token.token.clone());
            }
        }

        let jwt = self.generate_jwt()?;
        *cached = Some(CachedToken {
            token: jwt.clone(),
            created_at: Instant::now(),
        });

        Ok(jwt)
    }

    fn generate_jwt(&self) -> Result<String, ApnsError> {
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.config.key_id.clone());

        let claims = ApnsClaims {
            iss: self.config.team_id.clone(),
            iat: chrono::Utc::now().timestamp(),
        };

        jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
            ApnsError::JwtSign {
                reason: e.to_string(),
            }
        })
    }
}

/// Build the APNS JSON payload for one push.
fn build_payload(push: &AlertPush) -> serde_json::Value {
    serde_json::json!({
        "aps": {
            "alert": {
                "title": push.title,
                "body": push.body,
            },
            "sound": "default",
            "thread-id": push.session_id,
            "mutable-content": 1,
        },
        "notificationId": push.alert_id,
        "sessionId": push.session_id,
        "deviceId": push.device_id,
    })
}

/// APNS service errors.
#[derive(Debug, thiserror::Error)]
pub enum ApnsError {
    /// Failed to read the private key file.
    #[error("failed to read APNS key at {path}: {reason}")]
    KeyRead {
        /// Key file path.
        path: String,
        /// Error description.
        reason: String,
    },
    /// Failed to parse the private key.
    #[error("failed to parse APNS key: {reason}")]
    KeyParse {
        /// Error description.
        reason: String,
    },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {reason}")]
    ClientBuild {
        /// Error description.
        reason: String,
    },
    /// Failed to sign the provider JWT.
    #[error("failed to sign JWT: {reason}")]
    JwtSign {
        /// Error description.
        reason: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
