//! Bearer-token credential gate.
//!
//! Applied as middleware to every route, health check and metrics
//! included. Stateless: each request is checked against the one configured
//! token and nothing about the expected value ever reaches a response body.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;

/// The configured API credential.
#[derive(Clone)]
pub struct AuthConfig {
    token: String,
}

impl AuthConfig {
    /// Build the gate around the expected token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &"[redacted]")
            .finish()
    }
}

/// Middleware validating `Authorization: Bearer <token>` on every request.
///
/// Missing header, malformed header, or token mismatch all produce the same
/// 401 response. Comparison is a plain string equality; a constant-time
/// comparison would additionally hide length/prefix timing.
pub async fn bearer_auth(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == auth.token => Ok(next.run(request).await),
        _ => Err(ApiError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_the_token() {
        let auth = AuthConfig::new("super-secret");
        let output = format!("{auth:?}");
        assert!(!output.contains("super-secret"));
        assert!(output.contains("[redacted]"));
    }
}
