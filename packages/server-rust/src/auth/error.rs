//! Authentication error taxonomy and its HTTP mapping.
//!
//! Every authentication failure collapses to the same `401` response so a
//! caller cannot tell an unknown login from a wrong secret.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Realm advertised in `WWW-Authenticate` on every `401`.
pub const AUTH_REALM: &str = "suivi";

/// Errors produced while resolving or verifying a principal.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No account matches the requested login. The login is kept for
    /// server-side diagnostics only.
    #[error("no account for login {login:?}")]
    PrincipalNotFound { login: String },
    #[error("presented secret does not match stored hash")]
    CredentialMismatch,
    #[error("stored hash is malformed")]
    MalformedStoredHash,
    #[error("malformed credentials: {reason}")]
    MalformedCredentials { reason: &'static str },
    #[error("authentication required")]
    Unauthenticated,
    #[error("account lookup failed: {0}")]
    Lookup(#[source] anyhow::Error),
    #[error("secret hashing failed: {0}")]
    Hashing(String),
}

impl AuthError {
    /// Whether the error is a caller-facing authentication failure (as
    /// opposed to an internal fault).
    #[must_use]
    pub fn is_authentication_failure(&self) -> bool {
        !matches!(self, Self::Lookup(_) | Self::Hashing(_))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.is_authentication_failure() {
            tracing::debug!(reason = %kind(&self), "authentication failed");
            let mut response = (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "authentication failed" })),
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&format!("Basic realm=\"{AUTH_REALM}\"")) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
            response
        } else {
            tracing::warn!(error = %self, "internal authentication error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal error" })),
            )
                .into_response()
        }
    }
}

/// Variant name without the payload, safe to log at any level.
fn kind(err: &AuthError) -> &'static str {
    match err {
        AuthError::PrincipalNotFound { .. } => "principal_not_found",
        AuthError::CredentialMismatch | AuthError::MalformedStoredHash => "credential_mismatch",
        AuthError::MalformedCredentials { .. } => "malformed_credentials",
        AuthError::Unauthenticated => "unauthenticated",
        AuthError::Lookup(_) => "lookup",
        AuthError::Hashing(_) => "hashing",
    }
}
