//! Request-scoped security context and the extractors built on it.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use suivi_core::AuthenticatedPrincipal;

use super::error::AuthError;

/// Security-context slot carried as a request extension.
///
/// Inserted by the authentication layer before any downstream service
/// runs. Holds at most one [`AuthenticatedPrincipal`].
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    principal: Option<Arc<AuthenticatedPrincipal>>,
}

impl SecurityContext {
    #[must_use]
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    #[must_use]
    pub fn authenticated(principal: AuthenticatedPrincipal) -> Self {
        Self {
            principal: Some(Arc::new(principal)),
        }
    }

    #[must_use]
    pub fn principal(&self) -> Option<&Arc<AuthenticatedPrincipal>> {
        self.principal.as_ref()
    }

    /// Account id of the principal, if authenticated.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.principal.as_deref().map(AuthenticatedPrincipal::id)
    }
}

/// Extractor for handlers that require an authenticated principal.
///
/// Rejects with the generic `401` when the request carries no principal.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Arc<AuthenticatedPrincipal>);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .and_then(SecurityContext::principal)
            .cloned()
            .map(CurrentPrincipal)
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Login and secret decoded from an `Authorization: Basic` header.
///
/// `Debug` omits the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub login: String,
    pub secret: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

/// Reads Basic credentials from the request headers.
///
/// Returns `Ok(None)` when no `Authorization` header is present, so the
/// request proceeds anonymously.
///
/// # Errors
///
/// Returns `MalformedCredentials` when the header is present but is not a
/// well-formed `Basic base64(login:secret)` value.
pub fn basic_credentials(headers: &HeaderMap) -> Result<Option<BasicCredentials>, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = value.to_str().map_err(|_| AuthError::MalformedCredentials {
        reason: "non-ASCII Authorization header",
    })?;
    parse_basic_auth(header).map(Some)
}

/// Parses `Basic <base64(login:secret)>`. The scheme name is case-insensitive.
fn parse_basic_auth(header: &str) -> Result<BasicCredentials, AuthError> {
    let (scheme, encoded) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedCredentials {
            reason: "missing credentials",
        })?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::MalformedCredentials {
            reason: "unsupported scheme",
        });
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::MalformedCredentials {
            reason: "invalid base64",
        })?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedCredentials {
        reason: "invalid UTF-8",
    })?;
    let (login, secret) = decoded
        .split_once(':')
        .ok_or(AuthError::MalformedCredentials {
            reason: "expected login:secret",
        })?;
    if login.is_empty() {
        return Err(AuthError::MalformedCredentials {
            reason: "empty login",
        });
    }

    Ok(BasicCredentials {
        login: login.to_string(),
        secret: secret.to_string(),
    })
}
