//! Authentication middleware: attaches a [`SecurityContext`] to each request.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service};
use tracing::warn;

use super::authenticator::Authenticator;
use super::error::AuthError;
use super::extract::{basic_credentials, SecurityContext};
use crate::correlation::{resolve_client_ip, ForwardedPolicy};

// ---------------------------------------------------------------------------
// AuthenticationLayer
// ---------------------------------------------------------------------------

/// Tower layer that authenticates `Authorization: Basic` credentials.
///
/// - No header: the request continues with an anonymous context.
/// - Valid credentials: the request continues with the resolved principal.
/// - Anything else: the request is answered with the generic `401`.
///
/// Rejections are logged with the client address resolved under the
/// configured [`ForwardedPolicy`], never with the presented login.
#[derive(Debug, Clone)]
pub struct AuthenticationLayer {
    authenticator: Arc<Authenticator>,
    forwarded: Arc<ForwardedPolicy>,
}

impl AuthenticationLayer {
    #[must_use]
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        Self {
            authenticator,
            forwarded: Arc::new(ForwardedPolicy::default()),
        }
    }

    /// Sets the policy used to resolve the client address of rejected requests.
    #[must_use]
    pub fn forwarded(mut self, policy: ForwardedPolicy) -> Self {
        self.forwarded = Arc::new(policy);
        self
    }
}

impl<S> Layer<S> for AuthenticationLayer {
    type Service = AuthenticationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthenticationService {
            inner,
            authenticator: Arc::clone(&self.authenticator),
            forwarded: Arc::clone(&self.forwarded),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthenticationService
// ---------------------------------------------------------------------------

/// Service wrapper performing one authentication attempt per request.
#[derive(Debug, Clone)]
pub struct AuthenticationService<S> {
    inner: S,
    authenticator: Arc<Authenticator>,
    forwarded: Arc<ForwardedPolicy>,
}

fn reject(req: &Request<Body>, forwarded: &ForwardedPolicy, err: AuthError) -> Response {
    if err.is_authentication_failure() {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let client_ip = resolve_client_ip(req.headers(), peer, forwarded);
        warn!(
            client_ip = %client_ip,
            method = %req.method(),
            path = %req.uri().path(),
            "authentication rejected"
        );
    }
    err.into_response()
}

impl<S> Service<Request<Body>> for AuthenticationService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let authenticator = Arc::clone(&self.authenticator);
        let forwarded = Arc::clone(&self.forwarded);
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let security = match basic_credentials(req.headers()) {
                Ok(None) => SecurityContext::anonymous(),
                Ok(Some(creds)) => {
                    match authenticator.authenticate(&creds.login, &creds.secret).await {
                        Ok(principal) => SecurityContext::authenticated(principal),
                        Err(err) => return Ok(reject(&req, &forwarded, err)),
                    }
                }
                Err(err) => return Ok(reject(&req, &forwarded, err)),
            };
            req.extensions_mut().insert(security);
            inner.call(req).await
        })
    }
}
