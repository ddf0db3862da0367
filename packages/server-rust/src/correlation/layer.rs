//! Request correlation middleware.
//!
//! For every request: generate a request id, resolve the client address and
//! user id, publish them for the lifetime of the request, log one summary
//! line, delegate, and tear the context down on the way out.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::response::Response;
use suivi_core::RequestCorrelationContext;
use tower::{Layer, Service};
use tracing::{info, warn, Instrument};

use super::client_ip::{resolve_client_ip, ForwardedPolicy};
use crate::auth::SecurityContext;

/// Response header echoing the generated request id.
pub const X_REQUEST_ID: &str = "x-request-id";

// ---------------------------------------------------------------------------
// CorrelationLayer
// ---------------------------------------------------------------------------

/// Tower layer establishing the per-request correlation context.
///
/// Must sit inside the authentication layer so that the request's
/// [`SecurityContext`] is already attached when the user id is resolved.
#[derive(Debug, Clone, Default)]
pub struct CorrelationLayer {
    forwarded: Arc<ForwardedPolicy>,
}

impl CorrelationLayer {
    #[must_use]
    pub fn new(forwarded: ForwardedPolicy) -> Self {
        Self {
            forwarded: Arc::new(forwarded),
        }
    }
}

impl<S> Layer<S> for CorrelationLayer {
    type Service = CorrelationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationService {
            inner,
            forwarded: Arc::clone(&self.forwarded),
        }
    }
}

// ---------------------------------------------------------------------------
// CorrelationService
// ---------------------------------------------------------------------------

/// Service wrapper that scopes a [`RequestCorrelationContext`] to the inner call.
#[derive(Debug, Clone)]
pub struct CorrelationService<S> {
    inner: S,
    forwarded: Arc<ForwardedPolicy>,
}

impl<S> CorrelationService<S> {
    fn establish(&self, req: &Request<Body>) -> RequestCorrelationContext {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let client_ip = resolve_client_ip(req.headers(), peer, &self.forwarded);
        let user_id = req
            .extensions()
            .get::<SecurityContext>()
            .and_then(SecurityContext::user_id);
        RequestCorrelationContext::new(client_ip, user_id)
    }
}

impl<S> Service<Request<Body>> for CorrelationService<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let ctx = self.establish(&req);
        let span = super::request_span(&ctx);
        let request_id = ctx.request_id.clone();

        // The readied service goes into the future; a fresh clone stays behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let handled = async move {
            let start = Instant::now();
            if let Some(ctx) = super::current() {
                info!(
                    method = %req.method(),
                    path = %req.uri().path(),
                    client_ip = %ctx.client_ip,
                    user_id = %ctx.user_id,
                    request_id = %ctx.request_id,
                    "request received"
                );
            }

            let result = inner.call(req).await;

            #[allow(clippy::cast_possible_truncation)]
            let duration_ms = start.elapsed().as_millis() as u64;
            match result {
                Ok(mut response) => {
                    info!(
                        status = response.status().as_u16(),
                        duration_ms, "request completed"
                    );
                    if let Ok(value) = HeaderValue::from_str(&request_id) {
                        response
                            .headers_mut()
                            .insert(HeaderName::from_static(X_REQUEST_ID), value);
                    }
                    Ok(response)
                }
                Err(err) => {
                    warn!(duration_ms, "request failed");
                    Err(err)
                }
            }
        };

        Box::pin(super::scope(ctx, handled.instrument(span)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
