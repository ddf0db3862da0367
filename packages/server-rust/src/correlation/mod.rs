//! Per-request correlation context.
//!
//! The context is task-local and is also recorded on a `tracing` span that
//! instruments the request future. Both are bound to the future itself,
//! not to the worker thread. They are therefore released on every exit
//! path, including panics and cancellation, and can never be observed by
//! another request scheduled on the same worker.

pub mod client_ip;
pub mod layer;

use std::future::Future;

use suivi_core::RequestCorrelationContext;
use tokio::task::futures::TaskLocalFuture;
use tracing::{info_span, Span};

pub use client_ip::{resolve_client_ip, ForwardedPolicy, X_FORWARDED_FOR};
pub use layer::{CorrelationLayer, CorrelationService, X_REQUEST_ID};

tokio::task_local! {
    static CORRELATION: RequestCorrelationContext;
}

/// Returns the correlation context of the request being processed by the
/// current task, or `None` outside a request.
#[must_use]
pub fn current() -> Option<RequestCorrelationContext> {
    CORRELATION.try_with(RequestCorrelationContext::clone).ok()
}

/// Runs `fut` with `ctx` as its correlation context.
///
/// The context is visible only while `fut` is being polled and is gone once
/// the returned future completes or is dropped.
pub fn scope<F: Future>(
    ctx: RequestCorrelationContext,
    fut: F,
) -> TaskLocalFuture<RequestCorrelationContext, F> {
    CORRELATION.scope(ctx, fut)
}

/// Span carrying the correlation fields for structured log output.
#[must_use]
pub fn request_span(ctx: &RequestCorrelationContext) -> Span {
    info_span!(
        "request",
        request_id = %ctx.request_id,
        client_ip = %ctx.client_ip,
        user_id = %ctx.user_id,
    )
}
