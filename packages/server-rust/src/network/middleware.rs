//! HTTP middleware stack for the Suivi server.
//!
//! Builds the Tower middleware pipeline applied to all HTTP requests.
//! Middleware ordering follows the outer-to-inner convention: the first
//! layer listed is the outermost (processes the request first on the way
//! in, and the response last on the way out).

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

use super::config::NetworkConfig;
use crate::auth::{AuthenticationLayer, Authenticator};
use crate::correlation::CorrelationLayer;

/// The composed Tower layer type produced by [`build_http_layers`].
///
/// Each layer wraps the next in a `Stack`, from innermost (first type
/// parameter) to outermost (most deeply nested).
pub type HttpLayers = tower::layer::util::Stack<
    TimeoutLayer,
    tower::layer::util::Stack<
        CorrelationLayer,
        tower::layer::util::Stack<
            AuthenticationLayer,
            tower::layer::util::Stack<
                CorsLayer,
                tower::layer::util::Stack<CompressionLayer, tower::layer::util::Identity>,
            >,
        >,
    >,
>;

/// Builds the HTTP-level Tower middleware stack.
///
/// **Middleware ordering (outermost to innermost):**
/// 1. `Compression` -- gzip response compression
/// 2. `CORS` -- Cross-Origin Resource Sharing based on configured origins
/// 3. `Authentication` -- attaches the request's `SecurityContext`
/// 4. `Correlation` -- request id, client address and user id for every log line
/// 5. `Timeout` -- enforces a maximum request processing duration
///
/// Authentication runs before correlation so the correlation context sees the
/// resolved principal. Timeouts sit inside correlation so a timed-out request
/// is still logged with its request id.
#[must_use]
pub fn build_http_layers(config: &NetworkConfig, authenticator: Arc<Authenticator>) -> HttpLayers {
    let cors = build_cors_layer(&config.cors_origins);

    ServiceBuilder::new()
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(AuthenticationLayer::new(authenticator).forwarded(config.forwarded.clone()))
        .layer(CorrelationLayer::new(config.forwarded.clone()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .into_inner()
}

/// Builds the CORS layer from the configured list of allowed origins.
///
/// A wildcard `"*"` in the origins list allows any origin. Otherwise,
/// each origin string is parsed and added to an explicit allowlist.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
