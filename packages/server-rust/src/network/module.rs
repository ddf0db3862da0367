//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` prepares the router
//! inputs, `start()` binds the TCP listener, and `serve()` starts accepting
//! connections. This separation lets callers learn the bound port (e.g. for
//! port 0 in tests) before traffic flows.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::config::NetworkConfig;
use super::handlers::{health_handler, liveness_handler, me_handler, AppState};
use super::middleware::build_http_layers;
use crate::auth::Authenticator;

/// Manages the HTTP server lifecycle.
///
/// 1. `new()` -- captures configuration and the shared authenticator
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- begins accepting connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    authenticator: Arc<Authenticator>,
    listener: Option<TcpListener>,
    start_time: Instant,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, authenticator: Arc<Authenticator>) -> Self {
        Self {
            config,
            authenticator,
            listener: None,
            start_time: Instant::now(),
        }
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health` -- health JSON
    /// - `GET /health/live` -- liveness probe
    /// - `GET /api/me` -- the authenticated principal (401 when anonymous)
    pub fn build_router(&self) -> Router {
        let state = AppState {
            start_time: self.start_time,
        };

        let layers = build_http_layers(&self.config, Arc::clone(&self.authenticator));

        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/api/me", get(me_handler))
            .layer(layers)
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until the shutdown future resolves.
    ///
    /// The peer address of each connection is exposed to the middleware as
    /// `ConnectInfo<SocketAddr>`. In-flight requests are allowed to finish
    /// after shutdown is signalled.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, or if the server
    /// encounters a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let Some(listener) = self.listener.take() else {
            anyhow::bail!("start() must be called before serve()");
        };
        let router = self.build_router();

        info!("Serving HTTP connections");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        info!("Server stopped");
        Ok(())
    }
}
