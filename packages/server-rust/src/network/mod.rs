//! Networking types, configuration, middleware, and the server lifecycle.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod module;

pub use config::*;
pub use handlers::AppState;
pub use middleware::build_http_layers;
pub use module::NetworkModule;
