//! Network configuration types for the Suivi server.

use std::time::Duration;

use crate::correlation::ForwardedPolicy;

/// Top-level network configuration for the server.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    /// Maximum time to wait for a request to complete.
    pub request_timeout: Duration,
    /// When to honor `X-Forwarded-For` for the client address.
    pub forwarded: ForwardedPolicy,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            forwarded: ForwardedPolicy::TrustAll,
        }
    }
}
