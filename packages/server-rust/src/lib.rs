//! Suivi Server — request authentication and correlation pipeline on axum.
//!
//! - [`auth`]: principal resolution, credential verification, auth middleware
//! - [`correlation`]: per-request correlation context and its middleware
//! - [`network`]: router, HTTP layers, server lifecycle
//! - [`storage`]: in-memory account store
//! - [`telemetry`]: `tracing` subscriber setup
//! - [`config`]: command-line/environment configuration

pub mod auth;
pub mod config;
pub mod correlation;
pub mod network;
pub mod storage;
pub mod telemetry;

pub use auth::{AuthError, Authenticator, CredentialVerifier, PrincipalResolver, SecurityContext};
pub use correlation::{CorrelationLayer, ForwardedPolicy};
pub use network::{NetworkConfig, NetworkModule};
pub use storage::InMemoryAccountStore;
