//! HTTP handler definitions for the Suivi server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod health;
pub mod me;

pub use health::{health_handler, liveness_handler};
pub use me::me_handler;

use std::time::Instant;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Authentication state travels as request extensions, not through here.
#[derive(Clone)]
pub struct AppState {
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
