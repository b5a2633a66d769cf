//! Shared application state for KVDB Web.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. The backend client is read-only after
//! construction; the metrics registry is safe for concurrent increments.

use kvdbw_client::KvdbClient;

use crate::metrics::RequestMetrics;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Authenticated client for the KVDB backend.
    pub client: KvdbClient,
    /// Request counters.
    pub metrics: RequestMetrics,
    /// Log raw form bodies when they fail to parse.
    pub debug: bool,
}

impl AppState {
    pub fn new(client: KvdbClient, debug: bool) -> Self {
        Self {
            client,
            metrics: RequestMetrics::new(),
            debug,
        }
    }
}
