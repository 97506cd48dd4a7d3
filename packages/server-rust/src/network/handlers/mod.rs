//! HTTP handlers for the page server.
//!
//! Defines `AppState` (shared state carried through axum extractors) and
//! re-exports the handlers for building the router.

pub mod health;
pub mod page;

pub use health::health_handler;
pub use page::{page_handler, render_result, request_context};

use std::sync::Arc;
use std::time::Instant;

use super::NetworkConfig;

/// Shared application state passed to handlers via `State` extraction.
#[derive(Clone)]
pub struct AppState {
    /// Network configuration (bind address, CORS, timeout).
    pub config: Arc<NetworkConfig>,
    /// Paths of the mounted pages.
    pub pages: Arc<[String]>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
