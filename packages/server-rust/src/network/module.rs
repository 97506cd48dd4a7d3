//! Page server with deferred startup lifecycle.
//!
//! `new()` collects configuration and pages, `start()` binds the TCP
//! listener, and `serve()` accepts connections until shutdown. Splitting
//! `start()` from `serve()` lets callers learn the bound port first.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::config::NetworkConfig;
use super::handlers::{health_handler, page_handler, AppState};
use super::middleware::build_http_layers;
use crate::service::PageService;

/// Serves page pipelines over HTTP.
///
/// Each page is mounted at an axum path (`/`, `/posts/{id}`); path segments
/// become `RequestContext::params`.
pub struct PageServer {
    config: NetworkConfig,
    pages: Vec<(String, PageService)>,
    listener: Option<TcpListener>,
}

impl PageServer {
    #[must_use]
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            listener: None,
        }
    }

    /// Mounts `service` at `path`.
    #[must_use]
    pub fn page(mut self, path: impl Into<String>, service: PageService) -> Self {
        self.pages.push((path.into(), service));
        self
    }

    /// Mounted page paths, in registration order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|(path, _)| path.as_str())
    }

    /// Assembles the axum router with all pages and middleware.
    ///
    /// Routes:
    /// - `GET /health` -- liveness JSON
    /// - `GET <path>` -- one per mounted page
    pub fn build_router(&self) -> Router {
        let state = AppState {
            config: Arc::new(self.config.clone()),
            pages: self.paths().map(str::to_owned).collect(),
            start_time: Instant::now(),
        };

        let mut router = Router::new().route("/health", get(health_handler));
        for (path, page) in &self.pages {
            let page = page.clone();
            router = router.route(
                path,
                get(
                    move |params: Option<Path<HashMap<String, String>>>,
                          query: Query<Vec<(String, String)>>,
                          headers: HeaderMap| {
                        page_handler(page, params, query, headers)
                    },
                ),
            );
        }

        router
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the bound port, which differs from the configured one when
    /// port 0 is used.
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

    /// Serves requests until `shutdown` resolves, then lets in-flight
    /// requests finish.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server hits
    /// a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let Some(listener) = self.listener.take() else {
            anyhow::bail!("start() must be called before serve()");
        };
        let router = self.build_router();

        info!(pages = self.pages.len(), "serving page requests");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("page server stopped");
        Ok(())
    }
}
