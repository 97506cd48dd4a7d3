//! Error type shared by every stage of the page pipeline.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pageprops_core::PropsError;
use serde_json::json;

use crate::graph::GraphError;

/// Errors returned by page pipelines.
///
/// Pipeline stages never catch or re-wrap these: an error raised by a page
/// handler reaches the caller as the same variant it was raised as.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// The `Host` header does not map to a known tenant.
    #[error(
        "tenant could not be determined from host header {}",
        host.as_deref().unwrap_or("<missing>")
    )]
    TenantResolution { host: Option<String> },
    /// Page props reached the rendering boundary without `tenantName`.
    #[error("page props are missing `tenantName`")]
    MissingTenantAtRender,
    #[error(transparent)]
    Props(#[from] PropsError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PageError {
    /// Stable label for logs and error bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TenantResolution { .. } => "tenant_resolution",
            Self::MissingTenantAtRender => "missing_tenant",
            Self::Props(_) => "props",
            Self::Graph(_) => "graph",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        // Host-table misses are deployment errors and map to 500 as well.
        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
