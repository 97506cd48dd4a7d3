//! Tower middleware layers for page pipelines.
//!
//! - [`tenant`]: Host-header tenant resolution and `tenantName` injection
//! - [`graph`]: Per-request `GraphClient` and `initialApolloState` injection
//! - [`span`]: Page load timing and outcome via `tracing` spans and `metrics`
//! - [`pipeline`]: Composes the layers into a page service

pub mod graph;
pub mod pipeline;
pub mod span;
pub mod tenant;

use std::future::Future;
use std::pin::Pin;

use pageprops_core::ServerSideResult;

use crate::error::PageError;

pub use graph::{GraphLayer, GraphService};
pub use pipeline::{build_page_pipeline, GlobalLayer, PageService};
pub use span::{PageSpanLayer, PageSpanService};
pub use tenant::{TenantLayer, TenantService};

/// Boxed future returned by every page pipeline stage.
pub type PageFuture = Pin<Box<dyn Future<Output = Result<ServerSideResult, PageError>> + Send>>;
