//! Page data loaders served by the bundled binary.

use pageprops_core::{PageProps, ServerSideResult};
use tracing::info;

use crate::error::PageError;
use crate::graph::{GraphContext, GraphRequest};

pub const TOP_PAGE_QUERY: &str = "query TopPage { hello }";

/// Top page: warms the cache with `hello` so the client renders without refetching.
///
/// # Errors
///
/// Returns `PageError::Graph` if the query fails.
pub async fn top_page(ctx: GraphContext) -> Result<ServerSideResult, PageError> {
    let request = GraphRequest::new(TOP_PAGE_QUERY).operation_name("TopPage");
    ctx.client.query(&request).await?;
    info!(tenant = %ctx.tenant_name, request_id = %ctx.request_id, "top page loaded");
    Ok(ServerSideResult::Props(PageProps::new()))
}
