//! Rendering boundary: turns page props back into a tenant-bound client.
//!
//! Every page that went through the global pipeline carries `tenantName`
//! and `initialApolloState`. Pages that bypassed it have no snapshot, which
//! is fine, but a missing tenant is always a bug and is reported as one.

use pageprops_core::{
    CacheSnapshot, PageProps, QueryParams, TenantName, INITIAL_APOLLO_STATE_KEY, TENANT_NAME_KEY,
};

use crate::error::PageError;
use crate::graph::{GraphClient, GraphClientFactory};

/// Everything the root component needs to render a page.
#[derive(Debug)]
pub struct HydratedApp {
    pub tenant_name: TenantName,
    /// Client seeded from the server's cache snapshot; no request context.
    pub client: GraphClient,
    /// The page's props, passed on unchanged.
    pub page_props: PageProps,
}

/// Rebuilds the tenant's client from page props.
///
/// # Errors
///
/// - `PageError::MissingTenantAtRender` if `tenantName` is absent
/// - `PageError::Props` if `tenantName` or `initialApolloState` is malformed
/// - `PageError::Graph` if the factory cannot build a client for the tenant
pub fn hydrate<F>(page_props: PageProps, factory: &F) -> Result<HydratedApp, PageError>
where
    F: GraphClientFactory<QueryParams> + ?Sized,
{
    let tenant_name = page_props
        .get_as::<TenantName>(TENANT_NAME_KEY)?
        .ok_or(PageError::MissingTenantAtRender)?;
    let snapshot = page_props.get_as::<CacheSnapshot>(INITIAL_APOLLO_STATE_KEY)?;
    let client = factory.create(snapshot, tenant_name, None)?;

    Ok(HydratedApp {
        tenant_name,
        client,
        page_props,
    })
}
