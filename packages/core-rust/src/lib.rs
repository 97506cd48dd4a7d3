//! `PageProps` Core: tenant identity, request context, page props and GraphQL cache snapshots.

pub mod cache;
pub mod context;
pub mod props;
pub mod tenant;

pub use cache::{CacheSnapshot, ROOT_QUERY};
pub use context::{QueryParams, RequestContext, TenantContext};
pub use props::{
    PageProps, PropsError, Redirect, ServerSideResult, INITIAL_APOLLO_STATE_KEY, TENANT_NAME_KEY,
};
pub use tenant::{HostTenantResolver, TenantName, TenantResolver, UnknownTenant};
