//! Per-request GraphQL client used during server-side data loading.
//!
//! - [`transport`]: request/response wire types and the HTTP transport
//! - [`client`]: `GraphClient` with its normalized result cache
//! - [`factory`]: tenant-scoped client construction

pub mod client;
pub mod factory;
pub mod transport;

use std::ops::Deref;

use pageprops_core::{QueryParams, RequestContext, TenantName};

pub use client::GraphClient;
pub use factory::{GraphClientFactory, HttpClientFactory};
pub use transport::{GraphRequest, GraphResponse, GraphTransport, HttpTransport};

/// Errors raised while building or using a `GraphClient`.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("no GraphQL endpoint configured for tenant {tenant}")]
    NoEndpoint { tenant: TenantName },
    #[error("invalid header {name}")]
    InvalidHeader { name: String },
    #[error("GraphQL transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("GraphQL endpoint returned HTTP {status}")]
    Status { status: u16 },
    #[error("GraphQL errors: {}", messages.join("; "))]
    Response { messages: Vec<String> },
}

/// Tenant context extended with the request's GraphQL client.
///
/// This is what page handlers receive. It dereferences to the underlying
/// [`RequestContext`].
#[derive(Debug, Clone)]
pub struct GraphContext<Q = QueryParams> {
    pub request: RequestContext<Q>,
    pub tenant_name: TenantName,
    pub client: GraphClient,
}

impl<Q> Deref for GraphContext<Q> {
    type Target = RequestContext<Q>;

    fn deref(&self) -> &Self::Target {
        &self.request
    }
}
