//! Tenant-scoped construction of `GraphClient`s.

use std::collections::HashMap;
use std::sync::Arc;

use pageprops_core::{CacheSnapshot, RequestContext, TenantName};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use super::client::GraphClient;
use super::transport::HttpTransport;
use super::GraphError;

/// Request headers forwarded to the GraphQL endpoint unless configured otherwise.
pub const DEFAULT_FORWARD_HEADERS: [&str; 2] = ["cookie", "authorization"];

/// Header carrying the tenant name on every GraphQL request.
pub const TENANT_HEADER: &str = "x-tenant-name";

/// Builds a `GraphClient` for a tenant.
///
/// On the server the pipeline calls this with no snapshot and the current
/// request. The rendering side calls it with the snapshot from page props
/// and no request. Closures with the same signature implement this trait.
pub trait GraphClientFactory<Q>: Send + Sync {
    /// # Errors
    ///
    /// Returns `GraphError` if no client can be built for `tenant_name`.
    fn create(
        &self,
        snapshot: Option<CacheSnapshot>,
        tenant_name: TenantName,
        ctx: Option<&RequestContext<Q>>,
    ) -> Result<GraphClient, GraphError>;
}

impl<Q, F> GraphClientFactory<Q> for F
where
    F: Fn(Option<CacheSnapshot>, TenantName, Option<&RequestContext<Q>>) -> Result<GraphClient, GraphError>
        + Send
        + Sync,
{
    fn create(
        &self,
        snapshot: Option<CacheSnapshot>,
        tenant_name: TenantName,
        ctx: Option<&RequestContext<Q>>,
    ) -> Result<GraphClient, GraphError> {
        self(snapshot, tenant_name, ctx)
    }
}

// ---------------------------------------------------------------------------
// HttpClientFactory
// ---------------------------------------------------------------------------

/// Builds clients that talk to one GraphQL endpoint per tenant over HTTP.
///
/// A single `reqwest::Client` (and its connection pool) backs every client
/// the factory creates; each `GraphClient` still gets its own cache.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    http: reqwest::Client,
    endpoints: HashMap<TenantName, String>,
    forward_headers: Vec<String>,
}

impl HttpClientFactory {
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            endpoints: HashMap::new(),
            forward_headers: DEFAULT_FORWARD_HEADERS.iter().map(|h| (*h).to_string()).collect(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, tenant: TenantName, url: impl Into<String>) -> Self {
        self.endpoints.insert(tenant, url.into());
        self
    }

    /// Replaces the list of request headers copied onto GraphQL requests.
    #[must_use]
    pub fn with_forward_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.forward_headers = headers
            .into_iter()
            .map(|h| h.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    #[must_use]
    pub fn endpoint(&self, tenant: TenantName) -> Option<&str> {
        self.endpoints.get(&tenant).map(String::as_str)
    }

    fn outbound_headers<Q>(
        &self,
        tenant_name: TenantName,
        ctx: Option<&RequestContext<Q>>,
    ) -> Result<HeaderMap, GraphError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(TENANT_HEADER),
            HeaderValue::from_static(tenant_name.as_str()),
        );

        let Some(ctx) = ctx else {
            return Ok(headers);
        };
        for name in &self.forward_headers {
            let Some(value) = ctx.header(name) else {
                continue;
            };
            let invalid = || GraphError::InvalidHeader { name: name.clone() };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

impl<Q> GraphClientFactory<Q> for HttpClientFactory {
    fn create(
        &self,
        snapshot: Option<CacheSnapshot>,
        tenant_name: TenantName,
        ctx: Option<&RequestContext<Q>>,
    ) -> Result<GraphClient, GraphError> {
        let endpoint = self
            .endpoint(tenant_name)
            .ok_or(GraphError::NoEndpoint {
                tenant: tenant_name,
            })?;
        let headers = self.outbound_headers(tenant_name, ctx)?;
        let transport = HttpTransport::new(self.http.clone(), endpoint, headers);
        Ok(GraphClient::new(tenant_name, Arc::new(transport), snapshot))
    }
}
