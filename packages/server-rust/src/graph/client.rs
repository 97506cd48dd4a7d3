//! Request-scoped GraphQL client with a normalized result cache.

use std::fmt;
use std::sync::Arc;

use pageprops_core::{CacheSnapshot, TenantName};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::transport::{GraphRequest, GraphTransport};
use super::GraphError;

/// GraphQL client bound to one tenant.
///
/// Cloning is cheap and clones share the same cache, so the copy handed to
/// a page handler and the copy kept by the pipeline observe the same
/// results. A client is never shared across requests.
#[derive(Clone)]
pub struct GraphClient {
    tenant_name: TenantName,
    transport: Arc<dyn GraphTransport>,
    cache: Arc<Mutex<CacheSnapshot>>,
}

impl GraphClient {
    /// Creates a client, optionally seeded from a previously extracted cache.
    #[must_use]
    pub fn new(
        tenant_name: TenantName,
        transport: Arc<dyn GraphTransport>,
        snapshot: Option<CacheSnapshot>,
    ) -> Self {
        Self {
            tenant_name,
            transport,
            cache: Arc::new(Mutex::new(snapshot.unwrap_or_default())),
        }
    }

    #[must_use]
    pub fn tenant_name(&self) -> TenantName {
        self.tenant_name
    }

    /// Executes `request` and writes its `data` into the cache.
    ///
    /// # Errors
    ///
    /// Returns the transport's error, or `GraphError::Response` when the
    /// endpoint reports GraphQL errors. Nothing is cached on error.
    pub async fn query(&self, request: &GraphRequest) -> Result<Map<String, Value>, GraphError> {
        debug!(
            tenant = %self.tenant_name,
            operation = request.operation_name.as_deref().unwrap_or("anonymous"),
            "executing GraphQL query"
        );

        let response = self.transport.execute(request).await?;
        if !response.errors.is_empty() {
            let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
            warn!(tenant = %self.tenant_name, errors = messages.len(), "GraphQL query returned errors");
            return Err(GraphError::Response { messages });
        }

        let data = response.data.unwrap_or_default();
        self.cache
            .lock()
            .write_query_result(&data, &request.variables);
        Ok(data)
    }

    /// Reads a root field from the cache without touching the network.
    #[must_use]
    pub fn read_root_field(&self, field: &str, variables: &Map<String, Value>) -> Option<Value> {
        self.cache.lock().read_root_field(field, variables)
    }

    /// Copies the accumulated cache out as a serializable snapshot.
    #[must_use]
    pub fn extract(&self) -> CacheSnapshot {
        self.cache.lock().clone()
    }
}

impl fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphClient")
            .field("tenant_name", &self.tenant_name)
            .field("cached_records", &self.cache.lock().len())
            .finish_non_exhaustive()
    }
}
