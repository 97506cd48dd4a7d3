use std::collections::BTreeMap;
use std::ops::Deref;

use crate::tenant::TenantName;

/// Query string parameters; repeated keys keep every value in arrival order.
pub type QueryParams = BTreeMap<String, Vec<String>>;

/// Per-request context handed to the outermost page handler.
///
/// Treated as immutable once received: each pipeline stage wraps it in a
/// richer context instead of mutating it. Generic over the query type so
/// pages can parse the query string into their own struct up front.
#[derive(Debug, Clone)]
pub struct RequestContext<Q = QueryParams> {
    /// Identifier used to correlate logs for this request.
    pub request_id: String,
    /// Request headers keyed by lower-cased name.
    pub headers: BTreeMap<String, String>,
    /// Dynamic route segments (e.g. `id` for `/posts/{id}`).
    pub params: BTreeMap<String, String>,
    /// Parsed query string.
    pub query: Q,
}

impl<Q> RequestContext<Q> {
    #[must_use]
    pub fn new(request_id: impl Into<String>, query: Q) -> Self {
        Self {
            request_id: request_id.into(),
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            query,
        }
    }

    /// Adds a header. Names are stored lower-cased; a repeated name replaces
    /// the earlier value.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The raw `Host` header, if present.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.header("host")
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

impl RequestContext<QueryParams> {
    /// First value for a query key.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// Request context extended with the tenant resolved for it.
///
/// Dereferences to the wrapped [`RequestContext`], so handlers read headers
/// and params exactly as they would on the bare request.
#[derive(Debug, Clone)]
pub struct TenantContext<Q = QueryParams> {
    pub request: RequestContext<Q>,
    pub tenant_name: TenantName,
}

impl<Q> Deref for TenantContext<Q> {
    type Target = RequestContext<Q>;

    fn deref(&self) -> &Self::Target {
        &self.request
    }
}
