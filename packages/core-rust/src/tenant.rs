use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;

/// Tenant identity derived once per request from the `Host` header.
///
/// Serializes by its display name (`"Tenant-A"`), which is also the value
/// injected into page props under `tenantName`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TenantName {
    #[serde(rename = "Tenant-A")]
    TenantA,
    #[serde(rename = "Tenant-B")]
    TenantB,
    #[serde(rename = "Tenant-C")]
    TenantC,
}

impl TenantName {
    /// Every known tenant, in declaration order.
    pub const ALL: [TenantName; 3] = [Self::TenantA, Self::TenantB, Self::TenantC];

    /// Display name of the tenant.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TenantA => "Tenant-A",
            Self::TenantB => "Tenant-B",
            Self::TenantC => "Tenant-C",
        }
    }
}

impl fmt::Display for TenantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known tenant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tenant: {0}")]
pub struct UnknownTenant(pub String);

impl FromStr for TenantName {
    type Err = UnknownTenant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTenant(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// TenantResolver
// ---------------------------------------------------------------------------

/// Maps an inbound request to the tenant it targets.
///
/// Implementations must be read-only: the resolver is consulted exactly once
/// per request, before any handler runs. Plain closures taking
/// `&RequestContext<Q>` implement this trait.
pub trait TenantResolver<Q>: Send + Sync {
    /// Returns `None` when the request does not map to a known tenant.
    fn resolve(&self, ctx: &RequestContext<Q>) -> Option<TenantName>;
}

impl<Q, F> TenantResolver<Q> for F
where
    F: Fn(&RequestContext<Q>) -> Option<TenantName> + Send + Sync,
{
    fn resolve(&self, ctx: &RequestContext<Q>) -> Option<TenantName> {
        self(ctx)
    }
}

/// Resolves tenants from a static host table.
///
/// Hosts are compared case-insensitively with any `:port` suffix and
/// trailing dot removed, so `Tenant-a.Example.com:3000` matches an entry
/// registered as `tenant-a.example.com`.
#[derive(Debug, Clone, Default)]
pub struct HostTenantResolver {
    hosts: HashMap<String, TenantName>,
}

impl HostTenantResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `host` for `tenant`, replacing any earlier mapping.
    #[must_use]
    pub fn with_host(mut self, host: &str, tenant: TenantName) -> Self {
        self.insert(host, tenant);
        self
    }

    pub fn insert(&mut self, host: &str, tenant: TenantName) {
        self.hosts.insert(normalize_host(host), tenant);
    }

    /// Looks up a raw `Host` header value.
    #[must_use]
    pub fn lookup(&self, host: &str) -> Option<TenantName> {
        self.hosts.get(&normalize_host(host)).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl<Q> TenantResolver<Q> for HostTenantResolver {
    fn resolve(&self, ctx: &RequestContext<Q>) -> Option<TenantName> {
        ctx.host().and_then(|host| self.lookup(host))
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim();
    // IPv6 literals keep their brackets; only strip a port after them.
    let without_port = if let Some(end) = host.find(']') {
        &host[..=end]
    } else {
        host.split(':').next().unwrap_or(host)
    };
    without_port.trim_end_matches('.').to_ascii_lowercase()
}
