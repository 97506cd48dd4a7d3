//! Tenant configuration: host table and GraphQL endpoints loaded from JSON.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context as _};
use pageprops_core::{HostTenantResolver, TenantName};
use serde::Deserialize;

use crate::graph::factory::DEFAULT_FORWARD_HEADERS;
use crate::graph::HttpClientFactory;

/// Tenant table and GraphQL wiring for the page pipelines.
///
/// Loaded from a JSON file:
///
/// ```json
/// {
///   "tenants": [
///     { "tenant": "Tenant-A", "hosts": ["a.example.com"], "graphqlEndpoint": "http://a/graphql" }
///   ],
///   "forwardHeaders": ["cookie", "authorization"]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppConfig {
    pub tenants: Vec<TenantConfig>,
    /// Request headers copied onto outgoing GraphQL requests.
    #[serde(default = "default_forward_headers")]
    pub forward_headers: Vec<String>,
}

/// One tenant's hosts and backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TenantConfig {
    pub tenant: TenantName,
    #[serde(default)]
    pub hosts: Vec<String>,
    pub graphql_endpoint: String,
}

fn default_forward_headers() -> Vec<String> {
    DEFAULT_FORWARD_HEADERS.iter().map(|h| (*h).to_string()).collect()
}

impl AppConfig {
    /// Reads and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON for
    /// this schema, or fails [`AppConfig::validate`].
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects tables where a tenant or a host appears twice.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first duplicate found.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut tenants = HashSet::new();
        let mut hosts = HashSet::new();
        for entry in &self.tenants {
            if !tenants.insert(entry.tenant) {
                bail!("tenant {} is configured more than once", entry.tenant);
            }
            for host in &entry.hosts {
                let host = host.to_ascii_lowercase();
                if hosts.contains(&host) {
                    bail!("host {host} is mapped to more than one tenant");
                }
                hosts.insert(host);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn resolver(&self) -> HostTenantResolver {
        let mut resolver = HostTenantResolver::new();
        for entry in &self.tenants {
            for host in &entry.hosts {
                resolver.insert(host, entry.tenant);
            }
        }
        resolver
    }

    #[must_use]
    pub fn client_factory(&self, http: reqwest::Client) -> HttpClientFactory {
        self.tenants
            .iter()
            .fold(HttpClientFactory::new(http), |factory, entry| {
                factory.with_endpoint(entry.tenant, entry.graphql_endpoint.clone())
            })
            .with_forward_headers(&self.forward_headers)
    }
}
