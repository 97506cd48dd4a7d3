//! Shared test doubles for the pipeline and GraphQL client tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pageprops_core::{CacheSnapshot, HostTenantResolver, RequestContext, TenantName};
use serde_json::Value;

use crate::graph::transport::GraphErrorEntry;
use crate::graph::{GraphClient, GraphError, GraphRequest, GraphResponse, GraphTransport};

/// Transport that answers every request with the same canned response.
pub struct StubTransport {
    response: GraphResponse,
    calls: AtomicUsize,
}

impl StubTransport {
    pub fn with_data(data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            other => panic!("stub data must be an object, got {other}"),
        };
        Self {
            response: GraphResponse {
                data: Some(data),
                errors: Vec::new(),
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_errors(messages: &[&str]) -> Self {
        Self {
            response: GraphResponse {
                data: None,
                errors: messages
                    .iter()
                    .map(|m| GraphErrorEntry {
                        message: (*m).to_string(),
                    })
                    .collect(),
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphTransport for StubTransport {
    async fn execute(&self, _request: &GraphRequest) -> Result<GraphResponse, GraphError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

/// Client factory that counts constructions and serves `data` for every query.
#[derive(Clone)]
pub struct StubFactory {
    data: Value,
    created: Arc<AtomicUsize>,
}

impl StubFactory {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            created: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl<Q> crate::graph::GraphClientFactory<Q> for StubFactory {
    fn create(
        &self,
        snapshot: Option<CacheSnapshot>,
        tenant_name: TenantName,
        _ctx: Option<&RequestContext<Q>>,
    ) -> Result<GraphClient, GraphError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(GraphClient::new(
            tenant_name,
            Arc::new(StubTransport::with_data(self.data.clone())),
            snapshot,
        ))
    }
}

/// Resolver knowing `a.example.com` and `b.example.com`.
pub fn resolver() -> HostTenantResolver {
    HostTenantResolver::new()
        .with_host("a.example.com", TenantName::TenantA)
        .with_host("b.example.com", TenantName::TenantB)
}
