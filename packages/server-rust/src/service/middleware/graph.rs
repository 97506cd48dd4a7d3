//! GraphQL client middleware for page pipelines.
//!
//! Builds a fresh, tenant-scoped `GraphClient` for every request, hands it
//! to the inner service, and embeds the client's cache under
//! `initialApolloState` once the inner service has produced props.

use std::sync::Arc;
use std::task::{Context, Poll};

use pageprops_core::{
    PageProps, PropsError, ServerSideResult, TenantContext, INITIAL_APOLLO_STATE_KEY,
};
use serde::Serialize;
use tower::{Layer, Service};
use tracing::debug;

use super::PageFuture;
use crate::error::PageError;
use crate::graph::{GraphClientFactory, GraphContext};

// ---------------------------------------------------------------------------
// GraphLayer
// ---------------------------------------------------------------------------

/// Tower layer that provides each request with its own `GraphClient`.
pub struct GraphLayer<F> {
    factory: Arc<F>,
}

impl<F> GraphLayer<F> {
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self::from_shared(Arc::new(factory))
    }

    #[must_use]
    pub fn from_shared(factory: Arc<F>) -> Self {
        Self { factory }
    }
}

impl<F> Clone for GraphLayer<F> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<F, S> Layer<S> for GraphLayer<F> {
    type Service = GraphService<F, S>;

    fn layer(&self, inner: S) -> Self::Service {
        GraphService {
            inner,
            factory: Arc::clone(&self.factory),
        }
    }
}

// ---------------------------------------------------------------------------
// GraphService
// ---------------------------------------------------------------------------

/// Service wrapper that owns the request's `GraphClient` for the duration of the call.
pub struct GraphService<F, S> {
    inner: S,
    factory: Arc<F>,
}

impl<F, S: Clone> Clone for GraphService<F, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<Q, F, S, P> Service<TenantContext<Q>> for GraphService<F, S>
where
    Q: Send + 'static,
    F: GraphClientFactory<Q>,
    S: Service<GraphContext<Q>, Response = ServerSideResult<P>, Error = PageError>,
    S::Future: Send + 'static,
    P: Serialize + Send + 'static,
{
    type Response = ServerSideResult;
    type Error = PageError;
    type Future = PageFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, ctx: TenantContext<Q>) -> Self::Future {
        let TenantContext {
            request,
            tenant_name,
        } = ctx;

        // Server-side clients always start from an empty cache.
        let client = match self.factory.create(None, tenant_name, Some(&request)) {
            Ok(client) => client,
            Err(err) => return Box::pin(async move { Err(PageError::from(err)) }),
        };
        let cache = client.clone();

        let fut = self.inner.call(GraphContext {
            request,
            tenant_name,
            client,
        });
        Box::pin(async move {
            let result = fut.await?;
            let result = result.try_map_props(|props| {
                let mut props = PageProps::from_serializable(&props)?;
                let snapshot = cache.extract();
                debug!(tenant = %tenant_name, records = snapshot.len(), "embedding GraphQL cache");
                props.inject(INITIAL_APOLLO_STATE_KEY, serde_json::to_value(snapshot)?);
                Ok::<_, PropsError>(props)
            })?;
            Ok(result)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use pageprops_core::{CacheSnapshot, QueryParams, RequestContext, TenantName};
    use serde_json::json;
    use tower::{service_fn, ServiceExt};

    use super::*;
    use crate::graph::{GraphClient, GraphError, GraphRequest};
    use crate::testing::StubFactory;

    fn tenant_ctx() -> TenantContext {
        TenantContext {
            request: RequestContext::new("req-1", QueryParams::new()),
            tenant_name: TenantName::TenantA,
        }
    }

    #[tokio::test]
    async fn embeds_cache_filled_by_the_handler() {
        let factory = StubFactory::new(json!({ "hello": "world" }));
        let inner = service_fn(|ctx: GraphContext| async move {
            ctx.client.query(&GraphRequest::new("query TopPage { hello }")).await?;
            Ok::<_, PageError>(ServerSideResult::Props(PageProps::new()))
        });
        let svc = GraphLayer::new(factory.clone()).layer(inner);

        let props = svc.oneshot(tenant_ctx()).await.unwrap().into_props().unwrap();
        assert_eq!(
            props.get(INITIAL_APOLLO_STATE_KEY),
            Some(&json!({ "ROOT_QUERY": { "hello": "world" } }))
        );
        assert_eq!(factory.created(), 1);
    }

    #[tokio::test]
    async fn handler_receives_client_for_the_resolved_tenant() {
        let inner = service_fn(|ctx: GraphContext| async move {
            assert_eq!(ctx.client.tenant_name(), ctx.tenant_name);
            assert!(ctx.client.extract().is_empty());
            Ok::<_, PageError>(ServerSideResult::Props(PageProps::new()))
        });
        let svc = GraphLayer::new(StubFactory::new(json!({}))).layer(inner);

        let props = svc.oneshot(tenant_ctx()).await.unwrap().into_props().unwrap();
        assert_eq!(props.get(INITIAL_APOLLO_STATE_KEY), Some(&json!({})));
    }

    #[tokio::test]
    async fn redirect_skips_cache_embedding() {
        let inner = service_fn(|_ctx: GraphContext| async {
            Ok::<_, PageError>(ServerSideResult::<PageProps>::redirect("/login", false))
        });
        let svc = GraphLayer::new(StubFactory::new(json!({}))).layer(inner);

        let result = svc.oneshot(tenant_ctx()).await.unwrap();
        assert_eq!(result, ServerSideResult::redirect("/login", false));
    }

    #[tokio::test]
    async fn factory_failure_surfaces_before_handler_runs() {
        let factory =
            |_snapshot: Option<CacheSnapshot>, tenant: TenantName, _ctx: Option<&RequestContext>| {
                Err::<GraphClient, _>(GraphError::NoEndpoint { tenant })
            };
        // Would turn the call into Ok(NotFound) if it ran.
        let inner = service_fn(|_ctx: GraphContext| async {
            Ok::<_, PageError>(ServerSideResult::<PageProps>::NotFound)
        });
        let svc = GraphLayer::new(factory).layer(inner);

        let err = svc.oneshot(tenant_ctx()).await.unwrap_err();
        assert!(matches!(
            err,
            PageError::Graph(GraphError::NoEndpoint { tenant: TenantName::TenantA })
        ));
    }
}
