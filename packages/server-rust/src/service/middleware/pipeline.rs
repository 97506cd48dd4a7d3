//! Pipeline composition: wraps a page handler in the tenant and GraphQL layers.

use std::sync::Arc;

use pageprops_core::{QueryParams, RequestContext, ServerSideResult, TenantResolver};
use serde::Serialize;
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service, ServiceBuilder};

use super::graph::{GraphLayer, GraphService};
use super::span::PageSpanLayer;
use super::tenant::{TenantLayer, TenantService};
use crate::error::PageError;
use crate::graph::{GraphClientFactory, GraphContext};

/// Type-erased page pipeline, ready to be mounted by the HTTP adapter.
///
/// `Clone + Send + Sync`, so a router can hold it directly and clone it per
/// request.
pub type PageService<Q = QueryParams> =
    BoxCloneSyncService<RequestContext<Q>, ServerSideResult, PageError>;

// ---------------------------------------------------------------------------
// GlobalLayer
// ---------------------------------------------------------------------------

/// The layers every tenant-aware page uses, applied as one.
///
/// Layer order (outermost to innermost):
/// 1. `TenantLayer` -- resolve the tenant; a client cannot be built without one
/// 2. `GraphLayer` -- build the tenant's `GraphClient` and embed its cache
///
/// A page handler wrapped by this layer receives a `GraphContext` and its
/// props come back with `tenantName` and `initialApolloState` added.
pub struct GlobalLayer<R, F> {
    tenant: TenantLayer<R>,
    graph: GraphLayer<F>,
}

impl<R, F> GlobalLayer<R, F> {
    #[must_use]
    pub fn new(resolver: R, factory: F) -> Self {
        Self::from_shared(Arc::new(resolver), Arc::new(factory))
    }

    #[must_use]
    pub fn from_shared(resolver: Arc<R>, factory: Arc<F>) -> Self {
        Self {
            tenant: TenantLayer::from_shared(resolver),
            graph: GraphLayer::from_shared(factory),
        }
    }
}

impl<R, F> Clone for GlobalLayer<R, F> {
    fn clone(&self) -> Self {
        Self {
            tenant: self.tenant.clone(),
            graph: self.graph.clone(),
        }
    }
}

impl<R, F, S> Layer<S> for GlobalLayer<R, F> {
    type Service = TenantService<R, GraphService<F, S>>;

    fn layer(&self, inner: S) -> Self::Service {
        self.tenant.layer(self.graph.layer(inner))
    }
}

/// Build a page pipeline by wrapping `handler` with the global layers.
///
/// Layer order (outermost to innermost):
/// 1. `PageSpanLayer` -- span, timing and outcome for the whole load
/// 2. `GlobalLayer` -- tenant resolution, then GraphQL client
///
/// `page` names the page in logs and metrics.
#[must_use]
pub fn build_page_pipeline<Q, R, F, S, P>(
    page: &str,
    global: &GlobalLayer<R, F>,
    handler: S,
) -> PageService<Q>
where
    Q: Send + 'static,
    R: TenantResolver<Q> + 'static,
    F: GraphClientFactory<Q> + 'static,
    S: Service<GraphContext<Q>, Response = ServerSideResult<P>, Error = PageError>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    P: Serialize + Send + 'static,
{
    let svc = ServiceBuilder::new()
        .layer(PageSpanLayer::new(page))
        .layer(global.clone())
        .service(handler);
    BoxCloneSyncService::new(svc)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pageprops_core::{
        PageProps, TenantName, INITIAL_APOLLO_STATE_KEY, TENANT_NAME_KEY,
    };
    use serde_json::json;
    use tower::{service_fn, ServiceExt};

    use super::*;
    use crate::graph::{GraphError, GraphRequest};
    use crate::testing::{resolver, StubFactory};

    fn request(host: &str) -> RequestContext {
        RequestContext::new("req-1", QueryParams::new()).with_header("Host", host)
    }

    fn global(factory: StubFactory) -> GlobalLayer<pageprops_core::HostTenantResolver, StubFactory> {
        GlobalLayer::new(resolver(), factory)
    }

    #[tokio::test]
    async fn greeting_page_gets_tenant_and_empty_cache() {
        let handler = service_fn(|_ctx: GraphContext| async {
            Ok::<_, PageError>(ServerSideResult::Props(json!({ "greeting": "hi" })))
        });
        let svc = build_page_pipeline("greeting", &global(StubFactory::new(json!({}))), handler);

        let result = svc.oneshot(request("a.example.com")).await.unwrap();
        let expected: PageProps = serde_json::from_value(json!({
            "greeting": "hi",
            "tenantName": "Tenant-A",
            "initialApolloState": {},
        }))
        .unwrap();
        assert_eq!(result, ServerSideResult::Props(expected));
    }

    #[tokio::test]
    async fn unknown_host_never_reaches_handler_or_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = StubFactory::new(json!({}));
        let handler = {
            let calls = Arc::clone(&calls);
            service_fn(move |_ctx: GraphContext| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, PageError>(ServerSideResult::Props(PageProps::new())) }
            })
        };
        let svc = build_page_pipeline("top", &global(factory.clone()), handler);

        let err = svc.oneshot(request("unknown.example.com")).await.unwrap_err();
        assert!(matches!(err, PageError::TenantResolution { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(factory.created(), 0);
    }

    #[tokio::test]
    async fn pass_through_results_are_returned_exactly() {
        for expected in [
            ServerSideResult::<PageProps>::redirect("/signin", true),
            ServerSideResult::NotFound,
        ] {
            let returned = expected.clone();
            let handler = service_fn(move |_ctx: GraphContext| {
                let returned = returned.clone();
                async move { Ok::<_, PageError>(returned) }
            });
            let svc = build_page_pipeline("top", &global(StubFactory::new(json!({}))), handler);

            let result = svc.oneshot(request("a.example.com")).await.unwrap();
            assert_eq!(result, expected);
        }
    }

    #[tokio::test]
    async fn props_gain_exactly_the_two_injected_keys() {
        let handler = service_fn(|_ctx: GraphContext| async {
            Ok::<_, PageError>(ServerSideResult::Props(json!({ "a": 1, "b": [2], "c": null })))
        });
        let svc = build_page_pipeline("top", &global(StubFactory::new(json!({}))), handler);

        let props = svc
            .oneshot(request("b.example.com"))
            .await
            .unwrap()
            .into_props()
            .unwrap();
        let keys: BTreeSet<&str> = props.keys().collect();
        assert_eq!(
            keys,
            BTreeSet::from(["a", "b", "c", TENANT_NAME_KEY, INITIAL_APOLLO_STATE_KEY])
        );
        assert_eq!(props.get("b"), Some(&json!([2])));
        assert_eq!(props.get(TENANT_NAME_KEY), Some(&json!("Tenant-B")));
    }

    #[tokio::test]
    async fn page_keys_win_over_injected_keys() {
        let handler = service_fn(|_ctx: GraphContext| async {
            Ok::<_, PageError>(ServerSideResult::Props(json!({
                "tenantName": "page-chosen",
                "initialApolloState": "page-state",
            })))
        });
        let svc = build_page_pipeline("top", &global(StubFactory::new(json!({}))), handler);

        let props = svc
            .oneshot(request("a.example.com"))
            .await
            .unwrap()
            .into_props()
            .unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props.get(TENANT_NAME_KEY), Some(&json!("page-chosen")));
        assert_eq!(props.get(INITIAL_APOLLO_STATE_KEY), Some(&json!("page-state")));
    }

    #[tokio::test]
    async fn handler_errors_propagate_unchanged() {
        let handler = service_fn(|_ctx: GraphContext| async {
            Err::<ServerSideResult, _>(PageError::Graph(GraphError::Status { status: 503 }))
        });
        let svc = build_page_pipeline("top", &global(StubFactory::new(json!({}))), handler);

        let err = svc.oneshot(request("a.example.com")).await.unwrap_err();
        assert!(matches!(err, PageError::Graph(GraphError::Status { status: 503 })));
    }

    #[tokio::test]
    async fn queried_data_is_embedded_for_rehydration() {
        let handler = service_fn(|ctx: GraphContext| async move {
            ctx.client
                .query(&GraphRequest::new("query TopPage { hello }").operation_name("TopPage"))
                .await?;
            Ok::<_, PageError>(ServerSideResult::Props(PageProps::new()))
        });
        let svc = build_page_pipeline(
            "top",
            &global(StubFactory::new(json!({ "hello": "from Tenant-A" }))),
            handler,
        );

        let props = svc
            .oneshot(request("a.example.com"))
            .await
            .unwrap()
            .into_props()
            .unwrap();
        assert_eq!(
            props.get(INITIAL_APOLLO_STATE_KEY),
            Some(&json!({ "ROOT_QUERY": { "hello": "from Tenant-A" } }))
        );
    }

    #[tokio::test]
    async fn each_request_gets_a_cold_client() {
        let factory = StubFactory::new(json!({ "hello": "hi" }));
        let handler = service_fn(|ctx: GraphContext| async move {
            assert!(ctx.client.extract().is_empty());
            ctx.client.query(&GraphRequest::new("{ hello }")).await?;
            Ok::<_, PageError>(ServerSideResult::Props(PageProps::new()))
        });
        let svc = build_page_pipeline("top", &global(factory.clone()), handler);

        for _ in 0..3 {
            svc.clone().oneshot(request("a.example.com")).await.unwrap();
        }
        assert_eq!(factory.created(), 3);
    }

    #[tokio::test]
    async fn typed_query_and_props_share_one_implementation() {
        #[derive(Debug, Clone)]
        struct Paging {
            page: u32,
        }

        #[derive(serde::Serialize)]
        struct ListProps {
            page: u32,
            tenant: TenantName,
        }

        let handler = service_fn(|ctx: GraphContext<Paging>| async move {
            Ok::<_, PageError>(ServerSideResult::Props(ListProps {
                page: ctx.query.page,
                tenant: ctx.tenant_name,
            }))
        });
        let svc: PageService<Paging> =
            build_page_pipeline("list", &global(StubFactory::new(json!({}))), handler);

        let req = RequestContext::new("req-1", Paging { page: 4 }).with_header("Host", "b.example.com");
        let props = svc.oneshot(req).await.unwrap().into_props().unwrap();
        assert_eq!(props.get("page"), Some(&json!(4)));
        assert_eq!(props.get("tenant"), Some(&json!("Tenant-B")));
        assert_eq!(props.get(TENANT_NAME_KEY), Some(&json!("Tenant-B")));
    }

    #[tokio::test]
    async fn non_object_props_are_rejected() {
        let handler = service_fn(|_ctx: GraphContext| async {
            Ok::<_, PageError>(ServerSideResult::Props(vec![1, 2, 3]))
        });
        let svc = build_page_pipeline("top", &global(StubFactory::new(json!({}))), handler);

        let err = svc.oneshot(request("a.example.com")).await.unwrap_err();
        assert!(matches!(err, PageError::Props(_)));
    }
}
