//! Tenant middleware for page pipelines.
//!
//! Resolves the tenant from the request's `Host` header, hands the inner
//! service a `TenantContext`, and injects `tenantName` into the props the
//! inner service returns.

use std::sync::Arc;
use std::task::{Context, Poll};

use pageprops_core::{
    PageProps, PropsError, RequestContext, ServerSideResult, TenantContext, TenantResolver,
    TENANT_NAME_KEY,
};
use serde::Serialize;
use serde_json::Value;
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::PageFuture;
use crate::error::PageError;

// ---------------------------------------------------------------------------
// TenantLayer
// ---------------------------------------------------------------------------

/// Tower layer that resolves the request's tenant before the inner service runs.
///
/// A request whose host maps to no tenant fails with
/// `PageError::TenantResolution` and the inner service is never called.
pub struct TenantLayer<R> {
    resolver: Arc<R>,
}

impl<R> TenantLayer<R> {
    #[must_use]
    pub fn new(resolver: R) -> Self {
        Self::from_shared(Arc::new(resolver))
    }

    /// Builds the layer around a resolver shared with other pipelines.
    #[must_use]
    pub fn from_shared(resolver: Arc<R>) -> Self {
        Self { resolver }
    }
}

impl<R> Clone for TenantLayer<R> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<R, S> Layer<S> for TenantLayer<R> {
    type Service = TenantService<R, S>;

    fn layer(&self, inner: S) -> Self::Service {
        TenantService {
            inner,
            resolver: Arc::clone(&self.resolver),
        }
    }
}

// ---------------------------------------------------------------------------
// TenantService
// ---------------------------------------------------------------------------

/// Service wrapper that threads the resolved tenant into and out of the inner service.
pub struct TenantService<R, S> {
    inner: S,
    resolver: Arc<R>,
}

impl<R, S: Clone> Clone for TenantService<R, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<Q, R, S, P> Service<RequestContext<Q>> for TenantService<R, S>
where
    Q: Send + 'static,
    R: TenantResolver<Q>,
    S: Service<TenantContext<Q>, Response = ServerSideResult<P>, Error = PageError>,
    S::Future: Send + 'static,
    P: Serialize + Send + 'static,
{
    type Response = ServerSideResult;
    type Error = PageError;
    type Future = PageFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: RequestContext<Q>) -> Self::Future {
        let Some(tenant_name) = self.resolver.resolve(&request) else {
            let host = request.host().map(str::to_owned);
            warn!(
                request_id = %request.request_id,
                host = host.as_deref().unwrap_or("<missing>"),
                "no tenant matches host header"
            );
            return Box::pin(async move { Err(PageError::TenantResolution { host }) });
        };
        debug!(request_id = %request.request_id, tenant = %tenant_name, "tenant resolved");

        let fut = self.inner.call(TenantContext {
            request,
            tenant_name,
        });
        Box::pin(async move {
            let result = fut.await?;
            let result = result.try_map_props(|props| {
                let mut props = PageProps::from_serializable(&props)?;
                props.inject(TENANT_NAME_KEY, Value::from(tenant_name.as_str()));
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
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pageprops_core::{QueryParams, TenantName};
    use serde_json::json;
    use tower::{service_fn, ServiceExt};

    use super::*;
    use crate::testing::resolver;

    fn request(host: &str) -> RequestContext {
        RequestContext::new("req-1", QueryParams::new()).with_header("Host", host)
    }

    #[tokio::test]
    async fn injects_resolved_tenant_into_props() {
        let inner = service_fn(|ctx: TenantContext| async move {
            Ok::<_, PageError>(ServerSideResult::Props(json!({ "seen": ctx.tenant_name })))
        });
        let svc = TenantLayer::new(resolver()).layer(inner);

        let result = svc.oneshot(request("b.example.com")).await.unwrap();
        let props = result.into_props().unwrap();
        assert_eq!(props.get("seen"), Some(&json!("Tenant-B")));
        assert_eq!(props.get(TENANT_NAME_KEY), Some(&json!("Tenant-B")));
    }

    #[tokio::test]
    async fn unknown_host_fails_without_calling_inner() {
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = {
            let calls = Arc::clone(&calls);
            service_fn(move |_ctx: TenantContext| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, PageError>(ServerSideResult::Props(PageProps::new())) }
            })
        };
        let svc = TenantLayer::new(resolver()).layer(inner);

        let err = svc.oneshot(request("evil.example.com")).await.unwrap_err();
        assert!(matches!(
            err,
            PageError::TenantResolution { host: Some(ref h) } if h == "evil.example.com"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_host_header_is_a_resolution_failure() {
        let inner = service_fn(|_ctx: TenantContext| async {
            Ok::<_, PageError>(ServerSideResult::Props(PageProps::new()))
        });
        let svc = TenantLayer::new(resolver()).layer(inner);

        let err = svc
            .oneshot(RequestContext::new("req-1", QueryParams::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, PageError::TenantResolution { host: None }));
    }

    #[tokio::test]
    async fn not_found_passes_through_untouched() {
        let inner = service_fn(|_ctx: TenantContext| async {
            Ok::<_, PageError>(ServerSideResult::<PageProps>::NotFound)
        });
        let svc = TenantLayer::new(resolver()).layer(inner);

        let result = svc.oneshot(request("a.example.com")).await.unwrap();
        assert_eq!(result, ServerSideResult::NotFound);
    }

    #[tokio::test]
    async fn closure_resolver_sees_the_request() {
        let resolver = |ctx: &RequestContext| ctx.param("tenant").and_then(|t| t.parse::<TenantName>().ok());
        let inner = service_fn(|_ctx: TenantContext| async {
            Ok::<_, PageError>(ServerSideResult::Props(PageProps::new()))
        });
        let svc = TenantLayer::new(resolver).layer(inner);

        let req = RequestContext::new("req-1", QueryParams::new()).with_param("tenant", "Tenant-C");
        let props = svc.oneshot(req).await.unwrap().into_props().unwrap();
        assert_eq!(props.get(TENANT_NAME_KEY), Some(&json!("Tenant-C")));
    }
}
