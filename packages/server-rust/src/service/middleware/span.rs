//! Per-page instrumentation.
//!
//! Wraps a page pipeline in a `tracing` span and records load duration and
//! outcome through the `metrics` facade. No recorder is installed here; the
//! counters are no-ops until the binary installs one.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use pageprops_core::{RequestContext, ServerSideResult};
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use super::PageFuture;
use crate::error::PageError;

// ---------------------------------------------------------------------------
// PageSpanLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments one page's data loading.
#[derive(Debug, Clone)]
pub struct PageSpanLayer {
    page: Arc<str>,
}

impl PageSpanLayer {
    #[must_use]
    pub fn new(page: &str) -> Self {
        Self { page: page.into() }
    }
}

impl<S> Layer<S> for PageSpanLayer {
    type Service = PageSpanService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PageSpanService {
            inner,
            page: Arc::clone(&self.page),
        }
    }
}

// ---------------------------------------------------------------------------
// PageSpanService
// ---------------------------------------------------------------------------

/// Service wrapper that records duration and outcome of each page load.
#[derive(Debug, Clone)]
pub struct PageSpanService<S> {
    inner: S,
    page: Arc<str>,
}

impl<Q, S> Service<RequestContext<Q>> for PageSpanService<S>
where
    S: Service<RequestContext<Q>, Response = ServerSideResult, Error = PageError>,
    S::Future: Send + 'static,
{
    type Response = ServerSideResult;
    type Error = PageError;
    type Future = PageFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: RequestContext<Q>) -> Self::Future {
        let page = Arc::clone(&self.page);
        let span = info_span!(
            "page",
            page = %page,
            request_id = %request.request_id,
            host = request.host().unwrap_or(""),
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        // Tenant resolution runs inside `call`, so enter the span for it.
        let fut = {
            let _entered = span.enter();
            self.inner.call(request)
        };

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();

                let outcome = match &result {
                    Ok(result) => result.outcome(),
                    Err(_) => "error",
                };

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = elapsed.as_millis() as u64;
                let current = tracing::Span::current();
                current.record("duration_ms", duration_ms);
                current.record("outcome", outcome);

                metrics::counter!(
                    "page_loads_total",
                    "page" => page.to_string(),
                    "outcome" => outcome
                )
                .increment(1);
                metrics::histogram!("page_load_duration_seconds", "page" => page.to_string())
                    .record(elapsed.as_secs_f64());

                match &result {
                    Ok(_) => tracing::info!(duration_ms, outcome, "page data loaded"),
                    Err(err) => tracing::warn!(
                        duration_ms,
                        error_kind = err.kind(),
                        error = %err,
                        "page data failed"
                    ),
                }

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
