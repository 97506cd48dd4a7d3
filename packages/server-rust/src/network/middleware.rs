//! HTTP middleware stack for the page server.
//!
//! The first layer listed is the outermost: it sees the request first and
//! the response last.

use axum::http::header::HeaderName;
use axum::http::{Method, StatusCode};
use tower::layer::util::{Identity, Stack};
use tower::ServiceBuilder;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;

/// Header carrying the request id; also becomes `RequestContext::request_id`.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub type HttpLayers = Stack<
    PropagateRequestIdLayer,
    Stack<
        TimeoutLayer,
        Stack<
            CorsLayer,
            Stack<
                TraceLayer<SharedClassifier<ServerErrorsAsFailures>>,
                Stack<SetRequestIdLayer<MakeRequestUuid>, Identity>,
            >,
        >,
    >,
>;

/// Builds the HTTP-level middleware from the network configuration.
///
/// **Ordering (outermost to innermost):**
/// 1. `SetRequestId` -- assigns `x-request-id` unless the caller sent one
/// 2. `Tracing` -- request/response spans
/// 3. `CORS` -- page data is fetched cross-origin by the client app
/// 4. `Timeout` -- 408 once `request_timeout` elapses; page pipelines are not
///    otherwise cancelled
/// 5. `PropagateRequestId` -- echoes `x-request-id` on the response
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors_origins))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(request_id))
        .into_inner()
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| o.parse().ok()))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET])
        .allow_headers(Any)
}
