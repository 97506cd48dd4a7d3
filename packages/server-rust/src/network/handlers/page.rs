//! Page data endpoint: runs a page pipeline for an HTTP request.
//!
//! Stands in for the hosting framework: it builds the `RequestContext`,
//! invokes the pipeline, and maps the `ServerSideResult` onto HTTP.

use std::collections::HashMap;

use axum::extract::{Path, Query};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use pageprops_core::{PageProps, QueryParams, RequestContext, ServerSideResult};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use crate::network::middleware::REQUEST_ID_HEADER;
use crate::service::PageService;

/// Runs `page` for one request and renders the outcome.
pub async fn page_handler(
    page: PageService,
    params: Option<Path<HashMap<String, String>>>,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let params = params.map(|Path(p)| p).unwrap_or_default();
    let ctx = request_context(&headers, params, pairs);
    match page.oneshot(ctx).await {
        Ok(result) => render_result(result),
        Err(err) => err.into_response(),
    }
}

/// Builds the pipeline's input from HTTP request parts.
///
/// Repeated headers are joined with `", "`, repeated query keys keep every
/// value. The request id comes from `x-request-id`, or is generated.
#[must_use]
pub fn request_context(
    headers: &HeaderMap,
    params: HashMap<String, String>,
    pairs: Vec<(String, String)>,
) -> RequestContext {
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);

    let mut query = QueryParams::new();
    for (key, value) in pairs {
        query.entry(key).or_default().push(value);
    }

    let mut ctx = RequestContext::new(request_id, query);
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        ctx.headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    ctx.params = params.into_iter().collect();
    ctx
}

/// Maps a pipeline outcome onto an HTTP response.
///
/// - `Props` -> 200 `{"pageProps": ...}`
/// - `Redirect` -> 308 (permanent) or 307 with `Location`
/// - `NotFound` -> 404 `{"notFound": true}`
#[must_use]
pub fn render_result(result: ServerSideResult) -> Response {
    match result {
        ServerSideResult::Props(props) => {
            (StatusCode::OK, Json(json!({ "pageProps": props }))).into_response()
        }
        ServerSideResult::Redirect(redirect) => {
            let status = if redirect.permanent {
                StatusCode::PERMANENT_REDIRECT
            } else {
                StatusCode::TEMPORARY_REDIRECT
            };
            let location = redirect.destination.clone();
            (
                status,
                [(header::LOCATION, location)],
                Json(ServerSideResult::<PageProps>::Redirect(redirect)),
            )
                .into_response()
        }
        ServerSideResult::NotFound => (
            StatusCode::NOT_FOUND,
            Json(ServerSideResult::<PageProps>::NotFound),
        )
            .into_response(),
    }
}
