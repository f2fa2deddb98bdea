//! Streaming proxy: relays upstream content with browser headers so range
//! requests work from players that cannot send them cross-origin.
//!
//! Stateless: no retry, no caching, body streamed straight through.
//! Upstream failures are reported as JSON instead of being streamed, so
//! players see a clean error instead of a broken byte stream.

use axum::Json;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{
    ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ORIGIN, RANGE, REFERER,
};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::user_agent::{UPSTREAM_ORIGIN, UPSTREAM_REFERER};

use super::AppState;

/// Response headers mirrored back from upstream; everything else is dropped.
const MIRRORED_HEADERS: [axum::http::HeaderName; 4] =
    [CONTENT_TYPE, CONTENT_LENGTH, CONTENT_RANGE, ACCEPT_RANGES];

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    url: Option<String>,
}

fn proxy_error(status: StatusCode, message: &str, upstream_status: Option<u16>) -> Response {
    let mut body = serde_json::json!({"success": false, "error": message});
    if let Some(code) = upstream_status {
        body["status"] = code.into();
    }
    (status, Json(body)).into_response()
}

pub async fn handle(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
    headers: HeaderMap,
) -> Response {
    let Some(target) = params
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
    else {
        return proxy_error(StatusCode::BAD_REQUEST, "Missing url parameter", None);
    };
    debug!(target = %target, ranged = headers.contains_key(RANGE), "proxying upstream content");

    let mut request = state
        .proxy_client
        .get(target)
        .header(REFERER, UPSTREAM_REFERER)
        .header(ORIGIN, UPSTREAM_ORIGIN);
    if let Some(range) = headers.get(RANGE) {
        request = request.header(RANGE, range.clone());
    }

    let upstream = match request.send().await {
        Ok(upstream) => upstream,
        Err(error) if error.is_timeout() => {
            warn!(error = %error, "proxy upstream timed out");
            return proxy_error(StatusCode::GATEWAY_TIMEOUT, "Upstream fetch timed out", None);
        }
        Err(error) => {
            warn!(error = %error, "proxy upstream request failed");
            return proxy_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Proxy error: {error}"),
                None,
            );
        }
    };

    let status = upstream.status();
    if !status.is_success() {
        debug!(status = status.as_u16(), "proxy upstream refused the request");
        return proxy_error(status, "Failed to fetch content", Some(status.as_u16()));
    }

    let mut response_headers = HeaderMap::new();
    for name in MIRRORED_HEADERS {
        if let Some(value) = upstream.headers().get(&name) {
            response_headers.insert(name, value.clone());
        }
    }

    (status, response_headers, Body::from_stream(upstream.bytes_stream())).into_response()
}
