//! HTTP surface: shared state, router assembly, liveness probe.

pub mod error;
mod proxy;
mod resolve;
mod response;

pub use error::ApiError;
pub use resolve::ResolveRequest;
pub use response::{
    PlayerLinks, ResolveResponse, format_size, player_links, resolve_response,
};

use std::sync::Arc;

use axum::http::{Method, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::resolver::{
    PROXY_TIMEOUT_SECS, PageFetcher, ResolveError, StrategyPipeline, build_default_strategy_chain,
    build_upstream_client,
};

/// Shared per-process state. Built once at startup; cloning is cheap since
/// every field is reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub(crate) pipeline: Arc<StrategyPipeline>,
    pub(crate) page_fetcher: Arc<PageFetcher>,
    pub(crate) proxy_client: reqwest::Client,
}

impl AppState {
    /// # Errors
    ///
    /// Returns [`ResolveError`] if the page-fetch or proxy HTTP client
    /// cannot be constructed.
    pub fn new(
        linkmap_mirror: Option<&str>,
        fetch_mirror: Option<&str>,
    ) -> Result<Self, ResolveError> {
        let pipeline = build_default_strategy_chain(linkmap_mirror, fetch_mirror);
        let page_fetcher = PageFetcher::new()?;
        let proxy_client = build_upstream_client("proxy", PROXY_TIMEOUT_SECS)?;
        Ok(Self {
            pipeline: Arc::new(pipeline),
            page_fetcher: Arc::new(page_fetcher),
            proxy_client,
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

/// Assembles the service router.
///
/// CORS is per-route: the resolve endpoint accepts browser POSTs from any
/// origin, the proxy additionally allows the `Range` request header so
/// players can seek.
pub fn build_router(state: AppState) -> Router {
    let resolve_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);
    let proxy_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::RANGE]);

    let resolve_routes = Router::new()
        .route("/api", post(resolve::handle).fallback(method_not_allowed))
        .layer(resolve_cors);
    let proxy_routes = Router::new()
        .route("/api/proxy", get(proxy::handle).fallback(method_not_allowed))
        .layer(proxy_cors);

    Router::new()
        .merge(resolve_routes)
        .merge(proxy_routes)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe; answers without touching any upstream.
async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// JSON 405 for wrong methods on known paths, matching the error contract.
async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}
