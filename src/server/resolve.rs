//! Resolve endpoint handler: share URL in, link menu out.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::auth::normalize_cookies;
use crate::extract::{extract_listing, extract_tokens};
use crate::parser::parse_share_url;
use crate::resolver::ResolveContext;

use super::AppState;
use super::error::ApiError;
use super::response::{ResolveResponse, resolve_response};

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub url: String,
    /// Raw cookie material: a header string or a browser-extension jar
    /// export. Normalized before use.
    #[serde(default)]
    pub cookies: Option<Value>,
}

pub async fn handle(
    State(state): State<AppState>,
    Json(payload): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let original_url = payload.url.trim().to_owned();
    let share = parse_share_url(&original_url)?;
    let credentials = normalize_cookies(payload.cookies.as_ref());
    info!(
        short_code = %share.short_code,
        host = %share.host,
        anonymous = credentials.is_anonymous(),
        "resolving share link"
    );

    let html = state.page_fetcher.fetch(&share, &credentials).await?;
    let tokens = extract_tokens(&html);
    let page_listing = extract_listing(&html);

    let ctx = ResolveContext {
        share,
        credentials,
        tokens,
        page_listing,
        original_url,
    };
    let resolution = state.pipeline.resolve(&ctx).await?;

    let Some(response) = resolve_response(&resolution) else {
        return Err(ApiError::internal(
            "resolution finished without file metadata",
        ));
    };
    info!(
        download = response.download.available,
        streams = response.streaming.links.len(),
        "share link resolved"
    );
    Ok(Json(response))
}
