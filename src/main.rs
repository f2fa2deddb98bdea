//! HTTP server entry point for the share-link resolver.

use anyhow::{Context, Result};
use sharebox_core::config::Config;
use sharebox_core::server::{AppState, build_router};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Priority: RUST_LOG env var > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    info!(
        linkmap_mirror = config.linkmap_mirror.is_some(),
        fetch_mirror = config.fetch_mirror.is_some(),
        "Share link resolver starting"
    );

    let state = AppState::new(
        config.linkmap_mirror.as_deref(),
        config.fetch_mirror.as_deref(),
    )
    .context("failed to initialize HTTP clients")?;

    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Listening");

    axum::serve(listener, app)
        .await
        .context("server terminated unexpectedly")?;

    Ok(())
}
