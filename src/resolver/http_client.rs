//! Shared HTTP client construction policy for upstream calls.
//!
//! Every outbound surface (share page, first-party APIs, streaming probes,
//! mirrors, proxy relay) builds its client here so they stay consistent on
//! connect timeout, user-agent, compression, redirect ceiling, and proxy
//! compatibility. Only the overall request budget differs per purpose.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use crate::user_agent::BROWSER_USER_AGENT;

use super::ResolveError;

/// Connection establishment budget shared by every upstream client.
pub(crate) const CONNECT_TIMEOUT_SECS: u64 = 10;
/// Share-page fetch budget.
pub(crate) const PAGE_TIMEOUT_SECS: u64 = 30;
/// First-party listing/link API budget.
pub(crate) const API_TIMEOUT_SECS: u64 = 15;
/// Per-tag streaming probe budget.
pub(crate) const STREAM_PROBE_TIMEOUT_SECS: u64 = 10;
/// Third-party mirror budget.
pub(crate) const MIRROR_TIMEOUT_SECS: u64 = 20;
/// Proxy relay budget.
pub(crate) const PROXY_TIMEOUT_SECS: u64 = 60;

/// Redirect ceiling the upstream share flow is known to stay within.
const MAX_REDIRECT_HOPS: usize = 5;

/// Builds an upstream HTTP client with the shared policy and the given
/// overall request budget.
///
/// `purpose` is used only for error messages and logging, never in headers.
///
/// # Errors
///
/// Returns [`ResolveError`] when client construction fails.
pub(crate) fn build_upstream_client(
    purpose: &str,
    request_timeout_secs: u64,
) -> Result<Client, ResolveError> {
    match try_build_client(request_timeout_secs, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some restricted sandbox environments panic inside the system
            // proxy lookup. The fallback keeps env-var proxy support while
            // bypassing the system lookup so startup stays panic-free.
            warn!(
                purpose,
                "upstream client hit system proxy panic; using env-proxy fallback builder"
            );
            match try_build_client(request_timeout_secs, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(ResolveError::unexpected(format!(
                    "HTTP client construction panicked while initializing {purpose} networking"
                ))),
                Err(BuildClientFailure::Build(error)) => Err(ResolveError::unexpected(format!(
                    "HTTP client construction failed for {purpose}: {error}"
                ))),
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(ResolveError::unexpected(format!(
            "HTTP client construction failed for {purpose}: {error}"
        ))),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    request_timeout_secs: u64,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(request_timeout_secs);
        if disable_system_proxy_lookup {
            builder = restore_env_proxies(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(request_timeout_secs: u64) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(request_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECT_HOPS))
        .user_agent(BROWSER_USER_AGENT)
        .gzip(true)
}

/// `no_proxy()` also drops env-var proxies; re-add them explicitly.
fn restore_env_proxies(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = proxy_from_env(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = proxy_from_env(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn proxy_from_env(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
