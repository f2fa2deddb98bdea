//! Share-link resolution pipeline: ordered fallback strategies that turn a
//! parsed share reference into download and streaming links.
//!
//! # Architecture
//!
//! - [`Strategy`] - async trait that individual strategies implement
//! - [`StrategyPipeline`] - ordered chain with the resolution loop
//! - [`StrategyOutcome`] - tri-state result of one strategy run
//! - [`ResolutionState`] - per-request accumulator, merged first-success-wins
//! - [`PageFetcher`] - the one upstream call made before the chain runs
//!
//! Strategy set, in chain order: [`InlineListingStrategy`],
//! [`ShortUrlInfoStrategy`], [`ShareListStrategy`] (listing sources);
//! [`FileMetasStrategy`], [`ShareDownloadStrategy`], [`EmbeddedDlinkStrategy`],
//! [`ConstructedUrlStrategy`] (download link); [`StreamingStrategy`]
//! (per-quality menu); [`LinkmapMirrorStrategy`], [`FetchMirrorStrategy`]
//! (third-party last resort).
//!
//! Order is load-bearing: a strategy only runs while the fields it produces
//! are still missing, and a field set once is never overwritten; later
//! strategies may only supplement (append stream entries).
//!
//! # Example
//!
//! ```no_run
//! use sharebox_core::auth::SessionCredentials;
//! use sharebox_core::extract::ExtractedTokens;
//! use sharebox_core::parser::parse_share_url;
//! use sharebox_core::resolver::{build_default_strategy_chain, ResolveContext};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = build_default_strategy_chain(None, None);
//!
//! let ctx = ResolveContext {
//!     share: parse_share_url("https://terabox.com/s/1AbCdEf")?,
//!     credentials: SessionCredentials::anonymous(),
//!     tokens: ExtractedTokens::default(),
//!     page_listing: Vec::new(),
//!     original_url: "https://terabox.com/s/1AbCdEf".to_string(),
//! };
//! let resolution = pipeline.resolve(&ctx).await?;
//! println!("download: {:?}", resolution.download_url);
//! # Ok(())
//! # }
//! ```

mod embedded;
mod error;
mod file_metas;
mod http_client;
mod mirrors;
mod page;
mod pipeline;
mod share_download;
mod share_list;
mod short_url_info;
mod streaming;

pub use embedded::{ConstructedUrlStrategy, EmbeddedDlinkStrategy, InlineListingStrategy};
pub use error::ResolveError;
pub use file_metas::FileMetasStrategy;
pub use mirrors::{FetchMirrorStrategy, LinkmapMirrorStrategy};
pub use page::PageFetcher;
pub use pipeline::StrategyPipeline;
pub use share_download::ShareDownloadStrategy;
pub use share_list::ShareListStrategy;
pub use short_url_info::ShortUrlInfoStrategy;
pub use streaming::StreamingStrategy;

pub(crate) use http_client::{PROXY_TIMEOUT_SECS, build_upstream_client};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, header};
use tracing::warn;

use crate::auth::SessionCredentials;
use crate::extract::{ExtractedTokens, FileRecord, primary_file};
use crate::parser::ShareReference;

/// App id the first-party endpoints expect on every call.
pub(crate) const FIRST_PARTY_APP_ID: &str = "250528";

/// Builds the default strategy chain used by the HTTP server.
///
/// Order is deterministic: listing sources, then download-link resolution,
/// then the streaming menu, then third-party mirrors. A strategy whose HTTP
/// client cannot be constructed is skipped with a warning rather than
/// failing startup.
#[must_use]
pub fn build_default_strategy_chain(
    linkmap_mirror: Option<&str>,
    fetch_mirror: Option<&str>,
) -> StrategyPipeline {
    let mut pipeline = StrategyPipeline::new();

    pipeline.register(Box::new(InlineListingStrategy::new()));

    match ShortUrlInfoStrategy::new() {
        Ok(strategy) => pipeline.register(Box::new(strategy)),
        Err(error) => warn!(
            error = %error,
            "short-url info strategy unavailable; continuing without it"
        ),
    }

    match ShareListStrategy::new() {
        Ok(strategy) => pipeline.register(Box::new(strategy)),
        Err(error) => warn!(
            error = %error,
            "share-list strategy unavailable; continuing without it"
        ),
    }

    match FileMetasStrategy::new() {
        Ok(strategy) => pipeline.register(Box::new(strategy)),
        Err(error) => warn!(
            error = %error,
            "filemetas strategy unavailable; continuing without it"
        ),
    }

    match ShareDownloadStrategy::new() {
        Ok(strategy) => pipeline.register(Box::new(strategy)),
        Err(error) => warn!(
            error = %error,
            "share-download strategy unavailable; continuing without it"
        ),
    }

    pipeline.register(Box::new(EmbeddedDlinkStrategy::new()));
    pipeline.register(Box::new(ConstructedUrlStrategy::new()));

    match StreamingStrategy::new() {
        Ok(strategy) => pipeline.register(Box::new(strategy)),
        Err(error) => warn!(
            error = %error,
            "streaming strategy unavailable; continuing without it"
        ),
    }

    match LinkmapMirrorStrategy::new(linkmap_mirror) {
        Ok(strategy) => pipeline.register(Box::new(strategy)),
        Err(error) => warn!(
            error = %error,
            "linkmap mirror unavailable; continuing without it"
        ),
    }

    match FetchMirrorStrategy::new(fetch_mirror) {
        Ok(strategy) => pipeline.register(Box::new(strategy)),
        Err(error) => warn!(
            error = %error,
            "fetch mirror unavailable; continuing without it"
        ),
    }

    pipeline
}

// ==================== Request context ====================

/// Context for one resolution request. Built once by the handler after the
/// page fetch; immutable for the lifetime of the pipeline run.
#[derive(Debug)]
pub struct ResolveContext {
    pub share: ShareReference,
    pub credentials: SessionCredentials,
    pub tokens: ExtractedTokens,
    /// Listing scraped from the page itself, possibly empty.
    pub page_listing: Vec<FileRecord>,
    /// The share URL exactly as the caller sent it; mirrors receive this
    /// verbatim instead of the canonicalized form.
    pub original_url: String,
}

/// Starts a first-party GET carrying the share-page referer and the caller's
/// cookie header.
pub(crate) fn first_party_get(client: &Client, url: &str, ctx: &ResolveContext) -> RequestBuilder {
    apply_first_party_headers(client.get(url), ctx)
}

/// Starts a first-party POST with the same header policy as [`first_party_get`].
pub(crate) fn first_party_post(client: &Client, url: &str, ctx: &ResolveContext) -> RequestBuilder {
    apply_first_party_headers(client.post(url), ctx)
}

fn apply_first_party_headers(request: RequestBuilder, ctx: &ResolveContext) -> RequestBuilder {
    let request = request.header(header::REFERER, ctx.share.share_page_url());
    match ctx.credentials.cookie_header() {
        Some(cookie) => request.header(header::COOKIE, cookie),
        None => request,
    }
}

// ==================== Strategy outcomes ====================

/// One streaming quality candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLink {
    /// Human-readable label ("720p").
    pub resolution: String,
    /// Raw upstream quality tag ("`M3U8_AUTO_720`").
    pub tag: String,
    pub url: String,
}

impl StreamLink {
    #[must_use]
    pub fn new(
        resolution: impl Into<String>,
        tag: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            resolution: resolution.into(),
            tag: tag.into(),
            url: url.into(),
        }
    }
}

/// What one strategy run added to the resolution.
#[derive(Debug, Clone, Default)]
pub struct Contribution {
    pub files: Vec<FileRecord>,
    pub download_url: Option<String>,
    pub streams: Vec<StreamLink>,
}

impl Contribution {
    /// A contribution carrying only a file listing.
    #[must_use]
    pub fn files(files: Vec<FileRecord>) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    /// A contribution carrying only a download link.
    #[must_use]
    pub fn download(url: impl Into<String>) -> Self {
        Self {
            download_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// A contribution carrying only stream candidates.
    #[must_use]
    pub fn streams(streams: Vec<StreamLink>) -> Self {
        Self {
            streams,
            ..Self::default()
        }
    }
}

/// Result of a single strategy run.
#[derive(Debug, Clone)]
pub enum StrategyOutcome {
    /// The strategy produced at least one field.
    Contributed(Contribution),
    /// Ran cleanly but found nothing.
    Empty,
    /// Network, timeout, or format failure; logged and skipped.
    Failed(ResolveError),
}

/// Per-request accumulator. Fields merge first-success-wins; stream entries
/// append in arrival order, so the first successful stream stays primary.
#[derive(Debug, Default)]
pub struct ResolutionState {
    files: Vec<FileRecord>,
    download_url: Option<String>,
    streams: Vec<StreamLink>,
}

impl ResolutionState {
    #[must_use]
    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    #[must_use]
    pub fn has_download(&self) -> bool {
        self.download_url.is_some()
    }

    #[must_use]
    pub fn has_streams(&self) -> bool {
        !self.streams.is_empty()
    }

    #[must_use]
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// The file download/streaming strategies act on.
    #[must_use]
    pub fn primary_file(&self) -> Option<&FileRecord> {
        primary_file(&self.files)
    }

    pub(crate) fn absorb(&mut self, contribution: Contribution) {
        if self.files.is_empty() && !contribution.files.is_empty() {
            self.files = contribution.files;
        }
        if self.download_url.is_none() {
            self.download_url = contribution.download_url;
        }
        self.streams.extend(contribution.streams);
    }

    pub(crate) fn into_resolution(self) -> Resolution {
        Resolution {
            files: self.files,
            download_url: self.download_url,
            streams: self.streams,
        }
    }
}

/// Terminal pipeline output.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub files: Vec<FileRecord>,
    pub download_url: Option<String>,
    /// Ordered menu; the first entry is the canonical primary stream.
    pub streams: Vec<StreamLink>,
}

impl Resolution {
    #[must_use]
    pub fn primary_file(&self) -> Option<&FileRecord> {
        primary_file(&self.files)
    }
}

// ==================== Strategy trait ====================

/// Trait that all resolution strategies implement.
///
/// # Object Safety
///
/// Uses `async_trait` so the pipeline can hold `Box<dyn Strategy>`; Rust 2024
/// native async traits are not object-safe.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Short name for logs (e.g. "short-url-info", "linkmap-mirror").
    fn name(&self) -> &'static str;

    /// True when the strategy's inputs are available and the fields it
    /// produces are still missing.
    fn applies(&self, ctx: &ResolveContext, state: &ResolutionState) -> bool;

    /// Runs the strategy once.
    ///
    /// # Errors
    ///
    /// `Err` is reserved for definitive upstream rejections that must stop
    /// the whole chain; recoverable problems are `Ok(StrategyOutcome::Failed)`.
    async fn run(
        &self,
        ctx: &ResolveContext,
        state: &ResolutionState,
    ) -> Result<StrategyOutcome, ResolveError>;
}

// ==================== Test helpers ====================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn context_for_tests(base_url: &str) -> ResolveContext {
    let share_url = format!("{base_url}/s/1TestCode");
    ResolveContext {
        share: crate::parser::parse_share_url(&share_url).unwrap(),
        credentials: SessionCredentials::anonymous(),
        tokens: ExtractedTokens::default(),
        page_listing: Vec::new(),
        original_url: share_url,
    }
}

#[cfg(test)]
pub(crate) fn file_for_tests(name: &str, category: crate::extract::FileCategory) -> FileRecord {
    FileRecord {
        fs_id: 424_242,
        name: name.to_string(),
        size_bytes: 1_048_576,
        category,
        is_directory: false,
        dlink: None,
        md5: None,
        thumbnail: None,
    }
}
