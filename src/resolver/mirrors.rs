//! Third-party mirror strategies: the last resort when every first-party
//! route came up empty.
//!
//! Mirrors are independent resolvers with their own scraping stacks. They
//! receive only the original share URL; the caller's cookies and the scraped
//! tokens never leave this service. Each mirror answers in its own shape, so
//! the two get separate strategies rather than one parameterized client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::http_client::{MIRROR_TIMEOUT_SECS, build_upstream_client};
use super::{
    Contribution, ResolutionState, ResolveContext, ResolveError, StreamLink, Strategy,
    StrategyOutcome,
};

/// Default base of the resolution-map mirror.
const LINKMAP_MIRROR_BASE: &str = "https://linkmap.teradl.workers.dev";

/// Default base of the download-plus-variants mirror.
const FETCH_MIRROR_BASE: &str = "https://fetch.teradl.workers.dev";

/// Label preference for picking the download link out of a mirror map.
/// Lower index wins; labels outside the table rank behind all of these.
const LABEL_RANKING: [&str; 4] = ["Fast Download", "Direct Download", "HD Video", "Video"];

fn label_rank(label: &str) -> usize {
    LABEL_RANKING
        .iter()
        .position(|known| known.eq_ignore_ascii_case(label))
        .unwrap_or(LABEL_RANKING.len())
}

fn is_absolute_url(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

fn mirror_base(override_base: Option<&str>, default_base: &str) -> String {
    override_base
        .map(|base| base.trim_end_matches('/'))
        .filter(|base| !base.is_empty())
        .unwrap_or(default_base)
        .to_owned()
}

/// Splits labeled candidates into the best download link and the rest as
/// stream entries, preserving candidate order for equal ranks.
fn split_candidates(candidates: Vec<(String, String)>) -> Option<Contribution> {
    let best_index = candidates
        .iter()
        .enumerate()
        .min_by_key(|(index, (label, _))| (label_rank(label), *index))
        .map(|(index, _)| index)?;

    let mut download_url = None;
    let mut streams = Vec::new();
    for (index, (label, url)) in candidates.into_iter().enumerate() {
        if index == best_index {
            download_url = Some(url);
        } else {
            streams.push(StreamLink::new(label.clone(), label, url));
        }
    }
    Some(Contribution {
        download_url,
        streams,
        ..Contribution::default()
    })
}

/// Common gate: mirrors run only when the whole first-party leg came up dry.
fn mirror_applies(state: &ResolutionState) -> bool {
    state.has_files() && !state.has_download() && !state.has_streams()
}

// ==================== Linkmap mirror ====================

/// Mirror answering with a flat resolution map (`label -> URL`).
pub struct LinkmapMirrorStrategy {
    client: Client,
    base: String,
}

impl LinkmapMirrorStrategy {
    /// `base_override` replaces the default service base, mainly for tests
    /// and self-hosted deployments.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if HTTP client construction fails.
    pub fn new(base_override: Option<&str>) -> Result<Self, ResolveError> {
        let client = build_upstream_client("linkmap-mirror", MIRROR_TIMEOUT_SECS)?;
        Ok(Self {
            client,
            base: mirror_base(base_override, LINKMAP_MIRROR_BASE),
        })
    }
}

#[async_trait]
impl Strategy for LinkmapMirrorStrategy {
    fn name(&self) -> &'static str {
        "linkmap-mirror"
    }

    fn applies(&self, _ctx: &ResolveContext, state: &ResolutionState) -> bool {
        mirror_applies(state)
    }

    async fn run(
        &self,
        ctx: &ResolveContext,
        _state: &ResolutionState,
    ) -> Result<StrategyOutcome, ResolveError> {
        let url = format!(
            "{}/?url={}",
            self.base,
            urlencoding::encode(&ctx.original_url)
        );
        debug!(mirror_url = %url, "querying linkmap mirror");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(error = %error, "linkmap mirror request failed");
                return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                    "linkmap mirror request failed: {error}"
                ))));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "linkmap mirror returned HTTP error");
            return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                "linkmap mirror returned HTTP {status}"
            ))));
        }

        let map = match response.json::<Map<String, Value>>().await {
            Ok(map) => map,
            Err(error) => {
                warn!(error = %error, "linkmap mirror response was not a JSON object");
                return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                    "linkmap mirror response unreadable: {error}"
                ))));
            }
        };

        let candidates: Vec<(String, String)> = map
            .into_iter()
            .filter_map(|(label, value)| match value {
                Value::String(url) if is_absolute_url(&url) => Some((label, url)),
                _ => None,
            })
            .collect();

        match split_candidates(candidates) {
            Some(contribution) => {
                debug!(
                    extra_streams = contribution.streams.len(),
                    "linkmap mirror produced links"
                );
                Ok(StrategyOutcome::Contributed(contribution))
            }
            None => {
                debug!("linkmap mirror answered without usable links");
                Ok(StrategyOutcome::Empty)
            }
        }
    }
}

impl std::fmt::Debug for LinkmapMirrorStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkmapMirrorStrategy")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

// ==================== Fetch mirror ====================

#[derive(Debug, Deserialize)]
struct FetchMirrorEnvelope {
    #[serde(default, alias = "download_link", alias = "dlink")]
    download: Option<String>,
    #[serde(default, alias = "links", alias = "alternatives")]
    variants: Vec<FetchMirrorVariant>,
}

#[derive(Debug, Deserialize)]
struct FetchMirrorVariant {
    #[serde(default, alias = "resolution", alias = "name")]
    label: Option<String>,
    #[serde(default, alias = "link")]
    url: Option<String>,
}

/// Mirror answering with a single download field plus a variants list.
pub struct FetchMirrorStrategy {
    client: Client,
    base: String,
}

impl FetchMirrorStrategy {
    /// `base_override` replaces the default service base, mainly for tests
    /// and self-hosted deployments.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if HTTP client construction fails.
    pub fn new(base_override: Option<&str>) -> Result<Self, ResolveError> {
        let client = build_upstream_client("fetch-mirror", MIRROR_TIMEOUT_SECS)?;
        Ok(Self {
            client,
            base: mirror_base(base_override, FETCH_MIRROR_BASE),
        })
    }
}

#[async_trait]
impl Strategy for FetchMirrorStrategy {
    fn name(&self) -> &'static str {
        "fetch-mirror"
    }

    fn applies(&self, _ctx: &ResolveContext, state: &ResolutionState) -> bool {
        mirror_applies(state)
    }

    async fn run(
        &self,
        ctx: &ResolveContext,
        _state: &ResolutionState,
    ) -> Result<StrategyOutcome, ResolveError> {
        let url = format!(
            "{}/api?url={}",
            self.base,
            urlencoding::encode(&ctx.original_url)
        );
        debug!(mirror_url = %url, "querying fetch mirror");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(error = %error, "fetch mirror request failed");
                return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                    "fetch mirror request failed: {error}"
                ))));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "fetch mirror returned HTTP error");
            return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                "fetch mirror returned HTTP {status}"
            ))));
        }

        let envelope = match response.json::<FetchMirrorEnvelope>().await {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(error = %error, "fetch mirror response unreadable");
                return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                    "fetch mirror response unreadable: {error}"
                ))));
            }
        };

        let mut candidates: Vec<(String, String)> = Vec::new();
        if let Some(download) = envelope.download.filter(|link| is_absolute_url(link)) {
            candidates.push((LABEL_RANKING[0].to_owned(), download));
        }
        for variant in envelope.variants {
            if let (Some(label), Some(url)) = (variant.label, variant.url)
                && is_absolute_url(&url)
            {
                candidates.push((label, url));
            }
        }

        match split_candidates(candidates) {
            Some(contribution) => {
                debug!(
                    extra_streams = contribution.streams.len(),
                    "fetch mirror produced links"
                );
                Ok(StrategyOutcome::Contributed(contribution))
            }
            None => {
                debug!("fetch mirror answered without usable links");
                Ok(StrategyOutcome::Empty)
            }
        }
    }
}

impl std::fmt::Debug for FetchMirrorStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchMirrorStrategy")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}
