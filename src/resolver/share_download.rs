//! Share-download lookup: signed request for a fresh `dlink`.
//!
//! Runs when the page exposed the `sign`/`timestamp` pair. The signature is
//! base64-flavoured and must be percent-encoded before it rides in the query.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::http_client::{API_TIMEOUT_SECS, build_upstream_client};
use super::{
    Contribution, FIRST_PARTY_APP_ID, ResolutionState, ResolveContext, ResolveError, Strategy,
    StrategyOutcome, first_party_get,
};

#[derive(Debug, Deserialize)]
struct ShareDownloadEnvelope {
    #[serde(default)]
    errno: i64,
    #[serde(default)]
    dlink: Option<String>,
}

/// Queries `/share/download` with the scraped signature.
pub struct ShareDownloadStrategy {
    client: Client,
}

impl ShareDownloadStrategy {
    /// # Errors
    ///
    /// Returns [`ResolveError`] if HTTP client construction fails.
    pub fn new() -> Result<Self, ResolveError> {
        let client = build_upstream_client("share-download", API_TIMEOUT_SECS)?;
        Ok(Self { client })
    }
}

/// Builds the signed download query. Shared with the constructed-url
/// fallback, which hands out the same URL without calling it.
pub(crate) fn signed_download_url(
    api_base: &str,
    share_id: &str,
    uk: &str,
    fs_id: u64,
    sign: &str,
    timestamp: &str,
) -> String {
    format!(
        "{api_base}/share/download?app_id={FIRST_PARTY_APP_ID}&web=1&channel=dubox&clienttype=0\
         &shareid={share_id}&uk={uk}&fid_list=%5B{fs_id}%5D&sign={}&timestamp={timestamp}",
        urlencoding::encode(sign),
    )
}

#[async_trait]
impl Strategy for ShareDownloadStrategy {
    fn name(&self) -> &'static str {
        "share-download"
    }

    fn applies(&self, ctx: &ResolveContext, state: &ResolutionState) -> bool {
        state.has_files()
            && !state.has_download()
            && ctx.tokens.has_share_identity()
            && ctx.tokens.has_signature()
            && state.primary_file().is_some_and(|file| file.fs_id != 0)
    }

    async fn run(
        &self,
        ctx: &ResolveContext,
        state: &ResolutionState,
    ) -> Result<StrategyOutcome, ResolveError> {
        let Some(file) = state.primary_file() else {
            return Ok(StrategyOutcome::Empty);
        };
        let (Some(share_id), Some(uk), Some(sign), Some(timestamp)) = (
            ctx.tokens.share_id.as_deref(),
            ctx.tokens.uk.as_deref(),
            ctx.tokens.sign.as_deref(),
            ctx.tokens.timestamp.as_deref(),
        ) else {
            return Ok(StrategyOutcome::Empty);
        };

        let url = signed_download_url(
            &ctx.share.api_base(),
            share_id,
            uk,
            file.fs_id,
            sign,
            timestamp,
        );
        debug!(api_url = %url, "requesting signed download link");

        let response = match first_party_get(&self.client, &url, ctx).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(error = %error, "share-download request failed");
                return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                    "share-download request failed: {error}"
                ))));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "share-download returned HTTP error");
            return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                "share-download returned HTTP {status}"
            ))));
        }

        let envelope = match response.json::<ShareDownloadEnvelope>().await {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(error = %error, "share-download response was not valid JSON");
                return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                    "share-download response unreadable: {error}"
                ))));
            }
        };

        if envelope.errno != 0 {
            debug!(errno = envelope.errno, "share-download refused the request");
            return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                "share-download refused with errno {}",
                envelope.errno
            ))));
        }

        match envelope.dlink.filter(|link| !link.is_empty()) {
            Some(dlink) => {
                debug!("share-download produced a download link");
                Ok(StrategyOutcome::Contributed(Contribution::download(dlink)))
            }
            None => {
                debug!("share-download answered without a dlink");
                Ok(StrategyOutcome::Empty)
            }
        }
    }
}

impl std::fmt::Debug for ShareDownloadStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareDownloadStrategy").finish_non_exhaustive()
    }
}
