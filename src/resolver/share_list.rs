//! Share-list lookup: second-chance listing source using scraped identifiers.
//!
//! Runs only when the page yielded a `shareid`/`uk` pair but neither the
//! inline listing nor the short-url info call produced files. Unlike the
//! short-url info envelope, a non-zero `errno` here is not a verdict on the
//! share; it usually just means this endpoint wants cookies we do not have,
//! so failures stay soft.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::extract::{FileRecord, RemoteFileEntry};

use super::http_client::{API_TIMEOUT_SECS, build_upstream_client};
use super::{
    Contribution, FIRST_PARTY_APP_ID, ResolutionState, ResolveContext, ResolveError, Strategy,
    StrategyOutcome, first_party_get,
};

/// Page size for the single listing page requested.
const LISTING_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct ShareListEnvelope {
    #[serde(default)]
    errno: i64,
    #[serde(default)]
    list: Vec<RemoteFileEntry>,
}

/// Queries `/share/list` with the scraped `shareid`/`uk` pair.
pub struct ShareListStrategy {
    client: Client,
}

impl ShareListStrategy {
    /// # Errors
    ///
    /// Returns [`ResolveError`] if HTTP client construction fails.
    pub fn new() -> Result<Self, ResolveError> {
        let client = build_upstream_client("share-list", API_TIMEOUT_SECS)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Strategy for ShareListStrategy {
    fn name(&self) -> &'static str {
        "share-list"
    }

    fn applies(&self, ctx: &ResolveContext, state: &ResolutionState) -> bool {
        !state.has_files() && ctx.tokens.has_share_identity()
    }

    async fn run(
        &self,
        ctx: &ResolveContext,
        _state: &ResolutionState,
    ) -> Result<StrategyOutcome, ResolveError> {
        let (Some(share_id), Some(uk)) = (ctx.tokens.share_id.as_deref(), ctx.tokens.uk.as_deref())
        else {
            return Ok(StrategyOutcome::Empty);
        };

        let url = format!(
            "{}/share/list?app_id={}&web=1&channel=dubox&clienttype=0&shareid={share_id}&uk={uk}&root=1&page=1&num={LISTING_PAGE_SIZE}",
            ctx.share.api_base(),
            FIRST_PARTY_APP_ID,
        );
        debug!(api_url = %url, "querying share list");

        let response = match first_party_get(&self.client, &url, ctx).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(error = %error, "share-list request failed");
                return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                    "share-list request failed: {error}"
                ))));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "share-list returned HTTP error");
            return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                "share-list returned HTTP {status}"
            ))));
        }

        let envelope = match response.json::<ShareListEnvelope>().await {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(error = %error, "share-list response was not valid JSON");
                return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                    "share-list response unreadable: {error}"
                ))));
            }
        };

        if envelope.errno != 0 {
            debug!(errno = envelope.errno, "share-list refused the request");
            return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                "share-list refused with errno {}",
                envelope.errno
            ))));
        }

        let files: Vec<FileRecord> = envelope.list.into_iter().map(FileRecord::from).collect();
        if files.is_empty() {
            debug!("share-list succeeded but listed no files");
            return Ok(StrategyOutcome::Empty);
        }

        debug!(file_count = files.len(), "share-list produced a listing");
        Ok(StrategyOutcome::Contributed(Contribution::files(files)))
    }
}

impl std::fmt::Debug for ShareListStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareListStrategy").finish_non_exhaustive()
    }
}
