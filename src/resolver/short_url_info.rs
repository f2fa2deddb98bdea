//! Short-url info lookup: the authoritative first-party listing source.
//!
//! This endpoint is the only one whose error envelope is trusted as a
//! verdict on the share itself. A non-zero `errno` here means the share is
//! expired, deleted, or otherwise gone, so the chain aborts instead of
//! burning further upstream calls on a dead link.

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

/// Envelope code meaning success.
const ERRNO_OK: i64 = 0;

#[derive(Debug, Deserialize)]
struct ShortUrlInfoEnvelope {
    #[serde(default)]
    errno: i64,
    #[serde(default)]
    list: Vec<RemoteFileEntry>,
    #[serde(default, alias = "show_msg", alias = "errmsg")]
    err_msg: Option<String>,
}

/// Maps documented envelope codes to stable human-readable reasons.
///
/// Codes outside the table fall back to whatever message the server sent,
/// then to a generic one.
fn upstream_reason(errno: i64, server_message: Option<&str>) -> String {
    match errno {
        2 => "Invalid request parameters".to_owned(),
        -7 => "Share link has expired".to_owned(),
        -9 => "Share not found".to_owned(),
        105 => "Share page does not exist".to_owned(),
        110 => "Share link is no longer valid".to_owned(),
        115 => "Share has been deleted".to_owned(),
        _ => server_message
            .filter(|message| !message.is_empty())
            .map_or_else(|| format!("Upstream error {errno}"), ToOwned::to_owned),
    }
}

/// Queries `/api/shorturlinfo` for the share's file listing.
pub struct ShortUrlInfoStrategy {
    client: Client,
}

impl ShortUrlInfoStrategy {
    /// # Errors
    ///
    /// Returns [`ResolveError`] if HTTP client construction fails.
    pub fn new() -> Result<Self, ResolveError> {
        let client = build_upstream_client("short-url-info", API_TIMEOUT_SECS)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Strategy for ShortUrlInfoStrategy {
    fn name(&self) -> &'static str {
        "short-url-info"
    }

    fn applies(&self, _ctx: &ResolveContext, state: &ResolutionState) -> bool {
        !state.has_files()
    }

    async fn run(
        &self,
        ctx: &ResolveContext,
        _state: &ResolutionState,
    ) -> Result<StrategyOutcome, ResolveError> {
        let url = format!(
            "{}/api/shorturlinfo?app_id={}&web=1&channel=dubox&clienttype=0&shorturl={}&root=1",
            ctx.share.api_base(),
            FIRST_PARTY_APP_ID,
            urlencoding::encode(&ctx.share.short_code),
        );
        debug!(api_url = %url, "querying short-url info");

        let response = match first_party_get(&self.client, &url, ctx).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(error = %error, "short-url info request failed");
                return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                    "short-url info request failed: {error}"
                ))));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "short-url info returned HTTP error");
            return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                "short-url info returned HTTP {status}"
            ))));
        }

        let envelope = match response.json::<ShortUrlInfoEnvelope>().await {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(error = %error, "short-url info response was not valid JSON");
                return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                    "short-url info response unreadable: {error}"
                ))));
            }
        };

        if envelope.errno != ERRNO_OK {
            let reason = upstream_reason(envelope.errno, envelope.err_msg.as_deref());
            warn!(errno = envelope.errno, reason = %reason, "share rejected by upstream");
            return Err(ResolveError::upstream(envelope.errno, reason));
        }

        let files: Vec<FileRecord> = envelope.list.into_iter().map(FileRecord::from).collect();
        if files.is_empty() {
            debug!("short-url info succeeded but listed no files");
            return Ok(StrategyOutcome::Empty);
        }

        debug!(file_count = files.len(), "short-url info produced a listing");
        Ok(StrategyOutcome::Contributed(Contribution::files(files)))
    }
}

impl std::fmt::Debug for ShortUrlInfoStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortUrlInfoStrategy").finish_non_exhaustive()
    }
}
