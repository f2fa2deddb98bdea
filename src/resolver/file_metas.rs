//! Filemetas lookup: requests a fresh `dlink` for the primary file.
//!
//! Needs the scraped `shareid`/`uk` pair plus the page's `jsToken`; the
//! endpoint rejects calls without a token that matches the page session.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::http_client::{API_TIMEOUT_SECS, build_upstream_client};
use super::{
    Contribution, FIRST_PARTY_APP_ID, ResolutionState, ResolveContext, ResolveError, Strategy,
    StrategyOutcome, first_party_post,
};

#[derive(Debug, Deserialize)]
struct FileMetasEnvelope {
    #[serde(default)]
    errno: i64,
    #[serde(default)]
    info: Vec<FileMetaInfo>,
}

#[derive(Debug, Deserialize)]
struct FileMetaInfo {
    #[serde(default)]
    dlink: Option<String>,
}

/// Posts to `/api/filemetas` asking for a download link (`dlink=1`).
pub struct FileMetasStrategy {
    client: Client,
}

impl FileMetasStrategy {
    /// # Errors
    ///
    /// Returns [`ResolveError`] if HTTP client construction fails.
    pub fn new() -> Result<Self, ResolveError> {
        let client = build_upstream_client("filemetas", API_TIMEOUT_SECS)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Strategy for FileMetasStrategy {
    fn name(&self) -> &'static str {
        "filemetas"
    }

    fn applies(&self, ctx: &ResolveContext, state: &ResolutionState) -> bool {
        state.has_files()
            && !state.has_download()
            && ctx.tokens.has_share_identity()
            && ctx.tokens.js_token.is_some()
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
        let (Some(share_id), Some(uk), Some(js_token)) = (
            ctx.tokens.share_id.as_deref(),
            ctx.tokens.uk.as_deref(),
            ctx.tokens.js_token.as_deref(),
        ) else {
            return Ok(StrategyOutcome::Empty);
        };

        let url = format!(
            "{}/api/filemetas?app_id={}&web=1&channel=dubox&clienttype=0",
            ctx.share.api_base(),
            FIRST_PARTY_APP_ID,
        );
        let form = [
            ("shareid", share_id.to_string()),
            ("uk", uk.to_string()),
            ("fs_ids", format!("[{}]", file.fs_id)),
            ("dlink", "1".to_string()),
            ("jsToken", js_token.to_string()),
        ];
        debug!(api_url = %url, fs_id = file.fs_id, "requesting file metadata");

        let response = match first_party_post(&self.client, &url, ctx)
            .form(&form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!(error = %error, "filemetas request failed");
                return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                    "filemetas request failed: {error}"
                ))));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "filemetas returned HTTP error");
            return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                "filemetas returned HTTP {status}"
            ))));
        }

        let envelope = match response.json::<FileMetasEnvelope>().await {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(error = %error, "filemetas response was not valid JSON");
                return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                    "filemetas response unreadable: {error}"
                ))));
            }
        };

        if envelope.errno != 0 {
            debug!(errno = envelope.errno, "filemetas refused the request");
            return Ok(StrategyOutcome::Failed(ResolveError::unexpected(format!(
                "filemetas refused with errno {}",
                envelope.errno
            ))));
        }

        match envelope
            .info
            .into_iter()
            .find_map(|info| info.dlink.filter(|link| !link.is_empty()))
        {
            Some(dlink) => {
                debug!("filemetas produced a download link");
                Ok(StrategyOutcome::Contributed(Contribution::download(dlink)))
            }
            None => {
                debug!("filemetas answered without a dlink");
                Ok(StrategyOutcome::Empty)
            }
        }
    }
}

impl std::fmt::Debug for FileMetasStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileMetasStrategy").finish_non_exhaustive()
    }
}
