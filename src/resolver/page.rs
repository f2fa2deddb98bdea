//! The one mandatory upstream call: fetching the share page HTML.

use reqwest::{Client, header};
use tracing::{debug, warn};

use crate::auth::SessionCredentials;
use crate::parser::ShareReference;

use super::ResolveError;
use super::http_client::{PAGE_TIMEOUT_SECS, build_upstream_client};

/// Fetches share pages with the browser profile the host expects.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// # Errors
    ///
    /// Returns [`ResolveError`] if HTTP client construction fails.
    pub fn new() -> Result<Self, ResolveError> {
        let client = build_upstream_client("share-page", PAGE_TIMEOUT_SECS)?;
        Ok(Self { client })
    }

    /// Fetches the share page and returns the body.
    ///
    /// Non-2xx statuses are not errors here: the body is still returned for
    /// scanning, since templates embed tokens and listing markers even on
    /// error pages. A timeout or transport failure on this call is fatal for
    /// the whole request.
    ///
    /// # Errors
    ///
    /// [`ResolveError::Timeout`] when the fetch exceeds its budget,
    /// [`ResolveError::PageFetch`] for any other transport failure.
    #[tracing::instrument(skip(self, credentials), fields(share = %share.short_code))]
    pub async fn fetch(
        &self,
        share: &ShareReference,
        credentials: &SessionCredentials,
    ) -> Result<String, ResolveError> {
        let url = share.share_page_url();
        let mut request = self
            .client
            .get(&url)
            .header(header::REFERER, format!("{}/", share.api_base()));
        if let Some(cookie) = credentials.cookie_header() {
            request = request.header(header::COOKIE, cookie);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(error) if error.is_timeout() => {
                warn!(error = %error, "share page fetch timed out");
                return Err(ResolveError::timeout("share page fetch"));
            }
            Err(error) => {
                warn!(error = %error, "share page fetch failed");
                return Err(ResolveError::page_fetch(error.to_string()));
            }
        };

        let status = response.status();
        match response.text().await {
            Ok(body) => {
                debug!(
                    status = status.as_u16(),
                    body_len = body.len(),
                    "share page fetched"
                );
                Ok(body)
            }
            Err(error) if error.is_timeout() => Err(ResolveError::timeout("share page read")),
            Err(error) => Err(ResolveError::page_fetch(error.to_string())),
        }
    }
}

impl std::fmt::Debug for PageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher").finish_non_exhaustive()
    }
}
