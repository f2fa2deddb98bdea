//! No-network strategies that reuse data already scraped from the page.
//!
//! [`InlineListingStrategy`] opens the chain with the page's own listing;
//! [`EmbeddedDlinkStrategy`] and [`ConstructedUrlStrategy`] close the
//! download leg without another round trip.

use async_trait::async_trait;
use tracing::debug;

use super::share_download::signed_download_url;
use super::{
    Contribution, ResolutionState, ResolveContext, ResolveError, Strategy, StrategyOutcome,
};

/// Adopts the listing scraped from the share page, when there is one.
#[derive(Debug, Default)]
pub struct InlineListingStrategy;

impl InlineListingStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Strategy for InlineListingStrategy {
    fn name(&self) -> &'static str {
        "inline-listing"
    }

    fn applies(&self, ctx: &ResolveContext, state: &ResolutionState) -> bool {
        !state.has_files() && !ctx.page_listing.is_empty()
    }

    async fn run(
        &self,
        ctx: &ResolveContext,
        _state: &ResolutionState,
    ) -> Result<StrategyOutcome, ResolveError> {
        debug!(
            file_count = ctx.page_listing.len(),
            "adopting listing embedded in the share page"
        );
        Ok(StrategyOutcome::Contributed(Contribution::files(
            ctx.page_listing.clone(),
        )))
    }
}

/// Adopts a `dlink` the listing itself carried.
#[derive(Debug, Default)]
pub struct EmbeddedDlinkStrategy;

impl EmbeddedDlinkStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Strategy for EmbeddedDlinkStrategy {
    fn name(&self) -> &'static str {
        "embedded-dlink"
    }

    fn applies(&self, _ctx: &ResolveContext, state: &ResolutionState) -> bool {
        state.has_files()
            && !state.has_download()
            && state
                .primary_file()
                .is_some_and(|file| file.dlink.as_deref().is_some_and(|link| !link.is_empty()))
    }

    async fn run(
        &self,
        _ctx: &ResolveContext,
        state: &ResolutionState,
    ) -> Result<StrategyOutcome, ResolveError> {
        let Some(dlink) = state
            .primary_file()
            .and_then(|file| file.dlink.clone())
            .filter(|link| !link.is_empty())
        else {
            return Ok(StrategyOutcome::Empty);
        };
        debug!("adopting dlink embedded in the listing");
        Ok(StrategyOutcome::Contributed(Contribution::download(dlink)))
    }
}

/// Hands out the signed download URL itself as the link of last resort.
///
/// Same preconditions as the share-download call, but no network: when that
/// call was refused, the URL sometimes still works when the client fetches
/// it directly with browser headers (which the streaming proxy supplies).
#[derive(Debug, Default)]
pub struct ConstructedUrlStrategy;

impl ConstructedUrlStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Strategy for ConstructedUrlStrategy {
    fn name(&self) -> &'static str {
        "constructed-url"
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
        debug!("handing out the constructed download URL");
        Ok(StrategyOutcome::Contributed(Contribution::download(url)))
    }
}
