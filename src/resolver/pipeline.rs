//! The generic strategy runner: evaluates the ordered chain and classifies
//! the terminal outcome.

use tracing::{debug, trace, warn};

use super::{Resolution, ResolutionState, ResolveContext, ResolveError, Strategy, StrategyOutcome};

/// Ordered collection of strategies with the resolution loop.
///
/// Strategies run strictly in registration order, each at most once per
/// request. The `applies` gates carry the preconditions (inputs present,
/// produced fields still missing), so ordering and short-circuit policy are
/// data rather than control flow.
#[derive(Default)]
pub struct StrategyPipeline {
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategyPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Appends a strategy at the end of the chain.
    pub fn register(&mut self, strategy: Box<dyn Strategy>) {
        self.strategies.push(strategy);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Registered strategy names in chain order.
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Runs the chain for one request.
    ///
    /// Soft failures (network, per-call timeout, malformed responses) are
    /// logged and skipped; only three conditions end the run early or
    /// unsuccessfully.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::UpstreamApi`] when the first-party service
    ///   definitively rejected the share (no later strategy is attempted)
    /// - [`ResolveError::NoFilesFound`] when no strategy produced a listing
    /// - [`ResolveError::ResolutionExhausted`] when a listing exists but no
    ///   download or streaming link could be produced
    #[tracing::instrument(skip_all, fields(share = %ctx.share.short_code))]
    pub async fn resolve(&self, ctx: &ResolveContext) -> Result<Resolution, ResolveError> {
        let mut state = ResolutionState::default();

        for strategy in &self.strategies {
            if !strategy.applies(ctx, &state) {
                trace!(strategy = strategy.name(), "preconditions not met; skipped");
                continue;
            }
            debug!(strategy = strategy.name(), "running strategy");
            match strategy.run(ctx, &state).await {
                Ok(StrategyOutcome::Contributed(contribution)) => {
                    state.absorb(contribution);
                    debug!(
                        strategy = strategy.name(),
                        files = state.files().len(),
                        download = state.has_download(),
                        streams = state.has_streams(),
                        "strategy contributed"
                    );
                }
                Ok(StrategyOutcome::Empty) => {
                    debug!(strategy = strategy.name(), "no contribution");
                }
                Ok(StrategyOutcome::Failed(error)) => {
                    warn!(
                        strategy = strategy.name(),
                        error = %error,
                        "strategy failed; continuing with the rest of the chain"
                    );
                }
                Err(fatal) => {
                    warn!(
                        strategy = strategy.name(),
                        error = %fatal,
                        "definitive upstream rejection; aborting the chain"
                    );
                    return Err(fatal);
                }
            }
        }

        if !state.has_files() {
            return Err(ResolveError::no_files(&ctx.share.short_code));
        }
        if !state.has_download() && !state.has_streams() {
            let file_name = state.primary_file().map(|file| file.name.clone());
            return Err(ResolveError::exhausted(file_name));
        }
        Ok(state.into_resolution())
    }
}

impl std::fmt::Debug for StrategyPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyPipeline")
            .field("strategies", &self.strategy_names())
            .finish_non_exhaustive()
    }
}
