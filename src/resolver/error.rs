//! Terminal error taxonomy for the resolution flow.
//!
//! Strategy-internal failures (network errors, per-call timeouts, malformed
//! responses) never appear here; the pipeline downgrades them to "no
//! contribution" and moves on. A `ResolveError` is only produced when the
//! request as a whole cannot succeed.

use thiserror::Error;

/// Why a resolution request failed.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The first-party service answered the short-url lookup with a
    /// documented non-ok code. Definitive: no later strategy is attempted.
    #[error("{message}")]
    UpstreamApi { code: i64, message: String },

    /// No strategy produced a file listing.
    #[error("no files found for share '{short_code}'")]
    NoFilesFound { short_code: String },

    /// A listing exists but every download and streaming strategy came up
    /// empty. The primary file name is retained for partial reporting.
    #[error("could not resolve a link for {}", .file_name.as_deref().unwrap_or("the requested file"))]
    ResolutionExhausted { file_name: Option<String> },

    /// A call whose timeout is fatal (share-page fetch, proxy relay)
    /// exceeded its budget.
    #[error("{operation} timed out")]
    Timeout { operation: String },

    /// The share page could not be fetched at all (non-timeout).
    #[error("failed to fetch the share page: {reason}")]
    PageFetch { reason: String },

    /// Anything else. Carries the underlying message, never a backtrace.
    #[error("{message}")]
    Unexpected { message: String },
}

impl ResolveError {
    #[must_use]
    pub fn upstream(code: i64, message: impl Into<String>) -> Self {
        Self::UpstreamApi {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn no_files(short_code: impl Into<String>) -> Self {
        Self::NoFilesFound {
            short_code: short_code.into(),
        }
    }

    #[must_use]
    pub fn exhausted(file_name: Option<String>) -> Self {
        Self::ResolutionExhausted { file_name }
    }

    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    #[must_use]
    pub fn page_fetch(reason: impl Into<String>) -> Self {
        Self::PageFetch {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }
}
