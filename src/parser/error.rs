//! Error types for share-link parsing.

use thiserror::Error;

/// Maximum URL length to accept (standard browser limit).
/// URLs longer than this are rejected to prevent memory issues.
pub const MAX_URL_LENGTH: usize = 2000;

/// Errors that can occur while parsing a share link.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// URL is malformed, uses an unsupported scheme, or carries no short code
    #[error("invalid share URL '{url}': {reason}\n  Suggestion: {suggestion}")]
    InvalidUrl {
        /// The URL that failed validation
        url: String,
        /// Why the URL is invalid
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// URL exceeds maximum allowed length
    #[error(
        "share URL too long ({length} chars, max {max}): {url_preview}...\n  Suggestion: Copy the share link directly from the host instead of pasting surrounding text"
    )]
    UrlTooLong {
        /// Truncated URL for display
        url_preview: String,
        /// Actual length
        length: usize,
        /// Maximum allowed
        max: usize,
    },
}

impl ParseError {
    /// Creates an `InvalidUrl` error for a non-web URL scheme.
    #[must_use]
    pub fn unsupported_scheme(url: &str, scheme: &str) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: format!("scheme '{scheme}' is not supported"),
            suggestion: "Use an http:// or https:// share link".to_string(),
        }
    }

    /// Creates an `InvalidUrl` error for a malformed URL.
    #[must_use]
    pub fn malformed(url: &str, parse_error: &str) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: parse_error.to_string(),
            suggestion: "Check the share link format and try again".to_string(),
        }
    }

    /// Creates an `InvalidUrl` error for a URL that yields no usable short code.
    #[must_use]
    pub fn no_short_code(url: &str) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: "no share code found in the URL".to_string(),
            suggestion: "Paste the full share link, e.g. https://terabox.com/s/1AbCdEf".to_string(),
        }
    }

    /// Creates a `UrlTooLong` error for URLs exceeding the maximum length.
    #[must_use]
    pub fn too_long(url: &str) -> Self {
        Self::UrlTooLong {
            url_preview: url.chars().take(50).collect(),
            length: url.len(),
            max: MAX_URL_LENGTH,
        }
    }
}
