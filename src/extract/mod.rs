//! Scraping layer: pulls session tokens and file listings out of share-page
//! HTML.
//!
//! Page templates change without notice, so everything here is tolerant by
//! construction. Token extraction tries ordered pattern lists per token and
//! leaves unmatched tokens absent. Listing extraction tries several embedded
//! markers and swallows per-blob parse failures. Callers decide what a
//! missing piece means; this module never errors.

mod listing;
mod tokens;

use regex::Regex;

pub use listing::{FileCategory, FileRecord, extract_listing, primary_file};
pub(crate) use listing::{RemoteFileEntry, string_or_u64};
pub use tokens::{ExtractedTokens, extract_tokens};

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}
