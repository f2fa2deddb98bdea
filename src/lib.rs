//! Share Link Resolution Core
//!
//! This library turns public file-host share links into direct download and
//! streaming URLs. It scrapes the share page for session tokens and file
//! listings, then walks an ordered chain of fallback strategies against the
//! host's first-party APIs and third-party mirror services until it has
//! usable links.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - share URL validation and short-code extraction
//! - [`auth`] - caller-supplied cookie normalization
//! - [`extract`] - token and file-listing scraping from share-page HTML
//! - [`resolver`] - strategy chain producing download and stream links
//! - [`server`] - HTTP surface: resolve endpoint, streaming proxy, health
//! - [`config`] - environment-driven runtime settings

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod extract;
pub mod parser;
pub mod resolver;
pub mod server;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use auth::{SessionCredentials, normalize_cookies};
pub use config::Config;
pub use extract::{
    ExtractedTokens, FileCategory, FileRecord, extract_listing, extract_tokens, primary_file,
};
pub use parser::{DEFAULT_HOST, MAX_URL_LENGTH, ParseError, ShareReference, parse_share_url};
pub use resolver::{
    ConstructedUrlStrategy, Contribution, EmbeddedDlinkStrategy, FetchMirrorStrategy,
    FileMetasStrategy, InlineListingStrategy, LinkmapMirrorStrategy, PageFetcher, Resolution,
    ResolutionState, ResolveContext, ResolveError, ShareDownloadStrategy, ShareListStrategy,
    ShortUrlInfoStrategy, Strategy, StrategyOutcome, StrategyPipeline, StreamLink,
    StreamingStrategy, build_default_strategy_chain,
};
pub use server::{ApiError, AppState, ResolveRequest, build_router};
