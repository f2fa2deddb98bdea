//! Share-URL parsing: host and short-code extraction.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use super::error::{MAX_URL_LENGTH, ParseError};

/// Canonical host used when the input carries no usable `scheme://host` prefix.
pub const DEFAULT_HOST: &str = "www.terabox.com";

/// Regex for a `surl=` query parameter in inputs that never went through the
/// `url` crate (scheme-less pastes).
#[allow(clippy::expect_used)]
static SURL_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?&]surl=([^&#]*)").expect("surl regex is valid") // Static pattern, safe to panic
});

/// A parsed share link: everything later requests are built from.
///
/// Immutable once constructed. `host` keeps an explicit port when the input
/// carried one, so test servers on `127.0.0.1:PORT` round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareReference {
    /// `http` or `https`.
    pub scheme: String,
    /// Host (and optional port) of the file service.
    pub host: String,
    /// Opaque share identifier, stripped to `[A-Za-z0-9_-]`.
    pub short_code: String,
}

impl ShareReference {
    /// Base for first-party API calls, e.g. `https://www.terabox.com`.
    #[must_use]
    pub fn api_base(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Public share-page URL, e.g. `https://www.terabox.com/s/1AbCdEf`.
    #[must_use]
    pub fn share_page_url(&self) -> String {
        format!("{}://{}/s/{}", self.scheme, self.host, self.short_code)
    }
}

/// Parses a user-supplied share link into a [`ShareReference`].
///
/// Host rule: a leading `scheme://host` is honored; anything else (bare code,
/// `/s/...` path fragment) falls back to [`DEFAULT_HOST`] over https.
///
/// Short-code rule, in order:
/// 1. the path component following a `/s/` segment, up to the next `?`/`#`/`/`;
/// 2. a `surl=` query parameter;
/// 3. the final path segment.
///
/// The winning candidate is stripped to `[A-Za-z0-9_-]`; an empty result is
/// an error.
///
/// # Errors
///
/// Returns [`ParseError`] when the URL is over-long, malformed, uses a
/// non-web scheme, or yields no short code.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn parse_share_url(input: &str) -> Result<ShareReference, ParseError> {
    let input = input.trim();
    if input.len() > MAX_URL_LENGTH {
        return Err(ParseError::too_long(input));
    }
    if input.is_empty() {
        return Err(ParseError::no_short_code(input));
    }

    let (scheme, host) = extract_scheme_host(input)?;
    trace!(%scheme, %host, "share host resolved");

    let candidate = extract_code_candidate(input);
    let short_code = strip_code(&candidate);
    if short_code.is_empty() {
        return Err(ParseError::no_short_code(input));
    }

    debug!(%host, %short_code, "share URL parsed");
    Ok(ShareReference {
        scheme,
        host,
        short_code,
    })
}

/// Honors a leading `scheme://host`; defaults otherwise.
fn extract_scheme_host(input: &str) -> Result<(String, String), ParseError> {
    if !input.contains("://") {
        return Ok(("https".to_string(), DEFAULT_HOST.to_string()));
    }

    let parsed = Url::parse(input).map_err(|e| ParseError::malformed(input, &e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(ParseError::unsupported_scheme(input, scheme)),
    }
    let Some(host) = parsed.host_str() else {
        return Err(ParseError::malformed(input, "URL has no host"));
    };
    let host = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    Ok((parsed.scheme().to_string(), host))
}

/// Picks the raw short-code candidate: `/s/` segment, then `surl=`, then the
/// final path segment.
fn extract_code_candidate(input: &str) -> String {
    if let Some(pos) = input.find("/s/") {
        let after = &input[pos + 3..];
        let end = after
            .find(['?', '#', '/'])
            .unwrap_or(after.len());
        return after[..end].to_string();
    }

    if let Some(caps) = SURL_PARAM.captures(input) {
        if let Some(m) = caps.get(1) {
            return m.as_str().to_string();
        }
    }

    // Final path segment: drop query/fragment, then take what follows the
    // last slash. A bare pasted code has no slash and survives whole.
    let end = input.find(['?', '#']).unwrap_or(input.len());
    let path = &input[..end];
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Strips every character outside `[A-Za-z0-9_-]`.
fn strip_code(candidate: &str) -> String {
    candidate
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
