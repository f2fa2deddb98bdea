//! Shared request-identity strings for page, API, and proxy HTTP clients.
//!
//! Single source for the browser User-Agent and the upstream Referer/Origin
//! pair so scraping and proxy traffic stay consistent and easy to update.

/// Desktop Chrome User-Agent presented to the file host.
///
/// The share page and several first-party endpoints serve different markup
/// (or refuse outright) to non-browser agents, so every outbound request
/// uses this string rather than a crate-identifying one.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// `Referer` value the upstream CDN expects on proxied media requests.
pub(crate) const UPSTREAM_REFERER: &str = "https://www.terabox.com/";

/// `Origin` value paired with [`UPSTREAM_REFERER`] on proxied media requests.
pub(crate) const UPSTREAM_ORIGIN: &str = "https://www.terabox.com";
