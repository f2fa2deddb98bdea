//! Cookie-blob normalization into a single `Cookie` header value.
//!
//! The resolve endpoint accepts cookies as either a raw header string or a
//! browser cookie-jar export (`{"url": ..., "cookies": [{"name", "value", ...}]}`
//! or a bare array of the same entries). Whatever arrives is flattened once
//! into `name=value; name=value` form and carried for the request lifetime
//! only; nothing is persisted.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Per-request session credentials for first-party calls.
///
/// The header value is sensitive (it typically carries the host's auth
/// cookies), so Debug output redacts it.
#[derive(Clone, Default)]
pub struct SessionCredentials {
    cookie_header: Option<String>,
}

impl SessionCredentials {
    /// Credentials for an anonymous/public share (no cookie header).
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            cookie_header: None,
        }
    }

    /// Wraps an already-formatted cookie header. Blank input is anonymous.
    #[must_use]
    pub fn from_header(header: impl Into<String>) -> Self {
        let header = header.into();
        let trimmed = header.trim();
        if trimmed.is_empty() {
            Self::anonymous()
        } else {
            Self {
                cookie_header: Some(trimmed.to_string()),
            }
        }
    }

    /// The `Cookie` header value, when one was supplied.
    ///
    /// Sensitive; avoid logging the return value.
    #[must_use]
    pub fn cookie_header(&self) -> Option<&str> {
        self.cookie_header.as_deref()
    }

    /// True when no cookies were supplied.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.cookie_header.is_none()
    }
}

// Custom Debug impl that redacts the header value.
impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field(
                "cookie_header",
                &self.cookie_header.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// One entry of a browser cookie-jar export. Fields beyond name/value
/// (domain, path, expirationDate, ...) are ignored.
#[derive(Debug, Deserialize)]
struct ExportedCookie {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

/// The wrapped export shape: `{"url": ..., "cookies": [...]}`.
#[derive(Debug, Deserialize)]
struct CookieJarExport {
    cookies: Vec<ExportedCookie>,
}

/// Normalizes the request's `cookies` field into [`SessionCredentials`].
///
/// Accepts, in order of recognition:
/// - a JSON string containing a jar export (bare array or `{cookies: [...]}`);
/// - a structured JSON array/object of the same shapes;
/// - any other string, used verbatim as the header;
/// - nothing, which is a valid anonymous request.
#[must_use]
pub fn normalize_cookies(raw: Option<&Value>) -> SessionCredentials {
    let Some(raw) = raw else {
        return SessionCredentials::anonymous();
    };

    match raw {
        Value::String(s) => normalize_cookie_string(s),
        Value::Array(_) | Value::Object(_) => match jar_pairs(raw) {
            Some(pairs) => SessionCredentials::from_header(join_pairs(&pairs)),
            None => {
                warn!("structured cookies field matched no known jar shape; ignoring");
                SessionCredentials::anonymous()
            }
        },
        // null / number / bool carry no cookies
        _ => SessionCredentials::anonymous(),
    }
}

fn normalize_cookie_string(s: &str) -> SessionCredentials {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return SessionCredentials::anonymous();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ (Value::Array(_) | Value::Object(_))) => {
            if let Some(pairs) = jar_pairs(&value) {
                debug!(cookies = pairs.len(), "normalized cookie-jar export");
                return SessionCredentials::from_header(join_pairs(&pairs));
            }
            warn!("cookie JSON matched no known jar shape; ignoring");
            SessionCredentials::anonymous()
        }
        // Not a jar export (plain header string, or a JSON scalar): verbatim.
        _ => SessionCredentials::from_header(trimmed),
    }
}

/// Extracts name/value pairs from either accepted jar shape.
fn jar_pairs(value: &Value) -> Option<Vec<(String, String)>> {
    let entries: Vec<ExportedCookie> = match value {
        Value::Array(_) => serde_json::from_value(value.clone()).ok()?,
        Value::Object(_) => {
            serde_json::from_value::<CookieJarExport>(value.clone())
                .ok()?
                .cookies
        }
        _ => return None,
    };

    let pairs: Vec<(String, String)> = entries
        .into_iter()
        .filter(|c| !c.name.is_empty())
        .map(|c| (c.name, c.value))
        .collect();
    Some(pairs)
}

fn join_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}
