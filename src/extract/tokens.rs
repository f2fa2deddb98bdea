//! Regex recovery of ephemeral session tokens from share-page HTML.
//!
//! The host embeds `jsToken`, `shareid`, `uk`, `sign`, and `timestamp` in
//! different spots depending on page template version: plain JS assignments,
//! embedded JSON blobs, and URL-encoded script parameters. Each token gets an
//! ordered pattern list; the first pattern with any match wins, and within a
//! pattern the longest capture wins (truncated echoes of the same variable
//! appear in some templates). A token with no match stays absent, which is a
//! capability reduction for later pipeline branches, not an error.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::compile_static_regex;

/// Session parameters scraped from the share page. Every field is
/// independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedTokens {
    /// Anti-abuse token required by the `filemetas` endpoint.
    pub js_token: Option<String>,
    /// Numeric share identifier.
    pub share_id: Option<String>,
    /// Numeric owner identifier.
    pub uk: Option<String>,
    /// Request signature for download/streaming endpoints.
    pub sign: Option<String>,
    /// Signature timestamp paired with `sign`.
    pub timestamp: Option<String>,
}

impl ExtractedTokens {
    /// True when the `share/list` branch can run (`shareid` + `uk`).
    #[must_use]
    pub fn has_share_identity(&self) -> bool {
        self.share_id.is_some() && self.uk.is_some()
    }

    /// True when the sign-based branches can run (`sign` + `timestamp`).
    #[must_use]
    pub fn has_signature(&self) -> bool {
        self.sign.is_some() && self.timestamp.is_some()
    }
}

static JS_TOKEN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // URL-encoded assignment: window.jsToken%20=%20fn%28%22<hex>%22%29
        compile_static_regex(r"window\.jsToken[^;]{0,40}?%22([A-Fa-f0-9]{8,})%22"),
        // JSON / JS assignment forms
        compile_static_regex(r#""jsToken"\s*:\s*"([^"]+)""#),
        compile_static_regex(r#"jsToken\s*[:=]\s*['"]([^'"]+)['"]"#),
        // Bare encoded function-call wrapper without the window prefix
        compile_static_regex(r"fn%28%22([A-Fa-f0-9]{8,})%22%29"),
    ]
});

static SHARE_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile_static_regex(r#""shareid"\s*:\s*"?(\d+)"?"#),
        compile_static_regex(r"[?&]shareid=(\d+)"),
        compile_static_regex(r"shareid\D{0,8}?(\d+)"),
    ]
});

static UK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile_static_regex(r#""uk"\s*:\s*"?(\d+)"?"#),
        compile_static_regex(r"[?&]uk=(\d+)"),
        compile_static_regex(r"\buk\b\D{0,4}?(\d+)"),
    ]
});

static SIGN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile_static_regex(r#""sign"\s*:\s*"([^"]+)""#),
        compile_static_regex(r"[?&]sign=([A-Za-z0-9%/+=_-]+)"),
        compile_static_regex(r#"sign\s*[:=]\s*['"]([^'"]+)['"]"#),
    ]
});

static TIMESTAMP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile_static_regex(r#""timestamp"\s*:\s*"?(\d+)"?"#),
        compile_static_regex(r"[?&]timestamp=(\d+)"),
        compile_static_regex(r"timestamp\D{0,8}?(\d+)"),
    ]
});

/// Scrapes all session tokens from share-page HTML.
#[tracing::instrument(skip(html), fields(html_len = html.len()))]
#[must_use]
pub fn extract_tokens(html: &str) -> ExtractedTokens {
    let tokens = ExtractedTokens {
        js_token: first_match(html, &JS_TOKEN_PATTERNS),
        share_id: first_match(html, &SHARE_ID_PATTERNS),
        uk: first_match(html, &UK_PATTERNS),
        sign: first_match(html, &SIGN_PATTERNS),
        timestamp: first_match(html, &TIMESTAMP_PATTERNS),
    };
    debug!(
        js_token = tokens.js_token.is_some(),
        share_id = tokens.share_id.is_some(),
        uk = tokens.uk.is_some(),
        sign = tokens.sign.is_some(),
        timestamp = tokens.timestamp.is_some(),
        "token extraction complete"
    );
    tokens
}

/// First pattern with any match wins; within a pattern, the longest capture.
fn first_match(html: &str, patterns: &[Regex]) -> Option<String> {
    for pattern in patterns {
        let best = pattern
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .max_by_key(|m| m.len());
        if let Some(m) = best {
            trace!(pattern = pattern.as_str(), "token pattern matched");
            return Some(m.as_str().to_string());
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // ==================== Per-token pattern forms ====================

    #[test]
    fn test_js_token_from_url_encoded_assignment() {
        let html = r"<script>window.jsToken%20%3D%20fn%28%2241D5C4B7A9F2E8D0%22%29;</script>";
        let tokens = extract_tokens(html);
        assert_eq!(tokens.js_token.unwrap(), "41D5C4B7A9F2E8D0");
    }

    #[test]
    fn test_js_token_from_json_blob() {
        let html = r#"{"jsToken":"0AF1E2D3C4B5A697"}"#;
        let tokens = extract_tokens(html);
        assert_eq!(tokens.js_token.unwrap(), "0AF1E2D3C4B5A697");
    }

    #[test]
    fn test_js_token_from_js_assignment() {
        let html = r"var jsToken = 'DEADBEEF00112233';";
        let tokens = extract_tokens(html);
        assert_eq!(tokens.js_token.unwrap(), "DEADBEEF00112233");
    }

    #[test]
    fn test_share_id_from_json() {
        let tokens = extract_tokens(r#"{"shareid":123456789,"uk":55}"#);
        assert_eq!(tokens.share_id.unwrap(), "123456789");
    }

    #[test]
    fn test_share_id_from_quoted_json() {
        let tokens = extract_tokens(r#"{"shareid":"987654321"}"#);
        assert_eq!(tokens.share_id.unwrap(), "987654321");
    }

    #[test]
    fn test_share_id_from_query_param() {
        let tokens = extract_tokens(r#"<a href="/share/download?shareid=42424242&uk=77">x</a>"#);
        assert_eq!(tokens.share_id.unwrap(), "42424242");
    }

    /// Some templates echo a truncated shareid before the full one; the
    /// longest capture per pattern must win.
    #[test]
    fn test_share_id_prefers_longest_capture() {
        let html = r#"{"shareid":12345678901}{"shareid":123}"#;
        let tokens = extract_tokens(html);
        assert_eq!(tokens.share_id.unwrap(), "12345678901");
    }

    #[test]
    fn test_uk_from_json() {
        let tokens = extract_tokens(r#"{"uk":400000123,"shareid":1}"#);
        assert_eq!(tokens.uk.unwrap(), "400000123");
    }

    #[test]
    fn test_uk_does_not_match_inside_words() {
        // "bulk" must not feed the uk pattern
        let tokens = extract_tokens("bulk756 operations");
        assert!(tokens.uk.is_none());
    }

    #[test]
    fn test_sign_from_json() {
        let tokens = extract_tokens(r#"{"sign":"a1b2c3|d4e5"}"#);
        assert_eq!(tokens.sign.unwrap(), "a1b2c3|d4e5");
    }

    #[test]
    fn test_sign_from_query_param() {
        let tokens = extract_tokens("/streaming?sign=AbC-123_x%3D&timestamp=1700000000");
        assert_eq!(tokens.sign.unwrap(), "AbC-123_x%3D");
        assert_eq!(tokens.timestamp.unwrap(), "1700000000");
    }

    #[test]
    fn test_timestamp_from_json() {
        let tokens = extract_tokens(r#"{"timestamp":1712345678}"#);
        assert_eq!(tokens.timestamp.unwrap(), "1712345678");
    }

    // ==================== Whole-page behavior ====================

    #[test]
    fn test_full_page_recovers_all_tokens() {
        let html = r#"
            <html><head><script>
            window.jsToken%20%3D%20fn%28%22FEEDFACE12345678%22%29
            </script></head><body>
            <script>var ctx = {"shareid":111222333,"uk":444555666,
             "sign":"c2lnbi12YWx1ZQ==","timestamp":"1712000000"};</script>
            </body></html>
        "#;
        let tokens = extract_tokens(html);
        assert_eq!(tokens.js_token.unwrap(), "FEEDFACE12345678");
        assert_eq!(tokens.share_id.unwrap(), "111222333");
        assert_eq!(tokens.uk.unwrap(), "444555666");
        assert_eq!(tokens.sign.unwrap(), "c2lnbi12YWx1ZQ==");
        assert_eq!(tokens.timestamp.unwrap(), "1712000000");
    }

    #[test]
    fn test_missing_tokens_stay_absent() {
        let tokens = extract_tokens("<html><body>nothing here</body></html>");
        assert_eq!(tokens, ExtractedTokens::default());
    }

    #[test]
    fn test_empty_html() {
        let tokens = extract_tokens("");
        assert_eq!(tokens, ExtractedTokens::default());
    }

    // ==================== Helper predicates ====================

    #[test]
    fn test_has_share_identity() {
        let mut tokens = ExtractedTokens::default();
        assert!(!tokens.has_share_identity());
        tokens.share_id = Some("1".to_string());
        assert!(!tokens.has_share_identity());
        tokens.uk = Some("2".to_string());
        assert!(tokens.has_share_identity());
    }

    #[test]
    fn test_has_signature() {
        let mut tokens = ExtractedTokens::default();
        assert!(!tokens.has_signature());
        tokens.sign = Some("s".to_string());
        tokens.timestamp = Some("1".to_string());
        assert!(tokens.has_signature());
    }
}
