//! Streaming menu probe: one call per quality tag, keeping every hit.
//!
//! Unlike the download leg this is not first-success-wins across tags; each
//! tag that answers with a playable URL becomes a menu entry, in tag order,
//! and the first hit doubles as the canonical primary stream.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::http_client::{STREAM_PROBE_TIMEOUT_SECS, build_upstream_client};
use super::{
    Contribution, FIRST_PARTY_APP_ID, ResolutionState, ResolveContext, ResolveError, StreamLink,
    Strategy, StrategyOutcome, first_party_get,
};

/// Quality tags probed, in menu order, with their human labels.
const QUALITY_TAGS: [(&str, &str); 4] = [
    ("M3U8_AUTO_720", "720p"),
    ("M3U8_AUTO_480", "480p"),
    ("M3U8_FLV_264_480", "480p flv"),
    ("M3U8_AUTO_360", "360p"),
];

/// Depth-first scan for the first string that looks like an absolute URL.
fn find_absolute_url(value: &Value) -> Option<&str> {
    match value {
        Value::String(text) if is_absolute_url(text) => Some(text),
        Value::Array(items) => items.iter().find_map(find_absolute_url),
        Value::Object(map) => map.values().find_map(find_absolute_url),
        _ => None,
    }
}

fn is_absolute_url(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

/// Pulls a playable URL out of one streaming response body, whatever its
/// shape: a JSON envelope with the URL buried somewhere, or a plain-text
/// body that is the URL itself.
fn extract_stream_url(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<Value>(body)
        && let Some(url) = find_absolute_url(&value)
    {
        return Some(url.to_owned());
    }
    let trimmed = body.trim();
    is_absolute_url(trimmed).then(|| trimmed.to_owned())
}

/// Probes `/share/streaming` across the fixed quality menu.
pub struct StreamingStrategy {
    client: Client,
}

impl StreamingStrategy {
    /// # Errors
    ///
    /// Returns [`ResolveError`] if HTTP client construction fails.
    pub fn new() -> Result<Self, ResolveError> {
        let client = build_upstream_client("streaming", STREAM_PROBE_TIMEOUT_SECS)?;
        Ok(Self { client })
    }

    fn probe_url(&self, ctx: &ResolveContext, fs_id: u64, tag: &str) -> Option<String> {
        let share_id = ctx.tokens.share_id.as_deref()?;
        let uk = ctx.tokens.uk.as_deref()?;
        let mut url = format!(
            "{}/share/streaming?channel=dubox&app_id={}&clienttype=0&web=1&uk={uk}&shareid={share_id}&fid={fs_id}&type={tag}",
            ctx.share.api_base(),
            FIRST_PARTY_APP_ID,
        );
        if let (Some(sign), Some(timestamp)) = (
            ctx.tokens.sign.as_deref(),
            ctx.tokens.timestamp.as_deref(),
        ) {
            url.push_str(&format!(
                "&sign={}&timestamp={timestamp}",
                urlencoding::encode(sign)
            ));
        }
        Some(url)
    }
}

#[async_trait]
impl Strategy for StreamingStrategy {
    fn name(&self) -> &'static str {
        "streaming"
    }

    fn applies(&self, ctx: &ResolveContext, state: &ResolutionState) -> bool {
        state.primary_file().is_some_and(|file| file.is_video())
            && ctx.tokens.has_share_identity()
    }

    async fn run(
        &self,
        ctx: &ResolveContext,
        state: &ResolutionState,
    ) -> Result<StrategyOutcome, ResolveError> {
        let Some(fs_id) = state.primary_file().map(|file| file.fs_id) else {
            return Ok(StrategyOutcome::Empty);
        };

        let mut streams = Vec::new();
        for (tag, label) in QUALITY_TAGS {
            let Some(url) = self.probe_url(ctx, fs_id, tag) else {
                return Ok(StrategyOutcome::Empty);
            };
            debug!(tag, api_url = %url, "probing streaming quality");

            let response = match first_party_get(&self.client, &url, ctx).send().await {
                Ok(response) => response,
                Err(error) => {
                    warn!(tag, error = %error, "streaming probe failed");
                    continue;
                }
            };
            if !response.status().is_success() {
                debug!(tag, status = response.status().as_u16(), "streaming probe refused");
                continue;
            }
            let body = match response.text().await {
                Ok(body) => body,
                Err(error) => {
                    warn!(tag, error = %error, "streaming probe body unreadable");
                    continue;
                }
            };
            match extract_stream_url(&body) {
                Some(stream_url) => {
                    debug!(tag, "streaming probe produced a link");
                    streams.push(StreamLink::new(label, tag, stream_url));
                }
                None => debug!(tag, "streaming probe answered without a link"),
            }
        }

        if streams.is_empty() {
            debug!("no streaming quality produced a link");
            return Ok(StrategyOutcome::Empty);
        }
        debug!(stream_count = streams.len(), "streaming menu assembled");
        Ok(StrategyOutcome::Contributed(Contribution::streams(streams)))
    }
}

impl std::fmt::Debug for StreamingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingStrategy").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    use super::super::{context_for_tests, file_for_tests};
    use super::*;
    use crate::extract::FileCategory;
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    fn context_with_identity(base_url: &str) -> ResolveContext {
        let mut ctx = context_for_tests(base_url);
        ctx.tokens.share_id = Some("123456789".to_string());
        ctx.tokens.uk = Some("987654321".to_string());
        ctx
    }

    fn state_with_video() -> ResolutionState {
        let mut state = ResolutionState::default();
        state.absorb(Contribution::files(vec![file_for_tests(
            "movie.mp4",
            FileCategory::Video,
        )]));
        state
    }

    #[test]
    fn test_extract_stream_url_from_json_envelope() {
        let body = json!({
            "errno": 0,
            "info": {"m3u8": "https://stream.example/v/720.m3u8"},
        })
        .to_string();
        assert_eq!(
            extract_stream_url(&body).as_deref(),
            Some("https://stream.example/v/720.m3u8")
        );
    }

    #[test]
    fn test_extract_stream_url_from_plain_body() {
        assert_eq!(
            extract_stream_url("  https://stream.example/direct.m3u8\n").as_deref(),
            Some("https://stream.example/direct.m3u8")
        );
        assert!(extract_stream_url("#EXTM3U\n#EXT-X-STREAM-INF").is_none());
        assert!(extract_stream_url("{\"errno\": -105}").is_none());
    }

    #[test]
    fn test_find_absolute_url_scans_nested_arrays() {
        let value = json!({"list": [{"title": "720"}, {"url": "http://s.example/x"}]});
        assert_eq!(find_absolute_url(&value), Some("http://s.example/x"));
    }

    #[tokio::test]
    async fn test_run_keeps_every_successful_tag_in_order() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/share/streaming"))
            .and(query_param("type", "M3U8_AUTO_720"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errno": 0, "url": "https://stream.example/720.m3u8",
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/share/streaming"))
            .and(query_param("type", "M3U8_AUTO_480"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/share/streaming"))
            .and(query_param("type", "M3U8_FLV_264_480"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errno": -105})))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/share/streaming"))
            .and(query_param("type", "M3U8_AUTO_360"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("https://stream.example/360.m3u8"),
            )
            .mount(&mock_server)
            .await;

        let ctx = context_with_identity(&mock_server.uri());
        let strategy = StreamingStrategy::new().unwrap();
        let outcome = strategy.run(&ctx, &state_with_video()).await.unwrap();

        let StrategyOutcome::Contributed(contribution) = outcome else {
            panic!("expected a streaming contribution, got {outcome:?}");
        };
        assert_eq!(contribution.streams.len(), 2);
        assert_eq!(contribution.streams[0].resolution, "720p");
        assert_eq!(contribution.streams[0].tag, "M3U8_AUTO_720");
        assert_eq!(contribution.streams[0].url, "https://stream.example/720.m3u8");
        assert_eq!(contribution.streams[1].resolution, "360p");
        assert_eq!(contribution.streams[1].url, "https://stream.example/360.m3u8");
    }

    #[tokio::test]
    async fn test_run_all_tags_failing_is_empty() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/share/streaming"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errno": 31066})))
            .mount(&mock_server)
            .await;

        let ctx = context_with_identity(&mock_server.uri());
        let strategy = StreamingStrategy::new().unwrap();
        let outcome = strategy.run(&ctx, &state_with_video()).await.unwrap();
        assert!(matches!(outcome, StrategyOutcome::Empty));
    }

    #[test]
    fn test_applies_only_to_videos_with_identity() {
        let strategy = StreamingStrategy::new().unwrap();
        let ctx = context_with_identity("https://www.terabox.com");

        assert!(strategy.applies(&ctx, &state_with_video()));

        let mut document = ResolutionState::default();
        document.absorb(Contribution::files(vec![file_for_tests(
            "notes.pdf",
            FileCategory::Document,
        )]));
        assert!(!strategy.applies(&ctx, &document));

        let bare = context_for_tests("https://www.terabox.com");
        assert!(!strategy.applies(&bare, &state_with_video()));
    }

    /// A download link does not suppress the menu; streams supplement it.
    #[test]
    fn test_applies_even_with_download_already_set() {
        let strategy = StreamingStrategy::new().unwrap();
        let ctx = context_with_identity("https://www.terabox.com");
        let mut state = state_with_video();
        state.absorb(Contribution::download("https://d.example/dl"));
        assert!(strategy.applies(&ctx, &state));
    }
}
