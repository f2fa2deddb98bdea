//! End-to-end resolve flow: share URL in, link menu or JSON error out.
//!
//! Each test stands up one wiremock host playing the share-page host, the
//! first-party API, and both mirror services at once, then drives the full
//! router with one-shot requests. Unmatched paths answer 404, which the
//! chain treats as a soft per-strategy failure.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sharebox_core::{AppState, build_router};

mod support;
use support::socket_guard::start_mock_server_or_skip;

/// Router whose upstream strategies and mirrors all point at the mock host.
fn app_pointed_at(mock_uri: &str) -> Router {
    let state = AppState::new(Some(mock_uri), Some(mock_uri)).expect("state");
    build_router(state)
}

async fn post_resolve(app: Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}

async fn mount_share_page(mock_server: &MockServer, html: &str) {
    Mock::given(method("GET"))
        .and(path("/s/1TestCode"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(mock_server)
        .await;
}

/// Inline listing feeds the menu, `filemetas` supplies the download link,
/// and the surviving streaming probe fills the stream list.
#[tokio::test]
async fn test_resolve_full_menu_from_inline_listing() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let download_url = format!("{}/dl/clip.mp4", mock_server.uri());
    let stream_url = format!("{}/stream/720.m3u8", mock_server.uri());

    let page = r#"<html><head><script>
        window.jsToken%20%3D%20fn%28%22FEEDFACE12345678%22%29
        </script></head><body>
        <script>var ctx = {"shareid":111222333,"uk":444555666,
          "sign":"c2lnbi12YWx1ZQ==","timestamp":"1712000000",
          "file_list":[{"fs_id":111,"server_filename":"clip.mp4","size":1048576,
            "category":1,"isdir":0,"thumbs":{"url_3":"https://thumb.example/clip.jpg"}}]};
        </script></body></html>"#;
    mount_share_page(&mock_server, page).await;

    Mock::given(method("POST"))
        .and(path("/api/filemetas"))
        .and(body_string_contains("fs_ids=%5B111%5D"))
        .and(body_string_contains("jsToken=FEEDFACE12345678"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errno": 0,
            "info": [{"dlink": download_url}]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/share/streaming"))
        .and(query_param("type", "M3U8_AUTO_720"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errno": 0,
            "urls": [{"url": stream_url}]
        })))
        .mount(&mock_server)
        .await;

    let app = app_pointed_at(&mock_server.uri());
    let share_url = format!("{}/s/1TestCode", mock_server.uri());
    let (status, value) = post_resolve(app, json!({"url": share_url})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["success"], true);
    assert_eq!(value["file"]["name"], "clip.mp4");
    assert_eq!(value["file"]["sizeFormatted"], "1.00 MB");
    assert_eq!(value["file"]["category"], 1);
    assert_eq!(value["file"]["isVideo"], true);
    assert_eq!(value["file"]["fsId"], 111);
    assert_eq!(value["file"]["thumbnail"], "https://thumb.example/clip.jpg");
    assert_eq!(value["download"]["available"], true);
    assert_eq!(value["download"]["url"], download_url.as_str());
    assert_eq!(value["streaming"]["available"], true);
    let links = value["streaming"]["links"].as_array().expect("links");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["resolution"], "720p");
    assert_eq!(links[0]["type"], "M3U8_AUTO_720");
    assert_eq!(links[0]["url"], stream_url.as_str());
    assert_eq!(
        value["playerLinks"]["vlc"],
        format!("vlc://{download_url}").as_str()
    );
    assert_eq!(value["playerLinks"]["m3u8"], stream_url.as_str());
    assert!(value["playerLinks"].get("mxplayer").is_some());
}

/// A documented rejection from the short-url lookup ends the run before any
/// download strategy is attempted.
#[tokio::test]
async fn test_expired_share_is_rejected_before_download_attempts() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    // Identity tokens present, so share/list would be eligible were the
    // rejection not definitive.
    let page = r#"<script>var ctx = {"shareid":123456789,"uk":987654321};</script>"#;
    mount_share_page(&mock_server, page).await;

    Mock::given(method("GET"))
        .and(path("/api/shorturlinfo"))
        .and(query_param("shorturl", "1TestCode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errno": -7})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/share/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errno": 0, "list": []})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = app_pointed_at(&mock_server.uri());
    let share_url = format!("{}/s/1TestCode", mock_server.uri());
    let (status, value) = post_resolve(app, json!({"url": share_url})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["success"], false);
    assert_eq!(value["error"], "Share link has expired");
    assert!(value.get("fileName").is_none());
}

/// Without a signature the download leg cannot produce anything, but the
/// surviving streaming probes still make the share playable. Probe failures
/// of every flavor (HTTP error, upstream errno, nothing URL-shaped) are
/// skipped without losing the successes around them.
#[tokio::test]
async fn test_streaming_only_share_collects_surviving_tags_in_order() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let stream_720 = format!("{}/stream/720.m3u8", mock_server.uri());
    let stream_360 = format!("{}/stream/360.m3u8", mock_server.uri());

    let page = r#"<script>var ctx = {"shareid":111222333,"uk":444555666,
        "jsToken":"0AF1E2D3C4B5A697",
        "file_list":[{"fs_id":222,"server_filename":"lecture.mkv",
          "size":3221225472,"category":1,"isdir":0}]};</script>"#;
    mount_share_page(&mock_server, page).await;

    Mock::given(method("POST"))
        .and(path("/api/filemetas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errno": 2})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/share/streaming"))
        .and(query_param("type", "M3U8_AUTO_720"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errno": 0,
            "urls": [{"url": stream_720}]
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
        .respond_with(ResponseTemplate::new(200).set_body_string(stream_360.clone()))
        .mount(&mock_server)
        .await;

    let app = app_pointed_at(&mock_server.uri());
    let share_url = format!("{}/s/1TestCode", mock_server.uri());
    let (status, value) = post_resolve(app, json!({"url": share_url})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["success"], true);
    assert_eq!(value["file"]["sizeFormatted"], "3.00 GB");
    assert_eq!(value["download"]["available"], false);
    assert!(value["download"].get("url").is_none());

    let links = value["streaming"]["links"].as_array().expect("links");
    assert_eq!(links.len(), 2);
    assert_eq!(links[0]["type"], "M3U8_AUTO_720");
    assert_eq!(links[0]["url"], stream_720.as_str());
    assert_eq!(links[1]["type"], "M3U8_AUTO_360");
    assert_eq!(links[1]["url"], stream_360.as_str());

    // First surviving probe is the canonical playlist; native-player links
    // need a download URL and stay null or absent without one.
    assert_eq!(value["playerLinks"]["m3u8"], stream_720.as_str());
    assert!(value["playerLinks"]["vlc"].is_null());
    assert!(value["playerLinks"].get("vlc").is_some());
    assert!(value["playerLinks"].get("mxplayer").is_none());
}

/// A listing with no workable link in any strategy still names the file in
/// the failure report. Both mirrors are consulted before giving up.
#[tokio::test]
async fn test_unresolvable_share_reports_file_name() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    let page = r#"<script>var ctx = {"shareid":111222333,"uk":444555666,
        "jsToken":"0AF1E2D3C4B5A697",
        "file_list":[{"fs_id":333,"server_filename":"doc.pdf",
          "size":2048,"category":4,"isdir":0}]};</script>"#;
    mount_share_page(&mock_server, page).await;

    Mock::given(method("POST"))
        .and(path("/api/filemetas"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = app_pointed_at(&mock_server.uri());
    let share_url = format!("{}/s/1TestCode", mock_server.uri());
    let (status, value) = post_resolve(app, json!({"url": share_url})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(value["success"], false);
    assert_eq!(value["error"], "could not resolve a link for doc.pdf");
    assert_eq!(value["fileName"], "doc.pdf");
}

/// No listing from the page or any listing endpoint is a 404.
#[tokio::test]
async fn test_share_without_files_is_not_found() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    mount_share_page(&mock_server, "<html><body>nothing embedded</body></html>").await;
    Mock::given(method("GET"))
        .and(path("/api/shorturlinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errno": 0, "list": []})))
        .mount(&mock_server)
        .await;

    let app = app_pointed_at(&mock_server.uri());
    let share_url = format!("{}/s/1TestCode", mock_server.uri());
    let (status, value) = post_resolve(app, json!({"url": share_url})).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(value["success"], false);
    assert_eq!(value["error"], "no files found for share '1TestCode'");
}

/// Listing recovered from the short-url API, download from the signed
/// `share/download` leg. The anti-abuse token is absent, so `filemetas`
/// must not be attempted.
#[tokio::test]
async fn test_api_listing_with_signed_download_leg() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let download_url = format!("{}/dl/movie.mp4", mock_server.uri());

    let page = concat!(
        r#"<a href="/share/download?shareid=123456789&uk=987654321"#,
        r#"&sign=sig-abc_123&timestamp=1712000001">download</a>"#
    );
    mount_share_page(&mock_server, page).await;

    Mock::given(method("GET"))
        .and(path("/api/shorturlinfo"))
        .and(query_param("shorturl", "1TestCode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errno": 0,
            "list": [{"fs_id": "424242", "server_filename": "movie.mp4",
                      "size": "734003200", "category": "1", "isdir": "0"}]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/filemetas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errno": 0})))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/share/download"))
        .and(query_param("shareid", "123456789"))
        .and(query_param("uk", "987654321"))
        .and(query_param("fid_list", "[424242]"))
        .and(query_param("sign", "sig-abc_123"))
        .and(query_param("timestamp", "1712000001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errno": 0,
            "dlink": download_url
        })))
        .mount(&mock_server)
        .await;

    let app = app_pointed_at(&mock_server.uri());
    let share_url = format!("{}/s/1TestCode", mock_server.uri());
    let (status, value) = post_resolve(app, json!({"url": share_url})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["file"]["name"], "movie.mp4");
    assert_eq!(value["file"]["fsId"], 424_242);
    assert_eq!(value["file"]["sizeFormatted"], "700.00 MB");
    assert_eq!(value["download"]["available"], true);
    assert_eq!(value["download"]["url"], download_url.as_str());
    assert_eq!(value["streaming"]["available"], false);
    assert!(value["playerLinks"]["m3u8"].is_null());
}

/// Caller-supplied cookies ride along on the share-page fetch.
#[tokio::test]
async fn test_caller_cookies_reach_the_share_page() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/s/1TestCode"))
        .and(header("cookie", "ndus=tok123; lang=en"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/shorturlinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errno": 0, "list": []})))
        .mount(&mock_server)
        .await;

    let app = app_pointed_at(&mock_server.uri());
    let share_url = format!("{}/s/1TestCode", mock_server.uri());
    let (status, _value) = post_resolve(
        app,
        json!({"url": share_url, "cookies": "ndus=tok123; lang=en"}),
    )
    .await;

    // The flow itself ends at 404 (no files); the mock's expectation is the
    // real assertion here.
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Unparseable share URLs fail fast with the JSON error contract, before
/// any upstream traffic.
#[tokio::test]
async fn test_invalid_share_url_is_bad_request() {
    let state = AppState::new(None, None).expect("state");
    let app = build_router(state);

    let (status, value) = post_resolve(
        app,
        json!({"url": "ftp://terabox.com/s/1AbCdEf"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["success"], false);
    let message = value["error"].as_str().expect("error message");
    assert!(message.contains("scheme 'ftp' is not supported"));
}
