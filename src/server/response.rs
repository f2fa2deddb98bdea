//! External JSON contract for successful resolutions.
//!
//! Field casing and the player-link formats are consumed by an existing web
//! UI, so they are part of the public surface and covered by tests.

use serde::Serialize;

use crate::resolver::Resolution;

/// Success payload of the resolve endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub success: bool,
    pub file: FilePayload,
    pub download: DownloadPayload,
    pub streaming: StreamingPayload,
    pub player_links: PlayerLinks,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    pub name: String,
    pub size_formatted: String,
    /// Numeric upstream category code (1 = video, ...).
    pub category: u8,
    pub is_video: bool,
    pub fs_id: u64,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadPayload {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StreamingPayload {
    pub available: bool,
    pub links: Vec<StreamEntry>,
}

#[derive(Debug, Serialize)]
pub struct StreamEntry {
    /// Human label ("720p").
    pub resolution: String,
    /// Raw upstream quality tag.
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// Deep links into native players.
///
/// `vlc`, `potplayer` and `m3u8` are always serialized (null when absent);
/// the remaining players are omitted entirely when there is nothing to link.
#[derive(Debug, Serialize)]
pub struct PlayerLinks {
    pub vlc: Option<String>,
    pub potplayer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mxplayer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iina: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nplayer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infuse: Option<String>,
    pub m3u8: Option<String>,
}

/// Formats a byte count with base-1024 units, two decimals, largest unit
/// whose scaled value is at least 1. Zero stays `"0 B"`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_owned();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Synthesizes the player deep links. The download URL feeds the native
/// players; the primary stream URL feeds `m3u8` independently.
#[must_use]
pub fn player_links(download_url: Option<&str>, primary_stream_url: Option<&str>) -> PlayerLinks {
    PlayerLinks {
        vlc: download_url.map(|url| format!("vlc://{url}")),
        potplayer: download_url.map(|url| format!("potplayer://{url}")),
        mxplayer: download_url
            .map(|url| format!("intent:{url}#Intent;package=com.mxtech.videoplayer.ad;end")),
        iina: download_url.map(|url| format!("iina://weblink?url={url}")),
        nplayer: download_url.map(|url| format!("nplayer-{url}")),
        infuse: download_url.map(|url| format!("infuse://x-callback-url/play?url={url}")),
        m3u8: primary_stream_url.map(ToOwned::to_owned),
    }
}

/// Builds the success payload from a finished resolution. Returns `None`
/// when no file metadata survived, which the pipeline's terminal
/// classification normally rules out.
#[must_use]
pub fn resolve_response(resolution: &Resolution) -> Option<ResolveResponse> {
    let file = resolution.primary_file()?;
    let download_url = resolution.download_url.as_deref();
    let primary_stream_url = resolution.streams.first().map(|stream| stream.url.as_str());

    Some(ResolveResponse {
        success: true,
        file: FilePayload {
            name: file.name.clone(),
            size_formatted: format_size(file.size_bytes),
            category: file.category.code(),
            is_video: file.is_video(),
            fs_id: file.fs_id,
            thumbnail: file.thumbnail.clone(),
        },
        download: DownloadPayload {
            available: download_url.is_some(),
            url: resolution.download_url.clone(),
        },
        streaming: StreamingPayload {
            available: !resolution.streams.is_empty(),
            links: resolution
                .streams
                .iter()
                .map(|stream| StreamEntry {
                    resolution: stream.resolution.clone(),
                    kind: stream.tag.clone(),
                    url: stream.url.clone(),
                })
                .collect(),
        },
        player_links: player_links(download_url, primary_stream_url),
    })
}
