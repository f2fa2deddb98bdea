//! File-listing recovery from share-page HTML and upstream JSON.
//!
//! Newer page templates embed the listing as a JSON array inside a script
//! blob; the surrounding marker differs by template version. Extraction tries
//! each marker in order and balanced-scans the array so nested objects and
//! bracket characters inside string values do not truncate it. A blob that
//! matches a marker but fails to parse as a listing is skipped, not fatal.
//!
//! The same wire entry shape comes back from the listing APIs, so the raw
//! entry type and its tolerant `fs_id` deserializer live here too.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use tracing::{debug, trace};

use super::compile_static_regex;

// ==================== File categories ====================

/// Coarse file type reported by the host as a numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Video,
    Audio,
    Image,
    Document,
    Archive,
    Other,
}

impl FileCategory {
    /// Maps the upstream numeric code. Unknown codes collapse to [`Other`].
    ///
    /// [`Other`]: FileCategory::Other
    #[must_use]
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => Self::Video,
            2 => Self::Audio,
            3 => Self::Image,
            4 => Self::Document,
            5 => Self::Archive,
            _ => Self::Other,
        }
    }

    /// The numeric code clients key their type maps on.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Video => 1,
            Self::Audio => 2,
            Self::Image => 3,
            Self::Document => 4,
            Self::Archive => 5,
            Self::Other => 6,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Video => "Video",
            Self::Audio => "Audio",
            Self::Image => "Image",
            Self::Document => "Document",
            Self::Archive => "Archive",
            Self::Other => "Other",
        }
    }
}

// ==================== Wire entries ====================

/// Accepts a JSON number or a numeric string. The host is inconsistent about
/// which one it sends for ids and sizes.
pub(crate) fn string_or_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrU64 {
        Str(String),
        Num(u64),
    }

    match StringOrU64::deserialize(deserializer)? {
        StringOrU64::Str(s) => s.parse().map_err(D::Error::custom),
        StringOrU64::Num(n) => Ok(n),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ThumbSet {
    #[serde(default)]
    url_1: Option<String>,
    #[serde(default)]
    url_2: Option<String>,
    #[serde(default)]
    url_3: Option<String>,
    #[serde(default)]
    icon: Option<String>,
}

impl ThumbSet {
    /// Largest rendition available.
    fn best(self) -> Option<String> {
        self.url_3.or(self.url_2).or(self.url_1).or(self.icon)
    }
}

/// One file entry as the host serializes it, shared by the inline listing and
/// the listing APIs. Every field tolerates absence and the id/size fields
/// tolerate string encoding.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RemoteFileEntry {
    #[serde(
        rename = "fs_id",
        alias = "fsid",
        default,
        deserialize_with = "string_or_u64"
    )]
    pub(crate) fs_id: u64,
    #[serde(default)]
    pub(crate) server_filename: String,
    #[serde(default, deserialize_with = "string_or_u64")]
    pub(crate) size: u64,
    #[serde(default, deserialize_with = "string_or_u64")]
    pub(crate) category: u64,
    #[serde(default, deserialize_with = "string_or_u64")]
    pub(crate) isdir: u64,
    #[serde(default)]
    pub(crate) dlink: Option<String>,
    #[serde(default)]
    pub(crate) md5: Option<String>,
    #[serde(default)]
    pub(crate) thumbs: Option<ThumbSet>,
}

// ==================== Domain records ====================

/// A file in the share, normalized from whatever wire shape produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub fs_id: u64,
    pub name: String,
    pub size_bytes: u64,
    pub category: FileCategory,
    pub is_directory: bool,
    /// Direct link embedded in the listing, when the host includes one.
    pub dlink: Option<String>,
    pub md5: Option<String>,
    pub thumbnail: Option<String>,
}

impl FileRecord {
    #[must_use]
    pub fn is_video(&self) -> bool {
        self.category == FileCategory::Video
    }
}

impl From<RemoteFileEntry> for FileRecord {
    fn from(entry: RemoteFileEntry) -> Self {
        Self {
            fs_id: entry.fs_id,
            name: entry.server_filename,
            size_bytes: entry.size,
            category: FileCategory::from_code(entry.category),
            is_directory: entry.isdir != 0,
            dlink: entry.dlink.filter(|link| !link.is_empty()),
            md5: entry.md5.filter(|sum| !sum.is_empty()),
            thumbnail: entry.thumbs.and_then(ThumbSet::best),
        }
    }
}

/// The file the response describes: the first non-directory entry, falling
/// back to the first entry of any kind.
#[must_use]
pub fn primary_file(files: &[FileRecord]) -> Option<&FileRecord> {
    files
        .iter()
        .find(|file| !file.is_directory)
        .or_else(|| files.first())
}

// ==================== Inline listing extraction ====================

static LISTING_MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile_static_regex(r#""file_list"\s*:\s*\["#),
        compile_static_regex(r#""fileList"\s*:\s*\["#),
        compile_static_regex(r"window\.shareList\s*=\s*\["),
        compile_static_regex(r#""list"\s*:\s*\["#),
    ]
});

/// Pulls the embedded file listing out of share-page HTML, if this template
/// version carries one. Returns an empty vec when no marker yields a
/// plausible listing.
#[tracing::instrument(skip(html), fields(html_len = html.len()))]
#[must_use]
pub fn extract_listing(html: &str) -> Vec<FileRecord> {
    for marker in LISTING_MARKERS.iter() {
        for found in marker.find_iter(html) {
            // The marker pattern ends on the opening bracket.
            let Some(raw) = scan_json_array(&html[found.end() - 1..]) else {
                continue;
            };
            match serde_json::from_str::<Vec<RemoteFileEntry>>(raw) {
                Ok(entries) if is_plausible_listing(&entries) => {
                    debug!(
                        marker = marker.as_str(),
                        count = entries.len(),
                        "inline file listing extracted"
                    );
                    return entries.into_iter().map(FileRecord::from).collect();
                }
                Ok(_) => {
                    trace!(marker = marker.as_str(), "matched array is not a file listing");
                }
                Err(err) => {
                    trace!(
                        marker = marker.as_str(),
                        error = %err,
                        "matched array failed to parse"
                    );
                }
            }
        }
    }
    debug!("no inline file listing in page");
    Vec::new()
}

/// Every field is optional on the wire, so any object array deserializes.
/// Require at least one entry that looks like an actual file.
fn is_plausible_listing(entries: &[RemoteFileEntry]) -> bool {
    entries
        .iter()
        .any(|entry| entry.fs_id != 0 || !entry.server_filename.is_empty())
}

/// Returns the balanced JSON array starting at the first byte of `text`,
/// tracking string literals so brackets inside values do not end the scan.
fn scan_json_array(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, &byte) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[..=idx]);
                }
            }
            _ => {}
        }
    }
    None
}
