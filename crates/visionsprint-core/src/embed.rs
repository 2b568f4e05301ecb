//! # Video Embeds
//!
//! Teams share their demo as a Google Drive or Google Docs link. Share links
//! cannot be framed directly, so they are rewritten to the `/preview` form the
//! showcase page embeds. Links on other hosts are kept as plain links.

use crate::VisionSprintError;
use crate::primitives::MAX_URL_LENGTH;
use url::Url;

const DRIVE_HOST: &str = "drive.google.com";
const DOCS_HOST: &str = "docs.google.com";

/// Google Docs editors that expose a `/preview` endpoint.
const DOCS_KINDS: [&str; 4] = ["document", "presentation", "spreadsheets", "forms"];

/// A validated demo link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoLink {
    /// The link in normalized form (lower-case scheme and host, default port dropped).
    pub url: String,
    /// Embeddable URL when the host is recognised.
    pub embed_url: Option<String>,
}

/// Validate a submitted video URL and derive its embed URL.
pub fn normalize_video_url(raw: &str) -> Result<VideoLink, VisionSprintError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(VisionSprintError::InvalidInput(
            "video url must not be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_URL_LENGTH {
        return Err(VisionSprintError::InvalidInput(format!(
            "video url length {} exceeds maximum {} bytes",
            trimmed.len(),
            MAX_URL_LENGTH
        )));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| VisionSprintError::InvalidInput(format!("invalid video url: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(VisionSprintError::InvalidInput(
            "video url must use http or https".to_string(),
        ));
    }
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| VisionSprintError::InvalidInput("video url has no host".to_string()))?;

    let embed_url = match host {
        DRIVE_HOST => drive_file_id(&parsed)
            .map(|id| format!("https://{}/file/d/{}/preview", DRIVE_HOST, id)),
        DOCS_HOST => docs_document(&parsed)
            .map(|(kind, id)| format!("https://{}/{}/d/{}/preview", DOCS_HOST, kind, id)),
        _ => None,
    };

    Ok(VideoLink {
        url: parsed.to_string(),
        embed_url,
    })
}

fn segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|split| split.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

fn valid_id(id: &str) -> Option<String> {
    let ok = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    ok.then(|| id.to_string())
}

/// `/file/d/<id>/...`, `/open?id=<id>`, `/uc?id=<id>`
fn drive_file_id(url: &Url) -> Option<String> {
    match segments(url).as_slice() {
        ["file", "d", id, ..] => valid_id(id),
        ["open"] | ["uc"] => url
            .query_pairs()
            .find(|(key, _)| key == "id")
            .and_then(|(_, value)| valid_id(&value)),
        _ => None,
    }
}

/// `/<kind>/d/<id>/...` and `/<kind>/u/<n>/d/<id>/...`
fn docs_document(url: &Url) -> Option<(&'static str, String)> {
    let segments = segments(url);
    let (kind, id) = match segments.as_slice() {
        [kind, "d", id, ..] => (*kind, *id),
        [kind, "u", _, "d", id, ..] => (*kind, *id),
        _ => return None,
    };
    let kind = DOCS_KINDS.iter().find(|k| **k == kind)?;
    valid_id(id).map(|id| (*kind, id))
}
