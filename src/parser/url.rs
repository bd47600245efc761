//! Image URL discovery and attachment URL parsing.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Scheme, path and an image extension, plus an optional query. Stops at
/// whitespace and the markdown delimiters `)` and `]`.
static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://[^\s)\]]+\.(?:jpg|jpeg|png|gif|bmp)(?:\?[^\s)\]]*)?")
        .expect("valid regex")
});

/// Filename used when the URL path has no usable last segment.
const UNKNOWN_FILENAME: &str = "unknown";

/// The pieces of an attachment URL that extraction needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUrl {
    /// The URL as found in the text.
    pub url: String,
    /// Value of the `part` query parameter, or empty.
    pub part: String,
    /// Percent-decoded last path segment.
    pub filename: String,
}

/// Find every image URL in `text`, deduplicated and sorted by string value.
///
/// Sorting keeps image order stable across re-extraction, which matters
/// because dedupe keeps the first image of each size.
pub fn find_image_urls(text: &str) -> Vec<String> {
    IMAGE_URL
        .find_iter(text)
        .map(|m| m.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Parse an attachment URL into `(url, part, filename)`.
///
/// Returns `None` when the string is not a valid absolute URL.
pub fn parse_attachment_url(raw: &str) -> Option<AttachmentUrl> {
    let parsed = Url::parse(raw).ok()?;

    let filename = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(percent_decode)
        .unwrap_or_else(|| UNKNOWN_FILENAME.to_string());

    let part = parsed
        .query_pairs()
        .find(|(k, _)| k == "part")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default();

    Some(AttachmentUrl {
        url: raw.to_string(),
        part,
        filename,
    })
}

/// Percent-decode a path segment, falling back to lossy decoding for
/// sequences that are not valid UTF-8.
fn percent_decode(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(segment.as_bytes()))
            .into_owned(),
    }
}
