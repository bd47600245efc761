//! Image records.

use serde::{Deserialize, Serialize};

/// One image attachment referenced by a message.
///
/// Created by extraction, enriched by the downloader (`size_bytes`,
/// `too_small`), and possibly dropped by dedupe or removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Source URL exactly as it appeared in the archive.
    pub url: String,

    /// Dotted position of the attachment inside its message (e.g. `"0.2"`).
    /// Empty when the URL carries no `part` parameter.
    #[serde(default)]
    pub part: String,

    /// Original basename, percent-decoded.
    pub filename: String,

    /// On-disk key: `{message_id}_part{part}_{filename}` with dots in the part
    /// and spaces and path separators in the filename replaced by underscores.
    pub local_filename: String,

    /// Lowercase search keywords, filename-derived first.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Byte size from the size probe or the completed download.
    #[serde(default)]
    pub size_bytes: Option<u64>,

    /// Set when the probe reported a size below the download floor.
    #[serde(default)]
    pub too_small: bool,

    /// Fields written by other tools, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ImageRecord {
    /// Build a fresh record as extraction produces it (no download metadata).
    pub fn new(
        url: impl Into<String>,
        part: impl Into<String>,
        filename: impl Into<String>,
        local_filename: impl Into<String>,
        keywords: Vec<String>,
    ) -> Self {
        Self {
            url: url.into(),
            part: part.into(),
            filename: filename.into(),
            local_filename: local_filename.into(),
            keywords,
            size_bytes: None,
            too_small: false,
            extra: serde_json::Map::new(),
        }
    }
}

/// Compute the deterministic local filename for an image.
///
/// Preserves the case of both the message id and the original filename.
/// A decoded `%2F` or `%5C` never turns the key into a path.
pub fn local_filename(message_id: &str, part: &str, filename: &str) -> String {
    let part = part.replace('.', "_");
    let filename = filename.replace([' ', '/', '\\'], "_");
    format!("{message_id}_part{part}_{filename}")
}
