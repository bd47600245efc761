//! Filename blacklist for non-content images.
//!
//! Attachment URLs also carry tracking pixels, emoticons, signature logos and
//! Office temp artifacts. These are rejected by exact name or by pattern
//! before they ever reach the index.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

use crate::error::{CurateError, Result};

/// Exact filenames that are never content.
const BLACKLIST_NAMES: &[&str] = &[
    "blank.gif",
    "spacer.gif",
    "pixel.gif",
    "clear.gif",
    "transparent.gif",
    "dot.gif",
    "1x1.gif",
    "empty.gif",
    "ATT00001.gif",
    "oledata.mso",
];

/// Case-insensitive filename patterns.
const BLACKLIST_PATTERNS: &[&str] = &[
    // hex-named tracking assets, e.g. 3F2A.gif, 0d4e7f.png: four or more hex
    // characters including a digit, so words like cafe.png pass. Each branch
    // places the first digit at index 0, 1, 2 or later.
    r"^(?:[0-9][0-9a-f]{3,}|[0-9a-f][0-9][0-9a-f]{2,}|[0-9a-f]{2}[0-9][0-9a-f]+|[0-9a-f]{3,}[0-9][0-9a-f]*)\.(gif|png)$",
    // client/camera placeholder names with no content context
    r"^(image|img|photo|picture)\d{0,3}\.(gif|bmp)$",
    // emoticons and smileys
    r"^(emoticon|smiley|smile|emoji|wink)([_-]\w*|\d*)\.(gif|png)$",
    // signature graphics and logos
    r"^(sig|signature|logo|banner)([_-]\w*|\d*)\.(gif|png|jpe?g)$",
    // Word / OLE temp artifacts
    r"^~wrd\d+\.(jpe?g|gif|png|bmp)$",
    r"^ole\d*\.(bmp|gif|png|jpe?g)$",
];

/// Exact names plus regexes; a filename matching either is rejected.
#[derive(Debug, Clone)]
pub struct Blacklist {
    names: HashSet<String>,
    patterns: Vec<Regex>,
}

impl Default for Blacklist {
    fn default() -> Self {
        // The built-in patterns are constants; they always compile.
        Self::with_extra(&[], &[]).expect("built-in blacklist patterns are valid")
    }
}

impl Blacklist {
    /// Built-in blacklist extended with configured names and patterns.
    ///
    /// An extra pattern that is not a valid regex is a configuration error.
    pub fn with_extra(names: &[String], patterns: &[String]) -> Result<Self> {
        let names = BLACKLIST_NAMES
            .iter()
            .map(|s| s.to_string())
            .chain(names.iter().cloned())
            .collect();

        let patterns = BLACKLIST_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .chain(patterns.iter().cloned())
            .map(|p| {
                RegexBuilder::new(&p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| CurateError::InvalidPattern {
                        pattern: p.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { names, patterns })
    }

    /// Whether a decoded filename identifies a non-content image.
    pub fn is_blacklisted(&self, filename: &str) -> bool {
        self.names.contains(filename) || self.patterns.iter().any(|re| re.is_match(filename))
    }
}
