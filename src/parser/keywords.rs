//! Keyword derivation from filenames and subjects.
//!
//! A name is cut at camelCase transitions and at every non-alphanumeric
//! character (`_`, `-`, space, `.` and friends). Tokens that carry no search
//! value are dropped: stopwords, camera counters (`DSC01234`, `IMG_5512`),
//! pure numbers, hex-looking ids, and short fragments that are not all
//! uppercase. Surviving
//! tokens are lowercased and deduplicated in order of first appearance.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Generic image, size and quality terms plus common English words.
const STOPWORDS: &[&str] = &[
    // image / file terms
    "image", "images", "img", "pic", "pics", "picture", "pictures", "photo", "photos", "jpg",
    "jpeg", "png", "gif", "bmp", "file", "scan", "scanned", "screenshot", "attachment",
    "untitled", "copy", "thumb", "thumbnail",
    // size / quality terms
    "small", "medium", "large", "big", "full", "size", "resized", "resize", "hires", "lowres",
    "res", "low", "high", "quality", "web", "email", "final", "edit", "edited", "version", "ver",
    "new", "old", "orig", "original",
    // camera prefixes seen on their own after splitting
    "dsc", "dscn", "dscf", "pict", "imgp", "dcp", "cimg",
    // common English words
    "the", "and", "for", "with", "from", "this", "that", "these", "those", "are", "was", "were",
    "has", "have", "had", "not", "but", "all", "any", "can", "its", "our", "your", "you", "they",
    "them", "his", "her", "she", "him", "one", "two", "of", "a", "an", "to", "in", "on", "at",
    "is", "it", "my", "me", "we", "re", "fw", "fwd", "by", "or", "as", "be", "so", "no", "up",
    "out", "into", "over", "about", "more", "some",
];

/// `fooBar` -> `foo Bar`.
static CAMEL_LOWER_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid regex"));

/// `HTMLParser` -> `HTML Parser`.
static CAMEL_ACRONYM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("valid regex"));

/// Camera and phone counters: `dsc01234`, `img_5512`, `p1010001`, `gopr0042`.
static CAMERA_COUNTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(dsc|dscn|dscf|img|imgp|pict|pic|p|dcp|cimg|sam|gopr|mvc)_?\d+$")
        .expect("valid regex")
});

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").expect("valid regex"));

static HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{6,}$").expect("valid regex"));

/// Derives keywords with the built-in stopwords plus configured extras.
#[derive(Debug, Clone)]
pub struct KeywordDeriver {
    stopwords: HashSet<String>,
}

impl Default for KeywordDeriver {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl KeywordDeriver {
    /// Built-in stopwords extended with `extra` (matched case-insensitively).
    pub fn new(extra: &[String]) -> Self {
        let stopwords = STOPWORDS
            .iter()
            .map(|s| s.to_string())
            .chain(extra.iter().map(|s| s.to_lowercase()))
            .collect();
        Self { stopwords }
    }

    /// Keywords from a filename; the extension is not a keyword.
    pub fn from_filename(&self, filename: &str) -> Vec<String> {
        let stem = Path::new(filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_string());
        self.from_text(&stem)
    }

    /// Keywords from free text such as a subject line.
    pub fn from_text(&self, text: &str) -> Vec<String> {
        let spaced = CAMEL_ACRONYM.replace_all(text, "$1 $2");
        let spaced = CAMEL_LOWER_UPPER.replace_all(&spaced, "$1 $2");

        let mut seen = HashSet::new();
        let mut keywords = Vec::new();
        for token in spaced.split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() || !self.keep(token) {
                continue;
            }
            let lower = token.to_lowercase();
            if seen.insert(lower.clone()) {
                keywords.push(lower);
            }
        }
        keywords
    }

    fn keep(&self, token: &str) -> bool {
        let lower = token.to_lowercase();
        if self.stopwords.contains(&lower) {
            return false;
        }
        if CAMERA_COUNTER.is_match(&lower) || NUMERIC.is_match(&lower) {
            return false;
        }
        // Hex-looking ids need at least one digit so words like "facade" survive.
        if HEX.is_match(&lower) && lower.chars().any(|c| c.is_ascii_digit()) {
            return false;
        }
        if token.chars().count() < 3 {
            return token.chars().all(|c| c.is_uppercase());
        }
        true
    }
}

/// Append `secondary` to `primary`, skipping case-insensitive duplicates.
pub fn merge_keywords(primary: Vec<String>, secondary: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = primary.iter().map(|k| k.to_lowercase()).collect();
    let mut merged = primary;
    for keyword in secondary {
        if seen.insert(keyword.to_lowercase()) {
            merged.push(keyword);
        }
    }
    merged
}
