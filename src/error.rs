//! Centralized error types for imgcurate.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the imgcurate library.
#[derive(Error, Debug)]
pub enum CurateError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The index file does not exist.
    #[error("Index file not found: {0}")]
    IndexNotFound(PathBuf),

    /// The index file could not be decoded.
    #[error("Corrupt index '{path}': {reason}")]
    InvalidIndex { path: PathBuf, reason: String },

    /// A removal list named on the command line does not exist.
    #[error("Removal list not found: {0}")]
    RemovalListNotFound(PathBuf),

    /// The archive file or directory does not exist.
    #[error("Archive path not found: {0}")]
    ArchiveNotFound(PathBuf),

    /// A configured blacklist pattern is not a valid regex.
    #[error("Invalid blacklist pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// A wrapper page was returned but it embeds no image.
    #[error("No image found in wrapper page for {0}")]
    NoImageInWrapper(String),

    /// An inline `data:` image could not be decoded.
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    /// A URL could not be parsed or joined.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Downloaded bytes do not decode as an image.
    #[error("Not a valid image: {0}")]
    InvalidImage(String),

    /// JSON serialization failure while writing the index.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for `Result<T, CurateError>`.
pub type Result<T> = std::result::Result<T, CurateError>;

impl CurateError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare; prefer `CurateError::io`).
impl From<std::io::Error> for CurateError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
