//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$IMGCURATE_CONFIG` (environment variable)
//! 2. `~/.config/imgcurate/config.toml` (Linux/macOS)
//!    `%APPDATA%\imgcurate\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! Each pipeline stage receives its own section by value; nothing here is global.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Extraction (archive -> index) settings.
    pub extract: ExtractConfig,
    /// Batch download settings.
    pub download: DownloadConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Only URLs starting with this prefix are treated as attachments.
    pub attachment_prefix: String,
    /// File extension of archive units inside a directory.
    pub archive_extension: String,
    /// Merge keywords derived from the message subject into every image.
    pub subject_keywords: bool,
    /// Extra keyword stopwords (site names and similar noise).
    pub stopwords: Vec<String>,
    /// Extra exact filenames to reject, on top of the built-in blacklist.
    pub blacklist_names: Vec<String>,
    /// Extra filename regexes to reject, on top of the built-in blacklist.
    pub blacklist_patterns: Vec<String>,
}

/// Batch download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Directory that receives downloaded images.
    pub images_dir: Option<PathBuf>,
    /// Assets whose probed size is below this many bytes are never fetched.
    pub min_size_bytes: u64,
    /// Fetch attempts per image (including the first).
    pub max_attempts: u32,
    /// Base of the exponential backoff, in seconds.
    pub backoff_base_secs: u64,
    /// Upper bound for a single backoff sleep, in seconds.
    pub max_backoff_secs: u64,
    /// Persist the index every this many processed images.
    pub checkpoint_interval: usize,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            attachment_prefix: "https://groups.google.com/group/cozy_builders/attach/"
                .to_string(),
            archive_extension: "md".to_string(),
            subject_keywords: true,
            stopwords: vec!["cozy".to_string()],
            blacklist_names: Vec::new(),
            blacklist_patterns: Vec::new(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            images_dir: None,
            min_size_bytes: 3072,
            max_attempts: 3,
            backoff_base_secs: 1,
            max_backoff_secs: 60,
            checkpoint_interval: 10,
            timeout_secs: 30,
            user_agent: concat!("imgcurate/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl DownloadConfig {
    /// Per-request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("IMGCURATE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("imgcurate").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("imgcurate")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("imgcurate.log")
}
