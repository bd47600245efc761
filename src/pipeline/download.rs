//! Batch download with size floor, retries and checkpoints.
//!
//! Per image:
//!
//! ```text
//! exists in store ──yes──> SkippedExists
//!      │no
//!   probe size ──< floor──> SkippedTooSmall   (size_bytes, too_small = true)
//!      │unknown / >= floor / probe error
//!   fetch ─> validate ─> write ──ok──> Downloaded (size_bytes = actual)
//!      └── error: retry with backoff, then Failed (nothing stored)
//! ```
//!
//! The index is handed to the checkpoint callback every
//! `checkpoint_interval` processed images and once more at the end unless the
//! last image already triggered one, so an interrupted run resumes from the
//! last checkpoint.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DownloadConfig;
use crate::error::Result;
use crate::fetch::retry::run_with_retry;
use crate::fetch::validate::validate_image;
use crate::fetch::{Fetcher, RetryPolicy};
use crate::index::Index;
use crate::model::image::ImageRecord;
use crate::store::ContentStore;

/// What happened to one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// Already present in the store; nothing was requested.
    SkippedExists,
    /// The probe reported this many bytes, below the floor.
    SkippedTooSmall(u64),
    /// Fetched, stored and validated; carries the byte count.
    Downloaded(u64),
    /// Every attempt failed; carries the last error.
    Failed(String),
}

/// Counters for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloadStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped_exists: usize,
    pub skipped_too_small: usize,
}

impl DownloadStats {
    fn record(&mut self, outcome: &ImageOutcome) {
        match outcome {
            ImageOutcome::SkippedExists => self.skipped_exists += 1,
            ImageOutcome::SkippedTooSmall(_) => self.skipped_too_small += 1,
            ImageOutcome::Downloaded(_) => self.success += 1,
            ImageOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Images processed so far.
    pub fn processed(&self) -> usize {
        self.success + self.failed + self.skipped_exists + self.skipped_too_small
    }
}

/// Result of [`Downloader::run`].
#[derive(Debug)]
pub struct DownloadOutcome {
    /// The enriched index.
    pub index: Index,
    pub stats: DownloadStats,
    /// Local filenames that could not be downloaded, in processing order.
    pub failures: Vec<String>,
}

/// Receives the index at each checkpoint.
pub type Checkpoint<'a> = dyn FnMut(&Index, &DownloadStats) -> Result<()> + 'a;

/// Downloads every image of an index into a [`ContentStore`].
pub struct Downloader<F, S> {
    fetcher: F,
    store: S,
    retry: RetryPolicy,
    min_size_bytes: u64,
    checkpoint_interval: usize,
    limit: Option<usize>,
}

impl<F: Fetcher, S: ContentStore> Downloader<F, S> {
    pub fn new(fetcher: F, store: S, config: &DownloadConfig) -> Self {
        Self {
            fetcher,
            store,
            retry: RetryPolicy::from_config(config),
            min_size_bytes: config.min_size_bytes,
            checkpoint_interval: config.checkpoint_interval,
            limit: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Process at most `limit` images, in index order.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Run the batch over `index`.
    ///
    /// Item failures are collected, never raised. A failing checkpoint is
    /// logged and the batch continues.
    pub fn run(
        &self,
        mut index: Index,
        checkpoint: &mut Checkpoint<'_>,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> DownloadOutcome {
        let mut positions: Vec<(usize, usize)> = index
            .image_counts()
            .into_iter()
            .enumerate()
            .flat_map(|(m, n)| (0..n).map(move |i| (m, i)))
            .collect();
        if let Some(limit) = self.limit {
            positions.truncate(limit);
        }

        let total = positions.len();
        info!(total, "Starting download batch");

        let mut stats = DownloadStats {
            total,
            ..DownloadStats::default()
        };
        let mut failures = Vec::new();
        let mut last_saved = None;

        for (done, (m, i)) in positions.into_iter().enumerate() {
            if let Some(image) = index.get_index_mut(m).and_then(|msg| msg.images.get_mut(i)) {
                let outcome = self.process(image);
                if matches!(outcome, ImageOutcome::Failed(_)) {
                    failures.push(image.local_filename.clone());
                }
                stats.record(&outcome);
            }

            let processed = done + 1;
            if let Some(cb) = progress {
                cb(processed as u64, total as u64);
            }
            if self.checkpoint_interval > 0 && processed % self.checkpoint_interval == 0 {
                save_checkpoint(checkpoint, &index, &stats);
                last_saved = Some(processed);
            }
        }
        if last_saved != Some(total) {
            save_checkpoint(checkpoint, &index, &stats);
        }

        info!(
            total = stats.total,
            success = stats.success,
            failed = stats.failed,
            skipped_exists = stats.skipped_exists,
            skipped_too_small = stats.skipped_too_small,
            "Download batch complete"
        );
        DownloadOutcome {
            index,
            stats,
            failures,
        }
    }

    /// Drive one image through the state machine, updating its record.
    pub fn process(&self, image: &mut ImageRecord) -> ImageOutcome {
        let key = image.local_filename.clone();
        if self.store.exists(&key) {
            debug!(file = %key, "Already downloaded");
            return ImageOutcome::SkippedExists;
        }

        match self.fetcher.probe(&image.url) {
            Ok(Some(size)) if size < self.min_size_bytes => {
                debug!(file = %key, size, "Below size floor");
                image.size_bytes = Some(size);
                image.too_small = true;
                return ImageOutcome::SkippedTooSmall(size);
            }
            Ok(Some(size)) => {
                image.size_bytes = Some(size);
                image.too_small = false;
            }
            Ok(None) => {}
            Err(e) => debug!(file = %key, error = %e, "Size probe failed, fetching anyway"),
        }

        let url = image.url.clone();
        match run_with_retry(&self.retry, &key, |_| self.fetch_and_store(&url, &key)) {
            Ok(size) => {
                info!(file = %key, size, "Downloaded");
                image.size_bytes = Some(size);
                image.too_small = false;
                ImageOutcome::Downloaded(size)
            }
            Err(e) => {
                warn!(file = %key, error = %e, "Download failed");
                ImageOutcome::Failed(e.to_string())
            }
        }
    }

    fn fetch_and_store(&self, url: &str, key: &str) -> Result<u64> {
        let bytes = self.fetcher.fetch(url)?;
        validate_image(&bytes)?;
        self.store.write(key, &bytes)?;
        Ok(bytes.len() as u64)
    }
}

fn save_checkpoint(checkpoint: &mut Checkpoint<'_>, index: &Index, stats: &DownloadStats) {
    match checkpoint(index, stats) {
        Ok(()) => debug!(processed = stats.processed(), "Checkpoint saved"),
        Err(e) => warn!(error = %e, "Checkpoint failed; continuing"),
    }
}
