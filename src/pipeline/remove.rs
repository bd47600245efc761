//! Removal reconciliation.
//!
//! Removal lists are plain text files with one `local_filename` per line.
//! Matching is exact and case-sensitive. A message left without images is
//! dropped from the index.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CurateError, Result};
use crate::index::Index;

/// Counters for one removal run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemovalStats {
    pub images_removed: usize,
    /// Messages that lost at least one image, including ones then dropped.
    pub messages_affected: usize,
    /// Messages dropped because no image remained.
    pub messages_removed: usize,
}

/// Read and union the removal lists.
///
/// Every path is checked before any is read, so a missing list fails the
/// run without partial work.
pub fn load_removal_lists(paths: &[PathBuf]) -> Result<HashSet<String>> {
    if let Some(missing) = paths.iter().find(|p| !p.is_file()) {
        return Err(CurateError::RemovalListNotFound(missing.clone()));
    }

    let mut names = HashSet::new();
    for path in paths {
        let text = std::fs::read_to_string(path).map_err(|e| CurateError::io(path, e))?;
        let before = names.len();
        names.extend(parse_removal_list(&text));
        debug!(
            path = %path.display(),
            added = names.len() - before,
            "Loaded removal list"
        );
    }
    Ok(names)
}

/// Non-blank, trimmed lines of a removal list.
pub fn parse_removal_list(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}

/// Drop every image whose `local_filename` is in `removal`, and every message
/// left without images.
pub fn remove_images(index: Index, removal: &HashSet<String>) -> (Index, RemovalStats) {
    let mut stats = RemovalStats::default();
    let mut kept = Index::new();

    for (key, mut message) in index {
        let before = message.images.len();
        message
            .images
            .retain(|image| !removal.contains(&image.local_filename));
        let removed = before - message.images.len();

        stats.images_removed += removed;
        if removed > 0 {
            stats.messages_affected += 1;
        }
        if message.images.is_empty() {
            debug!(message_id = %key, "Dropping message with no images left");
            stats.messages_removed += 1;
            continue;
        }
        kept.insert_keyed(key, message);
    }

    info!(
        images_removed = stats.images_removed,
        messages_affected = stats.messages_affected,
        messages_removed = stats.messages_removed,
        "Removal complete"
    );
    (kept, stats)
}
