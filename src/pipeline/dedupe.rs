//! Per-message pruning of duplicate and missing downloads.
//!
//! Two images of the same message whose stored content has the same byte
//! size are treated as duplicates; the earlier one is kept. Images whose
//! content cannot be inspected are dropped as missing. Messages are never
//! removed here, even when their image list ends up empty.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::index::Index;
use crate::model::message::MessageRecord;
use crate::store::ContentStore;

/// Counters for one message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupeStats {
    pub duplicates_removed: usize,
    pub missing_removed: usize,
}

impl DedupeStats {
    pub fn changed(&self) -> bool {
        self.duplicates_removed + self.missing_removed > 0
    }
}

/// A message that lost at least one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffectedMessage {
    pub message_id: String,
    pub subject: String,
    pub duplicates_removed: usize,
    pub missing_removed: usize,
}

/// Aggregate report for a whole index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupeReport {
    pub images_before: usize,
    pub images_after: usize,
    pub duplicates_removed: usize,
    pub missing_removed: usize,
    pub messages_affected: usize,
    pub affected: Vec<AffectedMessage>,
}

/// Prune one message against `store`, keeping the first image of each size.
pub fn dedupe_message(
    mut message: MessageRecord,
    store: &dyn ContentStore,
) -> (MessageRecord, DedupeStats) {
    let mut stats = DedupeStats::default();
    let mut seen_sizes = HashSet::new();

    message.images.retain(|image| {
        let key = image.local_filename.as_str();
        let size = if key.is_empty() {
            None
        } else {
            store.size(key).ok()
        };
        match size {
            None => {
                debug!(file = %key, "Missing download");
                stats.missing_removed += 1;
                false
            }
            Some(size) if !seen_sizes.insert(size) => {
                debug!(file = %key, size, "Duplicate by size");
                stats.duplicates_removed += 1;
                false
            }
            Some(_) => true,
        }
    });

    (message, stats)
}

/// Prune every message of `index`, preserving key order.
pub fn dedupe_index(
    index: Index,
    store: &dyn ContentStore,
    progress: Option<&dyn Fn(u64, u64)>,
) -> (Index, DedupeReport) {
    let mut report = DedupeReport {
        images_before: index.image_count(),
        ..DedupeReport::default()
    };
    let total = index.len() as u64;

    let mut pruned = Index::new();
    for (i, (key, message)) in index.into_iter().enumerate() {
        let (message, stats) = dedupe_message(message, store);
        if stats.changed() {
            report.duplicates_removed += stats.duplicates_removed;
            report.missing_removed += stats.missing_removed;
            report.affected.push(AffectedMessage {
                message_id: key.clone(),
                subject: message.metadata.subject.clone(),
                duplicates_removed: stats.duplicates_removed,
                missing_removed: stats.missing_removed,
            });
        }
        pruned.insert_keyed(key, message);
        if let Some(cb) = progress {
            cb(i as u64 + 1, total);
        }
    }

    report.messages_affected = report.affected.len();
    report.images_after = pruned.image_count();
    info!(
        before = report.images_before,
        after = report.images_after,
        duplicates = report.duplicates_removed,
        missing = report.missing_removed,
        "Dedupe complete"
    );
    (pruned, report)
}
