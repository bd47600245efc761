//! Archive -> index.
//!
//! Every unit is scanned for metadata anchors and image URLs. URLs outside
//! the attachment prefix and blacklisted filenames are dropped; survivors
//! become [`ImageRecord`]s with a deterministic local filename and derived
//! keywords. Units without an id or without surviving images are skipped.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ExtractConfig;
use crate::error::Result;
use crate::index::Index;
use crate::model::image::{local_filename, ImageRecord};
use crate::model::message::MessageRecord;
use crate::parser::archive;
use crate::parser::blacklist::Blacklist;
use crate::parser::keywords::{merge_keywords, KeywordDeriver};
use crate::parser::metadata::extract_metadata;
use crate::parser::url::{find_image_urls, parse_attachment_url};

/// Counters for one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub units_scanned: usize,
    pub messages_indexed: usize,
    /// Messages whose id was already in the index; the newer one won.
    pub messages_replaced: usize,
    pub images_indexed: usize,
    pub skipped_no_id: usize,
    pub skipped_no_images: usize,
    pub unreadable: usize,
    pub urls_foreign: usize,
    pub urls_blacklisted: usize,
}

/// Turns archive text into index records.
#[derive(Debug, Clone)]
pub struct Extractor {
    attachment_prefix: String,
    archive_extension: String,
    subject_keywords: bool,
    blacklist: Blacklist,
    keywords: KeywordDeriver,
}

impl Extractor {
    /// Build an extractor; fails only on an invalid configured pattern.
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        Ok(Self {
            attachment_prefix: config.attachment_prefix.clone(),
            archive_extension: config.archive_extension.clone(),
            subject_keywords: config.subject_keywords,
            blacklist: Blacklist::with_extra(&config.blacklist_names, &config.blacklist_patterns)?,
            keywords: KeywordDeriver::new(&config.stopwords),
        })
    }

    /// Extract one message. Returns `None` (and counts why) when the text has
    /// no message id or no image survives filtering.
    pub fn extract_message(&self, text: &str, stats: &mut ExtractStats) -> Option<MessageRecord> {
        let metadata = extract_metadata(text);
        if metadata.message_id.is_empty() {
            stats.skipped_no_id += 1;
            return None;
        }

        let subject_keywords = if self.subject_keywords {
            self.keywords.from_text(&metadata.subject)
        } else {
            Vec::new()
        };

        let mut images = Vec::new();
        for url in find_image_urls(text) {
            if !url.starts_with(&self.attachment_prefix) {
                stats.urls_foreign += 1;
                continue;
            }
            let Some(attachment) = parse_attachment_url(&url) else {
                debug!(url = %url, "Unparseable attachment URL");
                stats.urls_foreign += 1;
                continue;
            };
            if self.blacklist.is_blacklisted(&attachment.filename) {
                debug!(filename = %attachment.filename, "Blacklisted");
                stats.urls_blacklisted += 1;
                continue;
            }

            let keywords = merge_keywords(
                self.keywords.from_filename(&attachment.filename),
                subject_keywords.clone(),
            );
            let local = local_filename(&metadata.message_id, &attachment.part, &attachment.filename);
            images.push(ImageRecord::new(
                attachment.url,
                attachment.part,
                attachment.filename,
                local,
                keywords,
            ));
        }

        if images.is_empty() {
            debug!(message_id = %metadata.message_id, "No attachment images");
            stats.skipped_no_images += 1;
            return None;
        }
        Some(MessageRecord::new(metadata, images))
    }

    /// Build a fresh index from an archive file or directory.
    pub fn build_index(
        &self,
        path: &Path,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<(Index, ExtractStats)> {
        self.merge_into(path, Index::new(), progress)
    }

    /// Extract an archive into an existing index.
    ///
    /// Messages found again replace their old record in place, but download
    /// enrichment (`size_bytes`, `too_small` and unknown fields) carries over
    /// for images whose local filename is unchanged.
    pub fn merge_into(
        &self,
        path: &Path,
        mut index: Index,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<(Index, ExtractStats)> {
        let units = archive::list_units(path, &self.archive_extension)?;
        info!(path = %path.display(), units = units.len(), "Extracting archive");

        let total = units.len() as u64;
        let mut stats = ExtractStats::default();
        for (i, unit) in units.iter().enumerate() {
            stats.units_scanned += 1;
            match archive::read_unit(unit) {
                Ok(text) => match self.extract_message(&text, &mut stats) {
                    Some(record) => {
                        stats.images_indexed += record.images.len();
                        stats.messages_indexed += 1;
                        if merge_record(&mut index, record) {
                            stats.messages_replaced += 1;
                        }
                    }
                    None => debug!(unit = %unit.display(), "Unit skipped"),
                },
                Err(e) => {
                    warn!(unit = %unit.display(), error = %e, "Skipping unreadable unit");
                    stats.unreadable += 1;
                }
            }
            if let Some(cb) = progress {
                cb(i as u64 + 1, total);
            }
        }

        info!(
            messages = stats.messages_indexed,
            images = stats.images_indexed,
            skipped_no_id = stats.skipped_no_id,
            skipped_no_images = stats.skipped_no_images,
            "Extraction complete"
        );
        Ok((index, stats))
    }
}

/// Insert `record`, carrying download enrichment over from the record it
/// replaces. Returns `true` when an existing record was replaced.
pub fn merge_record(index: &mut Index, mut record: MessageRecord) -> bool {
    let Some(previous) = index.get(record.message_id()) else {
        index.insert(record);
        return false;
    };

    let mut known: HashMap<&str, &ImageRecord> = HashMap::new();
    for image in &previous.images {
        known.entry(image.local_filename.as_str()).or_insert(image);
    }
    for image in &mut record.images {
        if let Some(old) = known.get(image.local_filename.as_str()) {
            image.size_bytes = old.size_bytes;
            image.too_small = old.too_small;
            for (key, value) in &old.extra {
                image.extra.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
    }
    for (key, value) in &previous.extra {
        record.extra.entry(key.clone()).or_insert_with(|| value.clone());
    }

    debug!(message_id = %record.message_id(), "Replacing existing message");
    index.insert(record);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "https://groups.google.com/group/cozy_builders/attach/";

    fn extractor() -> Extractor {
        Extractor::new(&ExtractConfig::default()).unwrap()
    }

    fn unit(id: &str, subject: &str, urls: &[&str]) -> String {
        let mut text = format!(
            "[Original Message ID:{id}]\n# {subject}\n### ted davis\n> Feb 11, 2011, 2:21:35 AM\n\nBody text.\n\n"
        );
        for url in urls {
            text.push_str(&format!("![img]({url})\n"));
        }
        text
    }

    #[test]
    fn test_extract_message_filters_and_names() {
        let text = unit(
            "M1",
            "Wing spar",
            &[
                &format!("{PREFIX}abc/Wing%20Spar.jpg?part=0.2"),
                &format!("{PREFIX}abc/3F2A.gif?part=0.3"),
            ],
        );
        let mut stats = ExtractStats::default();
        let record = extractor().extract_message(&text, &mut stats).unwrap();

        assert_eq!(record.message_id(), "M1");
        assert_eq!(record.metadata.date, "Feb 11, 2011");
        assert_eq!(record.images.len(), 1);
        let image = &record.images[0];
        assert_eq!(image.filename, "Wing Spar.jpg");
        assert_eq!(image.part, "0.2");
        assert_eq!(image.local_filename, "M1_part0_2_Wing_Spar.jpg");
        assert!(image.keywords.contains(&"wing".to_string()));
        assert!(image.keywords.contains(&"spar".to_string()));
        assert_eq!(image.size_bytes, None);
        assert_eq!(stats.urls_blacklisted, 1);
    }

    #[test]
    fn test_encoded_separator_stays_in_one_key() {
        let text = unit("M6", "Plans", &[&format!("{PREFIX}a/plans%2Fnose.jpg?part=0.1")]);
        let mut stats = ExtractStats::default();
        let record = extractor().extract_message(&text, &mut stats).unwrap();
        assert_eq!(record.images[0].filename, "plans/nose.jpg");
        assert_eq!(record.images[0].local_filename, "M6_part0_1_plans_nose.jpg");
    }

    #[test]
    fn test_foreign_urls_ignored() {
        let text = unit("M2", "Canard", &["https://example.com/canard.jpg"]);
        let mut stats = ExtractStats::default();
        assert!(extractor().extract_message(&text, &mut stats).is_none());
        assert_eq!(stats.urls_foreign, 1);
        assert_eq!(stats.skipped_no_images, 1);
    }

    #[test]
    fn test_missing_id_skipped() {
        let text = format!("# Subject only\n![x]({PREFIX}a/strake.jpg?part=0.1)\n");
        let mut stats = ExtractStats::default();
        assert!(extractor().extract_message(&text, &mut stats).is_none());
        assert_eq!(stats.skipped_no_id, 1);
        assert_eq!(stats.urls_foreign, 0);
    }

    #[test]
    fn test_repeated_url_yields_one_image() {
        let url = format!("{PREFIX}a/strake.jpg?part=0.1");
        let text = unit("M3", "Strakes", &[&url, &url]);
        let mut stats = ExtractStats::default();
        let record = extractor().extract_message(&text, &mut stats).unwrap();
        assert_eq!(record.images.len(), 1);
    }

    #[test]
    fn test_subject_keywords_toggle() {
        let text = unit("M4", "Canard mold", &[&format!("{PREFIX}a/strake.jpg?part=0.1")]);
        let mut stats = ExtractStats::default();

        let with = extractor().extract_message(&text, &mut stats).unwrap();
        assert_eq!(with.images[0].keywords, vec!["strake", "canard", "mold"]);

        let config = ExtractConfig {
            subject_keywords: false,
            ..ExtractConfig::default()
        };
        let without = Extractor::new(&config)
            .unwrap()
            .extract_message(&text, &mut stats)
            .unwrap();
        assert_eq!(without.images[0].keywords, vec!["strake"]);
    }

    #[test]
    fn test_invalid_configured_pattern_rejected() {
        let config = ExtractConfig {
            blacklist_patterns: vec!["(".to_string()],
            ..ExtractConfig::default()
        };
        assert!(Extractor::new(&config).is_err());
    }

    #[test]
    fn test_merge_record_keeps_enrichment() {
        let text = unit("M5", "Spar", &[&format!("{PREFIX}a/spar.jpg?part=0.1")]);
        let mut stats = ExtractStats::default();
        let ex = extractor();

        let mut old = ex.extract_message(&text, &mut stats).unwrap();
        old.images[0].size_bytes = Some(50_000);
        old.images[0]
            .extra
            .insert("thumbnail".into(), serde_json::json!("t.jpg"));
        let mut index = Index::new();
        index.insert(old);

        let fresh = ex.extract_message(&text, &mut stats).unwrap();
        assert!(merge_record(&mut index, fresh));

        let merged = index.get("M5").unwrap();
        assert_eq!(merged.images[0].size_bytes, Some(50_000));
        assert_eq!(merged.images[0].extra["thumbnail"], "t.jpg");
    }

    #[test]
    fn test_build_index_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.md"),
            unit("A", "Nose gear", &[&format!("{PREFIX}x/nose_gear.jpg?part=0.1")]),
        )
        .unwrap();
        std::fs::write(dir.path().join("b.md"), "no anchors here").unwrap();
        std::fs::write(
            dir.path().join("c.md"),
            unit("A", "Nose gear again", &[&format!("{PREFIX}x/nose_gear2.jpg?part=0.1")]),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let (index, stats) = extractor().build_index(dir.path(), None).unwrap();
        assert_eq!(stats.units_scanned, 3);
        assert_eq!(stats.skipped_no_id, 1);
        assert_eq!(stats.messages_replaced, 1);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("A").unwrap().images[0].filename, "nose_gear2.jpg");
    }
}
