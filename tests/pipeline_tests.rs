//! Integration tests for the extract, download, dedupe and remove stages.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use imgcurate::config::{DownloadConfig, ExtractConfig};
use imgcurate::error::{CurateError, Result};
use imgcurate::fetch::{Fetcher, RetryPolicy};
use imgcurate::index::file::{load_index, save_index};
use imgcurate::index::Index;
use imgcurate::pipeline::{self, Downloader, Extractor};
use imgcurate::store::{ContentStore, DirStore, MemoryStore};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn extract_fixtures() -> (Index, pipeline::ExtractStats) {
    Extractor::new(&ExtractConfig::default())
        .unwrap()
        .build_index(&fixture("archive"), None)
        .unwrap()
}

/// A PNG whose encoded size depends on its dimensions.
fn png(width: u32, height: u32) -> Vec<u8> {
    let mut img = image::RgbImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = image::Rgb([(x * 7) as u8, (y * 13) as u8, ((x + y) * 3) as u8]);
    }
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Serves fixed bytes per URL and counts requests.
#[derive(Default)]
struct StaticFetcher {
    sizes: HashMap<String, u64>,
    bodies: HashMap<String, Vec<u8>>,
    probes: Cell<usize>,
    fetches: Cell<usize>,
}

impl Fetcher for StaticFetcher {
    fn probe(&self, url: &str) -> Result<Option<u64>> {
        self.probes.set(self.probes.get() + 1);
        Ok(self.sizes.get(url).copied())
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.fetches.set(self.fetches.get() + 1);
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| CurateError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Every image in `index` served as a distinct PNG.
fn fetcher_for(index: &Index) -> StaticFetcher {
    let mut fetcher = StaticFetcher::default();
    for (n, image) in index.iter().flat_map(|(_, m)| m.images.iter()).enumerate() {
        let body = png(8 + n as u32, 8);
        fetcher.sizes.insert(image.url.clone(), 10_000);
        fetcher.bodies.insert(image.url.clone(), body);
    }
    fetcher
}

fn download_config() -> DownloadConfig {
    DownloadConfig {
        checkpoint_interval: 2,
        ..DownloadConfig::default()
    }
}

fn no_checkpoint(_: &Index, _: &pipeline::DownloadStats) -> Result<()> {
    Ok(())
}

// ─── Test 1: Extract fixture archive ────────────────────────────────

#[test]
fn test_extract_archive_directory() {
    let (index, stats) = extract_fixtures();

    assert_eq!(stats.units_scanned, 4, "notes.txt is not a unit");
    assert_eq!(stats.messages_indexed, 2);
    assert_eq!(stats.images_indexed, 3);
    assert_eq!(stats.skipped_no_id, 1);
    assert_eq!(stats.skipped_no_images, 1);
    assert_eq!(stats.urls_blacklisted, 2);
    assert_eq!(stats.urls_foreign, 3);

    let keys: Vec<&str> = index.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["M1", "A20JX9PGHII"]);
}

// ─── Test 2: Wing spar scenario ─────────────────────────────────────

#[test]
fn test_extract_m1_single_real_image() {
    let (index, _) = extract_fixtures();
    let m1 = index.get("M1").unwrap();

    assert_eq!(m1.metadata.subject, "Wing test");
    assert_eq!(m1.metadata.author, "ted davis");
    assert_eq!(m1.metadata.date, "Feb 11, 2011");
    assert_eq!(m1.images.len(), 1);
    assert_eq!(m1.images[0].local_filename, "M1_part0_2_Wing_Spar.jpg");
    assert!(m1.images[0].keywords.contains(&"wing".to_string()));
    assert!(m1.images[0].keywords.contains(&"spar".to_string()));
}

// ─── Test 3: Blacklisted names never reach the index ────────────────

#[test]
fn test_blacklisted_filenames_absent() {
    let (index, _) = extract_fixtures();
    let names: Vec<&str> = index
        .iter()
        .flat_map(|(_, m)| m.images.iter())
        .map(|i| i.filename.as_str())
        .collect();
    assert!(!names.contains(&"3F2A.gif"));
    assert!(!names.contains(&"spacer.gif"));
    assert_eq!(names, vec!["Wing_Spar.jpg", "CanardLayup.png", "canard_mold.jpg"]);
}

// ─── Test 4: Idempotent extraction ──────────────────────────────────

#[test]
fn test_extraction_is_idempotent() {
    let (first, _) = extract_fixtures();
    let (second, _) = extract_fixtures();
    assert_eq!(first, second);

    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    save_index(&a, &first).unwrap();
    save_index(&b, &second).unwrap();
    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
}

// ─── Test 5: Save/load keeps order and foreign fields ───────────────

#[test]
fn test_index_roundtrip_preserves_foreign_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image_index.json");
    let raw = r#"{
        "Z9": {
            "metadata": {"message_id": "Z9", "subject": "Strakes", "author": "a", "date": ""},
            "images": [{
                "url": "https://example.com/s.jpg",
                "part": "0.1",
                "filename": "s.jpg",
                "local_filename": "Z9_part0_1_s.jpg",
                "keywords": ["strake"],
                "thumbnail": "thumbs/Z9_part0_1_s.jpg"
            }],
            "llm_keywords": ["fuel", "strake"]
        },
        "A1": {
            "metadata": {"message_id": "A1", "subject": "", "author": "", "date": ""},
            "images": [{"url": "u", "filename": "f.jpg", "local_filename": "A1_part_f.jpg"}]
        }
    }"#;
    std::fs::write(&path, raw).unwrap();

    let index = load_index(&path).unwrap();
    save_index(&path, &index).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.find("\"Z9\"").unwrap() < text.find("\"A1\"").unwrap());
    let out: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(out["Z9"]["llm_keywords"][0], "fuel");
    assert_eq!(out["Z9"]["images"][0]["thumbnail"], "thumbs/Z9_part0_1_s.jpg");
}

// ─── Test 6: Missing and corrupt index files ────────────────────────

#[test]
fn test_load_index_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.json");
    assert!(matches!(
        load_index(&missing),
        Err(CurateError::IndexNotFound(_))
    ));

    let corrupt = dir.path().join("bad.json");
    std::fs::write(&corrupt, "{ not json").unwrap();
    assert!(matches!(
        load_index(&corrupt),
        Err(CurateError::InvalidIndex { .. })
    ));
}

// ─── Test 7: Download then re-run is resumable ──────────────────────

#[test]
fn test_download_rerun_issues_no_requests() {
    let (index, _) = extract_fixtures();
    let fetcher = fetcher_for(&index);
    let store = MemoryStore::new();

    let first = Downloader::new(&fetcher, &store, &download_config())
        .with_retry(RetryPolicy::immediate(3))
        .run(index, &mut no_checkpoint, None);
    assert_eq!(first.stats.success, 3);
    assert_eq!(store.len(), 3);

    let rerun = StaticFetcher::default();
    let second = Downloader::new(&rerun, &store, &download_config())
        .run(first.index, &mut no_checkpoint, None);
    assert_eq!(second.stats.skipped_exists, 3);
    assert_eq!(rerun.probes.get(), 0);
    assert_eq!(rerun.fetches.get(), 0);
}

// ─── Test 8: Size floor ─────────────────────────────────────────────

#[test]
fn test_download_too_small_scenario() {
    let (index, _) = extract_fixtures();
    let index: Index = index.into_iter().filter(|(k, _)| k == "M1").collect();
    assert_eq!(index.image_count(), 1);

    let url = index.get("M1").unwrap().images[0].url.clone();
    let mut fetcher = StaticFetcher::default();
    fetcher.sizes.insert(url, 2048);
    let store = MemoryStore::new();

    let outcome = Downloader::new(&fetcher, &store, &download_config())
        .run(index, &mut no_checkpoint, None);
    assert_eq!(outcome.stats.skipped_too_small, 1);
    assert_eq!(outcome.stats.success, 0);
    assert_eq!(fetcher.fetches.get(), 0);

    let image = &outcome.index.get("M1").unwrap().images[0];
    assert_eq!(image.size_bytes, Some(2048));
    assert!(image.too_small);
}

// ─── Test 9: Checkpoints land on disk ───────────────────────────────

#[test]
fn test_download_checkpoints_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let index_path = dir.path().join("image_index.json");
    let images = DirStore::new(dir.path().join("images"));

    let (index, _) = extract_fixtures();
    let fetcher = fetcher_for(&index);

    let mut saves = 0;
    let outcome = Downloader::new(&fetcher, &images, &download_config()).run(
        index,
        &mut |index, _| {
            saves += 1;
            save_index(&index_path, index)
        },
        None,
    );
    // Two after the second image, one at the end.
    assert_eq!(saves, 2);

    let on_disk = load_index(&index_path).unwrap();
    assert_eq!(on_disk, outcome.index);
    assert!(images.exists("M1_part0_2_Wing_Spar.jpg"));
    assert!(on_disk
        .iter()
        .flat_map(|(_, m)| m.images.iter())
        .all(|i| i.size_bytes.is_some() && !i.too_small));
}

// ─── Test 10: Dedupe against a real directory ───────────────────────

#[test]
fn test_dedupe_keeps_first_same_size_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirStore::new(dir.path());
    let (index, _) = extract_fixtures();

    let same = png(10, 10);
    store.write("A20JX9PGHII_part0_1_canard_mold.jpg", &same).unwrap();
    store.write("A20JX9PGHII_part0_2_CanardLayup.png", &same).unwrap();
    // M1's file is never downloaded.

    let (deduped, report) = pipeline::dedupe_index(index, &store, None);
    assert_eq!(report.images_before, 3);
    assert_eq!(report.images_after, 1);
    assert_eq!(report.duplicates_removed, 1);
    assert_eq!(report.missing_removed, 1);
    assert_eq!(report.messages_affected, 2);

    let m2 = deduped.get("A20JX9PGHII").unwrap();
    assert_eq!(m2.images.len(), 1);
    // URLs sort by value, so CanardLayup.png comes first and is kept.
    assert_eq!(m2.images[0].filename, "CanardLayup.png");
    // Dedupe never drops messages.
    assert!(deduped.get("M1").unwrap().images.is_empty());
}

// ─── Test 11: Removal lists from disk ───────────────────────────────

#[test]
fn test_remove_m1_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("unwanted.txt");
    std::fs::write(&list, "M1_part0_2_Wing_Spar.jpg\n\n").unwrap();

    let (index, _) = extract_fixtures();
    let before: HashMap<String, usize> = index
        .iter()
        .map(|(k, m)| (k.clone(), m.images.len()))
        .collect();

    let removal: HashSet<String> = pipeline::load_removal_lists(&[list]).unwrap();
    let (out, stats) = pipeline::remove_images(index, &removal);

    assert!(!out.contains("M1"));
    assert_eq!(stats.messages_removed, 1);
    assert_eq!(stats.images_removed, 1);
    for (key, message) in out.iter() {
        assert!(!message.images.is_empty());
        assert!(message.images.len() <= before[key]);
    }
}

// ─── Test 12: Merge keeps download sizes ────────────────────────────

#[test]
fn test_merge_extract_keeps_sizes() {
    let (index, _) = extract_fixtures();
    let fetcher = fetcher_for(&index);
    let store = MemoryStore::new();
    let downloaded = Downloader::new(&fetcher, &store, &download_config())
        .run(index, &mut no_checkpoint, None)
        .index;

    let (merged, stats) = Extractor::new(&ExtractConfig::default())
        .unwrap()
        .merge_into(&fixture("archive"), downloaded.clone(), None)
        .unwrap();
    assert_eq!(stats.messages_replaced, 2);
    assert_eq!(merged, downloaded);
}

// ─── Test 13: Single-file archive ───────────────────────────────────

#[test]
fn test_extract_single_unit_file() {
    let (index, stats) = Extractor::new(&ExtractConfig::default())
        .unwrap()
        .build_index(&fixture("archive/m2_canard_mold.md"), None)
        .unwrap();
    assert_eq!(stats.units_scanned, 1);
    let m2 = index.get("A20JX9PGHII").unwrap();
    assert_eq!(
        m2.images
            .iter()
            .map(|i| i.local_filename.as_str())
            .collect::<Vec<_>>(),
        vec![
            "A20JX9PGHII_part0_2_CanardLayup.png",
            "A20JX9PGHII_part0_1_canard_mold.jpg"
        ]
    );
    assert_eq!(m2.images[0].keywords, vec!["canard", "layup", "mold"]);
}

#[test]
fn test_missing_archive_is_an_error() {
    let result = Extractor::new(&ExtractConfig::default())
        .unwrap()
        .build_index(&fixture("does_not_exist"), None);
    assert!(matches!(result, Err(CurateError::ArchiveNotFound(_))));
}
