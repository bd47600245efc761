//! CLI entry point for `imgcurate`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use imgcurate::config::Config;
use imgcurate::error::CurateError;
use imgcurate::fetch::HttpFetcher;
use imgcurate::index::{file as index_file, reader as index_reader, Index};
use imgcurate::pipeline::{self, Downloader, Extractor};
use imgcurate::store::DirStore;

#[derive(Parser)]
#[command(
    name = "imgcurate",
    version,
    about = "Curate the image attachments referenced by archived forum messages"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an image index from an archive file or directory
    Extract {
        /// Archive unit or directory of units
        source: PathBuf,
        /// Output index (default: SOURCE/image_index.json, or SOURCE with .json)
        dest: Option<PathBuf>,
        /// Preview what would be indexed without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Merge into an existing DEST, keeping recorded download sizes
        #[arg(long)]
        merge: bool,
        /// Do not add subject keywords to images
        #[arg(long)]
        no_subject_keywords: bool,
    },
    /// Download every indexed image, checkpointing the index as it goes
    Download {
        /// Input index
        source: PathBuf,
        /// Output index (default: SOURCE, updated in place)
        dest: Option<PathBuf>,
        /// Directory that receives the images
        #[arg(long, value_name = "DIR")]
        images_dir: Option<PathBuf>,
        /// Process at most N images
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
        /// Skip assets whose reported size is below this many bytes
        #[arg(long, value_name = "BYTES")]
        min_size: Option<u64>,
        /// Fetch attempts per image
        #[arg(long, value_name = "N")]
        retries: Option<u32>,
        /// Save the index every N processed images
        #[arg(long, value_name = "N")]
        checkpoint_every: Option<usize>,
    },
    /// Drop same-size duplicates and missing files within each message
    Dedupe {
        /// Input index
        source: PathBuf,
        /// Output index (default: <stem>_deduped.json)
        dest: Option<PathBuf>,
        /// Directory holding the downloaded images
        #[arg(long, value_name = "DIR")]
        images_dir: Option<PathBuf>,
    },
    /// Drop images named in one or more removal lists
    Remove {
        /// Input index
        source: PathBuf,
        /// Output index (default: <stem>_cleaned.json)
        dest: Option<PathBuf>,
        /// File with one local filename per line (repeatable)
        #[arg(long = "remove-list", value_name = "FILE", required = true)]
        remove_lists: Vec<PathBuf>,
    },
    /// Show index statistics
    Stats {
        source: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = imgcurate::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Extract {
            source,
            dest,
            dry_run,
            merge,
            no_subject_keywords,
        } => {
            let dest = dest.unwrap_or_else(|| default_extract_dest(&source));
            cmd_extract(&source, &dest, dry_run, merge, no_subject_keywords, &config)
        }
        Commands::Download {
            source,
            dest,
            images_dir,
            limit,
            min_size,
            retries,
            checkpoint_every,
        } => {
            let mut config = config;
            if let Some(dir) = images_dir {
                config.download.images_dir = Some(dir);
            }
            if let Some(bytes) = min_size {
                config.download.min_size_bytes = bytes;
            }
            if let Some(n) = retries {
                config.download.max_attempts = n;
            }
            if let Some(n) = checkpoint_every {
                config.download.checkpoint_interval = n;
            }
            let dest = dest.unwrap_or_else(|| source.clone());
            cmd_download(&source, &dest, limit, &config)
        }
        Commands::Dedupe {
            source,
            dest,
            images_dir,
        } => {
            let dest = dest.unwrap_or_else(|| sibling_with_suffix(&source, "_deduped"));
            let images_dir = images_dir.unwrap_or_else(|| default_images_dir(&source, &config));
            cmd_dedupe(&source, &dest, &images_dir)
        }
        Commands::Remove {
            source,
            dest,
            remove_lists,
        } => {
            let dest = dest.unwrap_or_else(|| sibling_with_suffix(&source, "_cleaned"));
            cmd_remove(&source, &dest, &remove_lists)
        }
        Commands::Stats { source, json } => cmd_stats(&source, json),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = imgcurate::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "imgcurate.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

// ── Default paths ───────────────────────────────────────────────

/// `archive/` -> `archive/image_index.json`; `thread.md` -> `thread.json`.
fn default_extract_dest(source: &Path) -> PathBuf {
    if source.is_dir() {
        source.join("image_index.json")
    } else {
        source.with_extension("json")
    }
}

/// `data/index.json` + `_deduped` -> `data/index_deduped.json`.
fn sibling_with_suffix(source: &Path, suffix: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image_index".to_string());
    source.with_file_name(format!("{stem}{suffix}.json"))
}

/// Configured images directory, else `images/` beside the index.
fn default_images_dir(index: &Path, config: &Config) -> PathBuf {
    if let Some(ref dir) = config.download.images_dir {
        return dir.clone();
    }
    index
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("images")
}

fn progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} {label} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})"
            ))
            .expect("valid template")
            .progress_chars("#>-"),
    );
    pb
}

// ── Commands ────────────────────────────────────────────────────

/// Extract an archive into an index.
fn cmd_extract(
    source: &Path,
    dest: &Path,
    dry_run: bool,
    merge: bool,
    no_subject_keywords: bool,
    config: &Config,
) -> anyhow::Result<()> {
    if !source.exists() {
        anyhow::bail!("Archive not found: {}", source.display());
    }

    let mut extract_config = config.extract.clone();
    if no_subject_keywords {
        extract_config.subject_keywords = false;
    }
    let extractor = Extractor::new(&extract_config)?;

    let existing = if merge && dest.exists() {
        index_file::load_index(dest)?
    } else {
        if merge {
            tracing::warn!(path = %dest.display(), "Nothing to merge into; starting a new index");
        }
        Index::new()
    };

    let pb = progress_bar(0, "Extracting");
    let start = Instant::now();
    let (index, stats) = extractor.merge_into(
        source,
        existing,
        Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    )?;
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    println!();
    println!("  {:<22} {}", "Source", source.display());
    println!("  {:<22} {}", "Units scanned", stats.units_scanned);
    println!("  {:<22} {}", "Messages indexed", stats.messages_indexed);
    println!("  {:<22} {}", "Messages replaced", stats.messages_replaced);
    println!("  {:<22} {}", "Images indexed", stats.images_indexed);
    println!("  {:<22} {}", "Skipped (no id)", stats.skipped_no_id);
    println!("  {:<22} {}", "Skipped (no images)", stats.skipped_no_images);
    println!("  {:<22} {}", "Unreadable units", stats.unreadable);
    println!("  {:<22} {}", "Foreign URLs", stats.urls_foreign);
    println!("  {:<22} {}", "Blacklisted URLs", stats.urls_blacklisted);
    println!("  {:<22} {:.2?}", "Time", elapsed);

    if dry_run {
        println!();
        println!("  Dry run, nothing written. First messages:");
        for (id, message) in index.iter().take(5) {
            println!("    {id}: \"{}\"", truncate(&message.metadata.subject, 60));
            for image in &message.images {
                println!("      {}  [{}]", image.local_filename, image.keywords.join(", "));
            }
        }
        println!();
        return Ok(());
    }

    index_file::save_index(dest, &index)?;
    println!("  {:<22} {}", "Index", dest.display());
    println!();
    Ok(())
}

/// Download every image of an index.
fn cmd_download(
    source: &Path,
    dest: &Path,
    limit: Option<usize>,
    config: &Config,
) -> anyhow::Result<()> {
    let index = index_file::load_index(source)?;
    let images_dir = default_images_dir(source, config);
    std::fs::create_dir_all(&images_dir)
        .map_err(|e| CurateError::io(&images_dir, e))?;

    let fetcher = HttpFetcher::new(&config.download)?;
    let downloader =
        Downloader::new(fetcher, DirStore::new(&images_dir), &config.download).with_limit(limit);

    let pb = progress_bar(0, "Downloading");
    let start = Instant::now();
    let outcome = downloader.run(
        index,
        &mut |index, _stats| index_file::save_index(dest, index),
        Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    );
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    let stats = outcome.stats;
    println!();
    println!("  {:<22} {}", "Images dir", images_dir.display());
    println!("  {:<22} {}", "Total", stats.total);
    println!("  {:<22} {}", "Downloaded", stats.success);
    println!("  {:<22} {}", "Already present", stats.skipped_exists);
    println!("  {:<22} {}", "Too small", stats.skipped_too_small);
    println!("  {:<22} {}", "Failed", stats.failed);
    println!("  {:<22} {:.2?}", "Time", elapsed);
    println!("  {:<22} {}", "Index", dest.display());

    if !outcome.failures.is_empty() {
        println!();
        println!("  Failed downloads:");
        for name in outcome.failures.iter().take(20) {
            println!("    {name}");
        }
        if outcome.failures.len() > 20 {
            println!("    ... and {} more", outcome.failures.len() - 20);
        }
    }
    println!();
    Ok(())
}

/// Prune duplicate and missing images.
fn cmd_dedupe(source: &Path, dest: &Path, images_dir: &Path) -> anyhow::Result<()> {
    if !source.exists() {
        anyhow::bail!("Index file not found: {}", source.display());
    }
    if !images_dir.is_dir() {
        anyhow::bail!("Images directory not found: {}", images_dir.display());
    }

    let index = index_file::load_index(source)?;
    let total = index.len();
    let store = DirStore::new(images_dir);

    let pb = progress_bar(total as u64, "Deduplicating");
    let (index, report) = pipeline::dedupe_index(
        index,
        &store,
        Some(&|current, _| pb.set_position(current)),
    );
    pb.finish_and_clear();

    if !report.affected.is_empty() {
        println!();
        for message in &report.affected {
            println!("  {}: \"{}\"", message.message_id, truncate(&message.subject, 60));
            if message.duplicates_removed > 0 {
                println!(
                    "    - Removed {} duplicate image(s) (same file size)",
                    message.duplicates_removed
                );
            }
            if message.missing_removed > 0 {
                println!(
                    "    - Removed {} missing image(s) (file not found)",
                    message.missing_removed
                );
            }
        }
    }

    index_file::save_index(dest, &index)?;

    println!();
    println!("  {:<22} {}", "Messages processed", total);
    println!("  {:<22} {}", "Messages affected", report.messages_affected);
    println!("  {:<22} {}", "Images before", report.images_before);
    println!("  {:<22} {}", "Images after", report.images_after);
    println!("  {:<22} {}", "Duplicates removed", report.duplicates_removed);
    println!("  {:<22} {}", "Missing removed", report.missing_removed);
    println!("  {:<22} {}", "Index", dest.display());
    println!();
    Ok(())
}

/// Apply removal lists.
fn cmd_remove(source: &Path, dest: &Path, lists: &[PathBuf]) -> anyhow::Result<()> {
    if !source.exists() {
        anyhow::bail!("Index file not found: {}", source.display());
    }
    let removal: HashSet<String> = pipeline::load_removal_lists(lists)?;
    let index = index_file::load_index(source)?;

    let images_before = index.image_count();
    let messages_before = index.len();
    let (index, stats) = pipeline::remove_images(index, &removal);

    index_file::save_index(dest, &index)?;

    println!();
    println!("  {:<22} {}", "Removal entries", removal.len());
    println!("  {:<22} {}", "Messages before", messages_before);
    println!("  {:<22} {}", "Messages after", index.len());
    println!("  {:<22} {}", "Images before", images_before);
    println!("  {:<22} {}", "Images after", index.image_count());
    println!("  {:<22} {}", "Images removed", stats.images_removed);
    println!("  {:<22} {}", "Messages affected", stats.messages_affected);
    println!("  {:<22} {}", "Messages removed", stats.messages_removed);
    println!("  {:<22} {}", "Index", dest.display());
    println!();
    Ok(())
}

/// Show statistics for an index.
fn cmd_stats(path: &Path, json: bool) -> anyhow::Result<()> {
    let index = index_file::load_index(path)?;
    let file_size = index_file::index_file_size(path);

    if json {
        print_stats_json(path, file_size, &index)
    } else {
        print_stats_table(path, file_size, &index);
        Ok(())
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "imgcurate", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

// ── Output ──────────────────────────────────────────────────────

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

/// Print statistics in a human-readable table.
fn print_stats_table(path: &Path, file_size: u64, index: &Index) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<20} {}", "File", path.display());
    println!("  {:<20} {}", "File size", format_size(file_size, BINARY));
    println!("  {:<20} {}", "Messages", index.len());
    println!("  {:<20} {}", "Images", index.image_count());
    println!(
        "  {:<20} {}",
        "Downloaded size",
        format_size(index_reader::total_known_bytes(index), BINARY)
    );
    println!("  {:<20} {}", "Too small", index_reader::count_too_small(index));
    println!("  {:<20} {}", "Not yet sized", index_reader::count_unsized(index));

    if let Some((min, max)) = index_reader::date_range(index) {
        println!(
            "  {:<20} {} to {}",
            "Date range",
            min.format("%Y-%m-%d"),
            max.format("%Y-%m-%d")
        );
    }

    let authors = index_reader::top_authors(index, 10);
    if !authors.is_empty() {
        println!();
        println!("  Top authors:");
        for (author, count) in &authors {
            println!("    {count:>6}  {author}");
        }
    }

    let keywords = index_reader::top_keywords(index, 10);
    if !keywords.is_empty() {
        println!();
        println!("  Top keywords:");
        for (keyword, count) in &keywords {
            println!("    {count:>6}  {keyword}");
        }
    }
    println!();
}

/// Print statistics as JSON.
fn print_stats_json(path: &Path, file_size: u64, index: &Index) -> anyhow::Result<()> {
    let date_range = index_reader::date_range(index).map(|(min, max)| {
        serde_json::json!({
            "oldest": min.to_string(),
            "newest": max.to_string(),
        })
    });

    let authors: Vec<serde_json::Value> = index_reader::top_authors(index, 10)
        .iter()
        .map(|(author, count)| {
            serde_json::json!({
                "author": author,
                "count": count,
            })
        })
        .collect();

    let keywords: Vec<serde_json::Value> = index_reader::top_keywords(index, 10)
        .iter()
        .map(|(keyword, count)| {
            serde_json::json!({
                "keyword": keyword,
                "count": count,
            })
        })
        .collect();

    let stats = serde_json::json!({
        "file": path.to_string_lossy(),
        "file_size": file_size,
        "message_count": index.len(),
        "image_count": index.image_count(),
        "downloaded_bytes": index_reader::total_known_bytes(index),
        "too_small": index_reader::count_too_small(index),
        "unsized": index_reader::count_unsized(index),
        "date_range": date_range,
        "top_authors": authors,
        "top_keywords": keywords,
    });

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_with_suffix() {
        assert_eq!(
            sibling_with_suffix(Path::new("data/image_index.json"), "_deduped"),
            PathBuf::from("data/image_index_deduped.json")
        );
    }

    #[test]
    fn test_default_extract_dest_for_file() {
        assert_eq!(
            default_extract_dest(Path::new("archive/thread.md")),
            PathBuf::from("archive/thread.json")
        );
    }

    #[test]
    fn test_default_images_dir_beside_index() {
        let config = Config::default();
        assert_eq!(
            default_images_dir(Path::new("data/image_index.json"), &config),
            PathBuf::from("data/images")
        );
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("canard", 10), "canard");
        assert_eq!(truncate("ééééé", 3), "ééé...");
    }
}
