//! The four pipeline stages. Each one takes an [`Index`](crate::index::Index)
//! by value and hands back the transformed index plus a report; persisting it
//! is the caller's job.

pub mod dedupe;
pub mod download;
pub mod extract;
pub mod remove;

pub use dedupe::{dedupe_index, DedupeReport};
pub use download::{DownloadOutcome, DownloadStats, Downloader};
pub use extract::{ExtractStats, Extractor};
pub use remove::{load_removal_lists, remove_images, RemovalStats};
