//! Content stores: where downloaded image bytes live, keyed by local filename.
//!
//! The downloader and the deduplicator only talk to [`ContentStore`], so their
//! skip and prune logic runs the same against a directory or an in-memory map.

pub mod dir;
pub mod memory;

use crate::error::Result;

pub use dir::DirStore;
pub use memory::MemoryStore;

/// Minimal storage capability keyed by `local_filename`.
pub trait ContentStore {
    /// Whether content for `key` is present.
    fn exists(&self, key: &str) -> bool;

    /// Store `bytes` under `key`, replacing any previous content.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Delete the content for `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Byte size of the content for `key`. Fails when the key cannot be
    /// inspected (absent, or unreadable such as an over-long path).
    fn size(&self, key: &str) -> Result<u64>;
}

impl<T: ContentStore + ?Sized> ContentStore for &T {
    fn exists(&self, key: &str) -> bool {
        (**self).exists(key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        (**self).write(key, bytes)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn size(&self, key: &str) -> Result<u64> {
        (**self).size(key)
    }
}
