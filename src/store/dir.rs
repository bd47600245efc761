//! Directory-backed content store.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{CurateError, Result};

use super::ContentStore;

/// Stores each key as a file directly inside `root`.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// A store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Full path for a key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Sibling file used while writing, renamed into place once complete.
    fn partial_path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!(".{key}.part"))
    }
}

impl ContentStore for DirStore {
    fn exists(&self, key: &str) -> bool {
        // Over-long or otherwise unstat-able names count as absent.
        !key.is_empty() && self.path_for(key).is_file()
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(CurateError::io(
                &self.root,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty key"),
            ));
        }
        std::fs::create_dir_all(&self.root).map_err(|e| CurateError::io(&self.root, e))?;
        let partial = self.partial_path_for(key);
        let target = self.path_for(key);
        if let Err(e) = std::fs::write(&partial, bytes) {
            if let Err(rm) = std::fs::remove_file(&partial) {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %partial.display(), error = %rm, "Could not remove partial file");
                }
            }
            return Err(CurateError::io(&partial, e));
        }
        std::fs::rename(&partial, &target).map_err(|e| CurateError::io(&target, e))?;
        debug!(path = %target.display(), bytes = bytes.len(), "Stored content");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CurateError::io(&path, e)),
        }
    }

    fn size(&self, key: &str) -> Result<u64> {
        if key.is_empty() {
            return Err(CurateError::io(
                &self.root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "empty key"),
            ));
        }
        let path = self.path_for(key);
        let metadata = std::fs::metadata(&path).map_err(|e| CurateError::io(&path, e))?;
        if !metadata.is_file() {
            return Err(CurateError::io(
                &path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a regular file"),
            ));
        }
        Ok(metadata.len())
    }
}
