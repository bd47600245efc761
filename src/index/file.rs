//! Index persistence: JSON load and atomic snapshot writes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{CurateError, Result};
use crate::index::format::Index;

/// Load an index snapshot from disk.
///
/// A missing file is [`CurateError::IndexNotFound`]; undecodable content is
/// [`CurateError::InvalidIndex`].
pub fn load_index(path: &Path) -> Result<Index> {
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CurateError::IndexNotFound(path.to_path_buf())
        } else {
            CurateError::io(path, e)
        }
    })?;

    let index: Index = serde_json::from_slice(&data).map_err(|e| CurateError::InvalidIndex {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    debug!(
        path = %path.display(),
        messages = index.len(),
        images = index.image_count(),
        "Loaded index"
    );
    Ok(index)
}

/// Write a full index snapshot.
///
/// The JSON is written to a hidden sibling file first and renamed over the
/// target, so readers never observe a half-written index.
pub fn save_index(path: &Path, index: &Index) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| CurateError::io(parent, e))?;
        }
    }

    let tmp = temp_path_for(path);
    {
        let file = File::create(&tmp).map_err(|e| CurateError::io(&tmp, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, index)?;
        writer.write_all(b"\n").map_err(|e| CurateError::io(&tmp, e))?;
        writer.flush().map_err(|e| CurateError::io(&tmp, e))?;
    }
    std::fs::rename(&tmp, path).map_err(|e| CurateError::io(path, e))?;

    info!(
        path = %path.display(),
        messages = index.len(),
        images = index.image_count(),
        "Index written"
    );
    Ok(())
}

/// Temporary sibling used while writing.
///
/// Example: `/data/image_index.json` → `/data/.image_index.json.tmp`
pub fn temp_path_for(path: &Path) -> PathBuf {
    let filename = path.file_name().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!(".{filename}.tmp"))
}

/// Return the size in bytes of an index file (0 if missing).
pub fn index_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
