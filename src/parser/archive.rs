//! Archive unit discovery and decoding.
//!
//! An archive is either a single message file or a directory of them. Units
//! are decoded leniently: a BOM selects the encoding, invalid sequences become
//! U+FFFD, and nothing here ever fails on content.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CurateError, Result};

/// List the archive units under `path`.
///
/// A file is returned as-is. For a directory, every regular file with the
/// given extension (case-insensitive) is returned, sorted by name.
pub fn list_units(path: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CurateError::ArchiveNotFound(path.to_path_buf())
        } else {
            CurateError::io(path, e)
        }
    })?;

    if metadata.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut units = Vec::new();
    for entry in std::fs::read_dir(path).map_err(|e| CurateError::io(path, e))? {
        let entry = entry.map_err(|e| CurateError::io(path, e))?;
        let candidate = entry.path();
        if !candidate.is_file() {
            continue;
        }
        let matches = candidate
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches {
            units.push(candidate);
        }
    }
    units.sort();
    debug!(path = %path.display(), count = units.len(), "Listed archive units");
    Ok(units)
}

/// Read and decode one archive unit.
pub fn read_unit(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| CurateError::io(path, e))?;
    Ok(decode_unit(&bytes))
}

/// Decode raw unit bytes to text.
pub fn decode_unit(bytes: &[u8]) -> String {
    let (text, encoding, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if had_errors {
        debug!(encoding = encoding.name(), "Replaced malformed sequences while decoding unit");
    }
    text.into_owned()
}
