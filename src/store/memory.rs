//! In-memory content store for previews and tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{CurateError, Result};

use super::ContentStore;

/// A `HashMap`-backed store. Single-threaded, like the pipeline.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key.
    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>) {
        self.files.borrow_mut().insert(key.into(), bytes);
    }

    /// Copy of the stored bytes for `key`.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.borrow().is_empty()
    }
}

impl ContentStore for MemoryStore {
    fn exists(&self, key: &str) -> bool {
        self.files.borrow().contains_key(key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.files
            .borrow_mut()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.files.borrow_mut().remove(key);
        Ok(())
    }

    fn size(&self, key: &str) -> Result<u64> {
        self.files
            .borrow()
            .get(key)
            .map(|b| b.len() as u64)
            .ok_or_else(|| {
                CurateError::io(
                    PathBuf::from(key),
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no such key"),
                )
            })
    }
}
