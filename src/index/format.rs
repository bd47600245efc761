//! In-memory index type and its JSON shape.
//!
//! ```text
//! {
//!   "<message_id>": {
//!     "metadata": { "message_id", "subject", "author", "date" },
//!     "images": [ { "url", "part", "filename", "local_filename",
//!                   "keywords", "size_bytes", "too_small" }, ... ]
//!   },
//!   ...
//! }
//! ```
//!
//! Insertion order is preserved on load and save.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::message::MessageRecord;

/// Mapping from message id to [`MessageRecord`]; the single source of truth
/// shared by every pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Index {
    messages: IndexMap<String, MessageRecord>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total number of images across all messages.
    pub fn image_count(&self) -> usize {
        self.messages.values().map(|m| m.images.len()).sum()
    }

    pub fn get(&self, message_id: &str) -> Option<&MessageRecord> {
        self.messages.get(message_id)
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.messages.contains_key(message_id)
    }

    /// Insert a record under its own message id, returning the record it replaced.
    ///
    /// A replaced key keeps its original position.
    pub fn insert(&mut self, record: MessageRecord) -> Option<MessageRecord> {
        let key = record.message_id().to_string();
        self.messages.insert(key, record)
    }

    /// Insert under an explicit key. Used when rebuilding a loaded index so
    /// keys survive even if a record's metadata id is blank or differs.
    pub fn insert_keyed(&mut self, key: String, record: MessageRecord) -> Option<MessageRecord> {
        self.messages.insert(key, record)
    }

    /// Remove a message, preserving the order of the remaining entries.
    pub fn remove(&mut self, message_id: &str) -> Option<MessageRecord> {
        self.messages.shift_remove(message_id)
    }

    /// Iterate messages in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &MessageRecord)> {
        self.messages.iter()
    }

    /// Positional mutable access, used by long batch passes that must
    /// release the borrow between items.
    pub fn get_index_mut(&mut self, position: usize) -> Option<&mut MessageRecord> {
        self.messages.get_index_mut(position).map(|(_, m)| m)
    }

    /// Image counts per message, in index order.
    pub fn image_counts(&self) -> Vec<usize> {
        self.messages.values().map(|m| m.images.len()).collect()
    }
}

impl IntoIterator for Index {
    type Item = (String, MessageRecord);
    type IntoIter = indexmap::map::IntoIter<String, MessageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl FromIterator<MessageRecord> for Index {
    fn from_iter<T: IntoIterator<Item = MessageRecord>>(iter: T) -> Self {
        let mut index = Index::new();
        for record in iter {
            index.insert(record);
        }
        index
    }
}

impl FromIterator<(String, MessageRecord)> for Index {
    fn from_iter<T: IntoIterator<Item = (String, MessageRecord)>>(iter: T) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}
