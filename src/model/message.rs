//! Message records.

use serde::{Deserialize, Serialize};

use super::image::ImageRecord;

/// Header-level facts about one archived message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageMetadata {
    /// Unique, case-preserving identifier; also the index key.
    pub message_id: String,
    /// Subject heading.
    pub subject: String,
    /// Author display name.
    pub author: String,
    /// Posting date as written in the archive (e.g. `"Feb 11, 2011"`).
    pub date: String,
}

/// A message and the images it references, in archive order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub metadata: MessageMetadata,

    #[serde(default)]
    pub images: Vec<ImageRecord>,

    /// Fields written by other tools (tagger keywords and similar), kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MessageRecord {
    /// Build a record with no extra fields.
    pub fn new(metadata: MessageMetadata, images: Vec<ImageRecord>) -> Self {
        Self {
            metadata,
            images,
            extra: serde_json::Map::new(),
        }
    }

    /// The message identifier.
    pub fn message_id(&self) -> &str {
        &self.metadata.message_id
    }
}
