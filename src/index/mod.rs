//! The image index: message id -> message record, persisted as JSON.

pub mod file;
pub mod format;
pub mod reader;

pub use format::Index;
