//! `imgcurate` — curate the image attachments referenced by archived forum
//! messages.
//!
//! The pipeline has four stages sharing one JSON index: extract attachment
//! URLs from an archive, download them, prune duplicate and missing files,
//! and drop images named in removal lists.

pub mod config;
pub mod error;
pub mod fetch;
pub mod index;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod store;
