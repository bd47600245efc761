//! Archive parsing: unit discovery, metadata anchors, image URLs, the
//! filename blacklist, and keyword derivation.

pub mod archive;
pub mod blacklist;
pub mod keywords;
pub mod metadata;
pub mod url;
