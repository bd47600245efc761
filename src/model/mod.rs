//! Core data model types for indexed messages and their images.

pub mod image;
pub mod message;
