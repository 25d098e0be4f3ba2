//! Textual plan documents.

pub mod yaml;
