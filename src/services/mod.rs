//! Discovery services feeding the catalog.
//!
//! - [`walker`] - bounded filesystem traversal
//! - [`inspector`] - classifies entries and reads bundle descriptors
//! - [`metadata`] - OS indexed search as a second, additive source

pub mod inspector;
pub mod metadata;
pub mod walker;
