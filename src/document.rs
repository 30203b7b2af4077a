//! Document and field model.
//!
//! A [`Document`] is an ordered list of [`Field`]s. Each field carries its
//! own storage policy ([`Store`]) and indexing policy ([`Indexing`]).

#[allow(clippy::module_inception)]
pub mod document;
pub mod field;

// Re-export commonly used types
pub use document::{Document, DocumentBuilder};
pub use field::{Field, FieldValue, Indexing, Store};
