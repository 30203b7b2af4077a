//! The index store: where documents end up.
//!
//! [`IndexStore`] is the contract an indexing session writes through. It
//! knows two operations on documents: a plain add, and an atomic replace
//! that deletes every document whose exact-term key field equals a value
//! and adds the new document in the same step.
//!
//! [`IndexWriter`](writer::IndexWriter) is the bundled implementation. It
//! keeps an inverted view of the live documents in memory and commits it
//! to a [`Storage`](crate::storage::Storage) as a single checksummed
//! snapshot file. [`IndexReader`](reader::IndexReader) loads the last
//! committed snapshot for lookups.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{IndexerError, Result};

pub mod reader;
pub mod snapshot;
pub mod writer;

pub use reader::{IndexReader, StoredDocument};
pub use writer::{IndexWriter, WriterConfig};

/// Name of the exclusive writer lock.
pub const WRITE_LOCK: &str = "write";

/// How an index store treats existing content when it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpenMode {
    /// Discard any existing content.
    Create,
    /// Keep existing content, creating an empty index if there is none.
    #[default]
    CreateOrAppend,
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenMode::Create => f.write_str("CREATE"),
            OpenMode::CreateOrAppend => f.write_str("CREATE_OR_APPEND"),
        }
    }
}

impl FromStr for OpenMode {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "create" => Ok(OpenMode::Create),
            "create_or_append" | "append" => Ok(OpenMode::CreateOrAppend),
            other => Err(IndexerError::config(format!("unknown open mode '{other}'"))),
        }
    }
}

/// A persistent, field-structured document store.
///
/// Implementations signal store-level failures with
/// [`IndexerError::Write`]; `fatal: true` means the store will not accept
/// further writes.
pub trait IndexStore: Send + fmt::Debug {
    /// Where the store lives, for diagnostics.
    fn location(&self) -> String;

    /// Add a document without looking for prior versions.
    fn add(&mut self, doc: Document) -> Result<()>;

    /// Atomically delete every document whose `key_field` term equals
    /// `key_value`, then add `doc`.
    fn replace(&mut self, key_field: &str, key_value: &str, doc: Document) -> Result<()>;

    /// Make all changes so far durable and visible to new readers.
    fn commit(&mut self) -> Result<()>;

    /// Commit and release the store. Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_mode_parse() {
        assert_eq!("create".parse::<OpenMode>().unwrap(), OpenMode::Create);
        assert_eq!(
            "CREATE_OR_APPEND".parse::<OpenMode>().unwrap(),
            OpenMode::CreateOrAppend
        );
        assert_eq!(
            "create-or-append".parse::<OpenMode>().unwrap(),
            OpenMode::CreateOrAppend
        );
        assert!("truncate".parse::<OpenMode>().is_err());
    }

    #[test]
    fn test_open_mode_display_round_trips() {
        for mode in [OpenMode::Create, OpenMode::CreateOrAppend] {
            assert_eq!(mode.to_string().parse::<OpenMode>().unwrap(), mode);
        }
    }
}
