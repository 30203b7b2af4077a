//! Error types for docindex.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`IndexerError`] enum. Variants fall into two groups: errors that end an
//! indexing run (see [`IndexerError::is_fatal`]) and errors scoped to a
//! single document, file or record line, which callers report and skip.
//!
//! # Examples
//!
//! ```
//! use docindex::error::{IndexerError, Result};
//!
//! fn open_somewhere() -> Result<()> {
//!     Err(IndexerError::store_locked("/var/index"))
//! }
//!
//! let err = open_somewhere().unwrap_err();
//! assert!(err.is_fatal());
//! assert_eq!(err.to_string(), "Index store is locked by another writer: /var/index");
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The main error type for docindex operations.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// I/O errors not attributable to a more specific variant.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The index store location could not be created or opened.
    #[error("Failed to open index store at {location}: {reason}")]
    StoreOpen { location: String, reason: String },

    /// Another writer holds the lock on the index store location.
    #[error("Index store is locked by another writer: {location}")]
    StoreLocked { location: String },

    /// The store rejected or failed to persist a document.
    ///
    /// `fatal` is set when the store can no longer accept writes.
    #[error("Write error: {message}")]
    Write { message: String, fatal: bool },

    /// The session hit an unrecoverable store error earlier in the run.
    #[error("Session failed: {0}")]
    SessionFailed(String),

    /// The session has already been closed.
    #[error("Session is closed")]
    SessionClosed,

    /// The document's upsert key field is missing a usable value.
    #[error("Invalid key field '{field}': {reason}")]
    InvalidKey { field: String, reason: String },

    /// The crawl root does not exist.
    #[error("Crawl root not found: {}", path.display())]
    RootNotFound { path: PathBuf },

    /// The crawl root exists but cannot be listed or opened.
    #[error("Crawl root is not readable: {}: {reason}", path.display())]
    RootUnreadable { path: PathBuf, reason: String },

    /// A single file could not be read or decoded during a crawl.
    #[error("Failed to read {}: {reason}", path.display())]
    FileRead { path: PathBuf, reason: String },

    /// A structured record line could not be parsed.
    #[error("Record parse error at line {line}: {message}")]
    RecordParse { line: usize, message: String },

    /// Storage backend errors.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Analysis errors (tokenization).
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Configuration errors.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Snapshot encoding or decoding errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for operations that may fail with IndexerError.
pub type Result<T> = std::result::Result<T, IndexerError>;

impl IndexerError {
    /// Create a new store open error.
    pub fn store_open<L: Into<String>, R: Into<String>>(location: L, reason: R) -> Self {
        IndexerError::StoreOpen {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Create a new store locked error.
    pub fn store_locked<L: Into<String>>(location: L) -> Self {
        IndexerError::StoreLocked {
            location: location.into(),
        }
    }

    /// Create a recoverable write error.
    pub fn write<S: Into<String>>(msg: S) -> Self {
        IndexerError::Write {
            message: msg.into(),
            fatal: false,
        }
    }

    /// Create a write error after which the store accepts no more writes.
    pub fn fatal_write<S: Into<String>>(msg: S) -> Self {
        IndexerError::Write {
            message: msg.into(),
            fatal: true,
        }
    }

    /// Create a new invalid key error.
    pub fn invalid_key<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        IndexerError::InvalidKey {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a new file read error.
    pub fn file_read<P: Into<PathBuf>, R: Into<String>>(path: P, reason: R) -> Self {
        IndexerError::FileRead {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new record parse error.
    pub fn record_parse<S: Into<String>>(line: usize, msg: S) -> Self {
        IndexerError::RecordParse {
            line,
            message: msg.into(),
        }
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        IndexerError::Storage(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        IndexerError::Analysis(msg.into())
    }

    /// Create a new invalid config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        IndexerError::Config(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        IndexerError::Serialization(msg.into())
    }

    /// Whether this error must abort the current indexing run.
    ///
    /// Document-, file- and line-scoped errors return `false`.
    pub fn is_fatal(&self) -> bool {
        match self {
            IndexerError::StoreOpen { .. }
            | IndexerError::StoreLocked { .. }
            | IndexerError::SessionFailed(_)
            | IndexerError::SessionClosed
            | IndexerError::RootNotFound { .. }
            | IndexerError::RootUnreadable { .. }
            | IndexerError::Config(_) => true,
            IndexerError::Write { fatal, .. } => *fatal,
            IndexerError::InvalidKey { .. }
            | IndexerError::FileRead { .. }
            | IndexerError::RecordParse { .. }
            | IndexerError::Analysis(_) => false,
            IndexerError::Io(_)
            | IndexerError::Storage(_)
            | IndexerError::Serialization(_)
            | IndexerError::Json(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = IndexerError::store_open("idx", "permission denied");
        assert_eq!(
            error.to_string(),
            "Failed to open index store at idx: permission denied"
        );

        let error = IndexerError::record_parse(3, "expected value");
        assert_eq!(
            error.to_string(),
            "Record parse error at line 3: expected value"
        );

        let error = IndexerError::file_read("/tmp/a.txt", "invalid UTF-8");
        assert_eq!(error.to_string(), "Failed to read /tmp/a.txt: invalid UTF-8");
    }

    #[test]
    fn test_fatality() {
        assert!(!IndexerError::write("term too long").is_fatal());
        assert!(IndexerError::fatal_write("storage closed").is_fatal());
        assert!(IndexerError::store_locked("idx").is_fatal());
        assert!(!IndexerError::record_parse(1, "bad").is_fatal());
        assert!(!IndexerError::invalid_key("path", "missing").is_fatal());
        assert!(
            IndexerError::RootNotFound {
                path: PathBuf::from("/nope")
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = IndexerError::from(io_error);

        match error {
            IndexerError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }
}
