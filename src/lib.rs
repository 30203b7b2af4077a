//! # docindex
//!
//! Document indexing sessions over a persistent, field-structured store.
//!
//! ## Features
//!
//! - Documents made of typed fields with per-field store/index policy
//! - `CREATE` and `CREATE_OR_APPEND` sessions with upsert by key field
//! - Directory crawling that skips unreadable files
//! - Inline and JSON-lines record ingestion
//! - Pluggable storage backends (directory on disk, memory)

pub mod analysis;
pub mod cli;
pub mod config;
pub mod crawl;
pub mod document;
pub mod error;
pub mod index;
pub mod ingest;
pub mod session;
pub mod storage;

pub mod prelude {
    pub use crate::config::IndexerConfig;
    pub use crate::crawl::{CrawlConfig, CrawlReport, TreeCrawler};
    pub use crate::document::{Document, Field, FieldValue, Indexing, Store};
    pub use crate::error::{IndexerError, Result};
    pub use crate::index::{IndexReader, IndexStore, OpenMode};
    pub use crate::ingest::{InlineRecord, IngestReport, LineRecordIngestor, RecordConfig};
    pub use crate::session::{IndexSession, SessionConfig, SessionState, WriteAction};
    pub use crate::storage::StorageConfig;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
