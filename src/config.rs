//! Configuration file support.
//!
//! An [`IndexerConfig`] is read from JSON. Every section is optional:
//!
//! ```json
//! {
//!   "storage": {"type": "file", "path": "index"},
//!   "open_mode": "CREATE_OR_APPEND",
//!   "key_field": "path",
//!   "writer": {"max_buffered_docs": 500},
//!   "records": {"expected_keys": ["username", "email"], "on_parse_error": "abort"},
//!   "crawl": {"follow_links": true}
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crawl::CrawlConfig;
use crate::error::{IndexerError, Result};
use crate::ingest::RecordConfig;
use crate::session::SessionConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Storage, open mode, key field and writer settings.
    #[serde(flatten)]
    pub session: SessionConfig,

    pub records: RecordConfig,

    pub crawl: CrawlConfig,
}

impl IndexerConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            IndexerError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: IndexerConfig = serde_json::from_str(json)
            .map_err(|e| IndexerError::config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.session.key_field.as_deref() == Some("") {
            return Err(IndexerError::config("key_field must not be empty"));
        }
        if self.session.writer.max_term_length == 0 {
            return Err(IndexerError::config("writer.max_term_length must be positive"));
        }
        if self.records.raw_field.is_empty() {
            return Err(IndexerError::config("records.raw_field must not be empty"));
        }
        if self.records.payload_field.is_empty() {
            return Err(IndexerError::config("records.payload_field must not be empty"));
        }
        Ok(())
    }
}
