//! Building documents from structured records.
//!
//! Two record shapes are supported:
//!
//! - [`inline::InlineRecord`]: a list of `{name, value, storage_policy}`
//!   field descriptors plus a payload object that is kept verbatim.
//! - [`jsonl::LineRecordIngestor`]: a stream of JSON objects, one per
//!   line, from which a fixed set of keys is projected into fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::Store;
use crate::error::{IndexerError, Result};

pub mod inline;
pub mod jsonl;

pub use inline::{FieldSpec, InlineRecord};
pub use jsonl::{LineDocuments, LineRecord, LineRecordIngestor};

/// What to do with a line that is not a valid record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseErrorPolicy {
    /// Log and count the line, then carry on with the next one.
    #[default]
    Skip,
    /// Stop the ingestion with the parse error.
    Abort,
}

impl fmt::Display for ParseErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorPolicy::Skip => f.write_str("skip"),
            ParseErrorPolicy::Abort => f.write_str("abort"),
        }
    }
}

impl FromStr for ParseErrorPolicy {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(ParseErrorPolicy::Skip),
            "abort" => Ok(ParseErrorPolicy::Abort),
            other => Err(IndexerError::config(format!(
                "unknown parse error policy '{other}'"
            ))),
        }
    }
}

/// Record ingestion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    /// Keys projected from each line record into exact-term fields.
    pub expected_keys: Vec<String>,

    /// Field holding the raw line.
    pub raw_field: String,

    /// Storage policy for the projected key fields.
    pub key_storage: Store,

    /// Upsert key for line records; the raw field when unset.
    pub key_field: Option<String>,

    /// Handling of lines that fail to parse.
    pub on_parse_error: ParseErrorPolicy,

    /// Field holding an inline record's payload.
    pub payload_field: String,

    /// Also tokenize the inline payload for free-text search.
    pub tokenize_payload: bool,
}

impl Default for RecordConfig {
    fn default() -> Self {
        RecordConfig {
            expected_keys: vec![
                "username".to_string(),
                "email".to_string(),
                "status".to_string(),
            ],
            raw_field: "details".to_string(),
            key_storage: Store::NotStored,
            key_field: None,
            on_parse_error: ParseErrorPolicy::Skip,
            payload_field: "data".to_string(),
            tokenize_payload: false,
        }
    }
}

impl RecordConfig {
    /// The field line records are upserted by.
    pub fn upsert_key(&self) -> &str {
        self.key_field.as_deref().unwrap_or(&self.raw_field)
    }
}

/// Outcome of one record ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Records written to the session.
    pub submitted: usize,
    /// Blank lines skipped.
    pub blank_lines: usize,
    /// Lines skipped because they were not valid records.
    pub parse_errors: usize,
    /// Records the session rejected with a recoverable error.
    pub write_errors: usize,
    /// Whether the run stopped early on request.
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_config_defaults() {
        let config = RecordConfig::default();
        assert_eq!(config.expected_keys, vec!["username", "email", "status"]);
        assert_eq!(config.upsert_key(), "details");
        assert_eq!(config.on_parse_error, ParseErrorPolicy::Skip);

        let config: RecordConfig =
            serde_json::from_str(r#"{"raw_field": "line", "on_parse_error": "abort"}"#).unwrap();
        assert_eq!(config.upsert_key(), "line");
        assert_eq!(config.on_parse_error, ParseErrorPolicy::Abort);
        assert_eq!(config.payload_field, "data");
    }

    #[test]
    fn test_parse_error_policy_from_str() {
        assert_eq!("ABORT".parse::<ParseErrorPolicy>().unwrap(), ParseErrorPolicy::Abort);
        assert!("ignore".parse::<ParseErrorPolicy>().is_err());
    }
}
