//! Inline record specifications.
//!
//! ```json
//! {
//!   "fields": [
//!     {"name": "id", "value": "1", "storage_policy": "NOT_STORED"},
//!     {"key": "name", "key_value": "nandakumar", "store": "NO"}
//!   ],
//!   "payload": {"id": "1", "name": "nandakumar"}
//! }
//! ```

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Document, Field, FieldValue, Indexing, Store};
use crate::error::{IndexerError, Result};
use crate::ingest::RecordConfig;

/// One declared exact-term field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(alias = "key")]
    pub name: String,

    #[serde(alias = "key_value")]
    pub value: String,

    #[serde(default, alias = "store")]
    pub storage_policy: Store,
}

/// A record given as explicit field descriptors plus a payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineRecord {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    #[serde(default)]
    pub payload: Value,
}

impl InlineRecord {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| IndexerError::file_read(path, e.to_string()))?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// The payload as stored: strings verbatim, anything else as compact JSON.
    pub fn payload_text(&self) -> Option<String> {
        match &self.payload {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Build the document.
    ///
    /// Every descriptor becomes an exact-term field. The payload is
    /// stored under `config.payload_field` as an exact term, or as
    /// tokenized text when `config.tokenize_payload` is set.
    pub fn to_document(&self, config: &RecordConfig) -> Result<Document> {
        let mut doc = Document::new();
        for spec in &self.fields {
            if spec.name.is_empty() {
                return Err(IndexerError::config("inline field descriptor has an empty name"));
            }
            doc.add(Field::string(&spec.name, &spec.value, spec.storage_policy));
        }

        if let Some(payload) = self.payload_text() {
            let indexing = if config.tokenize_payload {
                Indexing::Tokenized
            } else {
                Indexing::ExactTerm
            };
            doc.add(Field::new(
                &config.payload_field,
                FieldValue::Text(payload),
                Store::Stored,
                indexing,
            ));
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"{
        "fields": [
            {"key": "id", "key_value": "1", "store": "NO"},
            {"name": "name", "value": "nandakumar", "storage_policy": "STORED"}
        ],
        "payload": {"name": "nandakumar", "id": "1"}
    }"#;

    #[test]
    fn test_inline_record_to_document() {
        let record = InlineRecord::from_json(SPEC).unwrap();
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.fields[0].storage_policy, Store::NotStored);

        let doc = record.to_document(&RecordConfig::default()).unwrap();
        let names: Vec<&str> = doc.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["id", "name", "data"]);

        let id = doc.get("id").unwrap();
        assert_eq!(id.indexing(), Indexing::ExactTerm);
        assert!(!id.is_stored());
        assert!(doc.get("name").unwrap().is_stored());

        let data = doc.get("data").unwrap();
        assert!(data.is_stored());
        assert_eq!(data.indexing(), Indexing::ExactTerm);
        let payload: Value = serde_json::from_str(&data.value().to_string()).unwrap();
        assert_eq!(payload["name"], "nandakumar");
    }

    #[test]
    fn test_tokenized_payload() {
        let record = InlineRecord::from_json(r#"{"payload": "free text body"}"#).unwrap();
        let config = RecordConfig {
            tokenize_payload: true,
            payload_field: "body".to_string(),
            ..Default::default()
        };
        let doc = record.to_document(&config).unwrap();
        let body = doc.get("body").unwrap();
        assert_eq!(body.indexing(), Indexing::Tokenized);
        assert_eq!(body.value().as_text(), Some("free text body"));
    }

    #[test]
    fn test_missing_payload_is_omitted() {
        let record = InlineRecord::from_json(r#"{"fields": [{"name": "id", "value": "7"}]}"#)
            .unwrap();
        let doc = record.to_document(&RecordConfig::default()).unwrap();
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_rejects_malformed_spec() {
        assert!(InlineRecord::from_json(r#"{"fields": [{"value": "1"}]}"#).is_err());
        let record = InlineRecord::from_json(r#"{"fields": [{"name": "", "value": "1"}]}"#)
            .unwrap();
        assert!(record.to_document(&RecordConfig::default()).is_err());
    }
}
