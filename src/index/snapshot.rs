//! In-memory inverted index and its on-storage snapshot format.
//!
//! A snapshot file is a fixed header followed by a bincode payload:
//!
//! ```text
//! magic   u32 LE  "DIDX"
//! version u32 LE
//! crc32   u32 LE  of payload
//! length  u64 LE  of payload
//! payload [u8; length]
//! ```
//!
//! Commits write the snapshot under a temporary name and rename it over
//! [`SNAPSHOT_FILE`], so a reader sees either the previous commit or the
//! new one.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::document::FieldValue;
use crate::error::{IndexerError, Result};
use crate::storage::{Storage, StorageInput};

/// Committed snapshot file name.
pub const SNAPSHOT_FILE: &str = "index.dat";

const SNAPSHOT_TEMP_FILE: &str = "index.dat.tmp";
const MAGIC: u32 = 0x5844_4944; // "DIDX" little-endian
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// A field value kept verbatim for retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredField {
    pub name: String,
    pub value: FieldValue,
}

/// One live document: what is retrievable and what it was indexed under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Stored fields in document order.
    pub stored: Vec<StoredField>,
    /// `(field, term)` pairs this document is posted under.
    pub terms: Vec<(String, String)>,
    /// `(field, value)` numeric points.
    pub points: Vec<(String, i64)>,
}

/// The full inverted state of an index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexSnapshot {
    next_doc_id: u64,
    documents: BTreeMap<u64, IndexedDocument>,
    postings: BTreeMap<String, BTreeMap<String, BTreeSet<u64>>>,
    points: BTreeMap<String, BTreeMap<i64, BTreeSet<u64>>>,
}

impl IndexSnapshot {
    /// Number of live documents.
    pub fn doc_count(&self) -> usize {
        self.documents.len()
    }

    /// Ids of all live documents, ascending.
    pub fn doc_ids(&self) -> Vec<u64> {
        self.documents.keys().copied().collect()
    }

    /// Look up a live document.
    pub fn document(&self, doc_id: u64) -> Option<&IndexedDocument> {
        self.documents.get(&doc_id)
    }

    /// Add a document and return its id.
    pub fn insert(&mut self, doc: IndexedDocument) -> u64 {
        let doc_id = self.next_doc_id;
        self.next_doc_id += 1;

        for (field, term) in &doc.terms {
            self.postings
                .entry(field.clone())
                .or_default()
                .entry(term.clone())
                .or_default()
                .insert(doc_id);
        }
        for (field, value) in &doc.points {
            self.points
                .entry(field.clone())
                .or_default()
                .entry(*value)
                .or_default()
                .insert(doc_id);
        }
        self.documents.insert(doc_id, doc);
        doc_id
    }

    /// Remove a document and every posting that points at it.
    pub fn delete(&mut self, doc_id: u64) -> bool {
        let Some(doc) = self.documents.remove(&doc_id) else {
            return false;
        };

        for (field, term) in &doc.terms {
            if let Some(terms) = self.postings.get_mut(field) {
                if let Some(ids) = terms.get_mut(term) {
                    ids.remove(&doc_id);
                    if ids.is_empty() {
                        terms.remove(term);
                    }
                }
                if terms.is_empty() {
                    self.postings.remove(field);
                }
            }
        }
        for (field, value) in &doc.points {
            if let Some(values) = self.points.get_mut(field) {
                if let Some(ids) = values.get_mut(value) {
                    ids.remove(&doc_id);
                    if ids.is_empty() {
                        values.remove(value);
                    }
                }
                if values.is_empty() {
                    self.points.remove(field);
                }
            }
        }
        true
    }

    /// Delete every document posted under `field:term`; returns how many.
    pub fn delete_by_term(&mut self, field: &str, term: &str) -> usize {
        let doc_ids = self.term_docs(field, term);
        doc_ids.into_iter().filter(|id| self.delete(*id)).count()
    }

    /// Ids of documents posted under `field:term`, ascending.
    pub fn term_docs(&self, field: &str, term: &str) -> Vec<u64> {
        self.postings
            .get(field)
            .and_then(|terms| terms.get(term))
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Ids of documents with a `field` point in `[min, max]`, ascending.
    pub fn range_docs(&self, field: &str, min: i64, max: i64) -> Vec<u64> {
        if min > max {
            return Vec::new();
        }
        let Some(values) = self.points.get(field) else {
            return Vec::new();
        };
        let ids: BTreeSet<u64> = values
            .range(min..=max)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        ids.into_iter().collect()
    }

    /// Serialize into the snapshot file format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)
            .map_err(|e| IndexerError::serialization(format!("failed to encode snapshot: {e}")))?;

        let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
        buf.write_u32::<LittleEndian>(MAGIC)?;
        buf.write_u32::<LittleEndian>(FORMAT_VERSION)?;
        buf.write_u32::<LittleEndian>(crc32fast::hash(&payload))?;
        buf.write_u64::<LittleEndian>(payload.len() as u64)?;
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Parse the snapshot file format, verifying header and checksum.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(IndexerError::serialization("snapshot is truncated"));
        }
        let mut header = &bytes[..HEADER_LEN];
        let magic = header.read_u32::<LittleEndian>()?;
        let version = header.read_u32::<LittleEndian>()?;
        let crc = header.read_u32::<LittleEndian>()?;
        let len = header.read_u64::<LittleEndian>()?;

        if magic != MAGIC {
            return Err(IndexerError::serialization("not an index snapshot"));
        }
        if version != FORMAT_VERSION {
            return Err(IndexerError::serialization(format!(
                "unsupported snapshot version {version}"
            )));
        }
        let payload = &bytes[HEADER_LEN..];
        if payload.len() as u64 != len {
            return Err(IndexerError::serialization(format!(
                "snapshot length mismatch: header says {len}, found {}",
                payload.len()
            )));
        }
        if crc32fast::hash(payload) != crc {
            return Err(IndexerError::serialization("snapshot checksum mismatch"));
        }

        bincode::deserialize(payload)
            .map_err(|e| IndexerError::serialization(format!("failed to decode snapshot: {e}")))
    }

    /// Load the committed snapshot, or `None` if the storage has none.
    pub fn load(storage: &dyn Storage) -> Result<Option<Self>> {
        if !storage.file_exists(SNAPSHOT_FILE) {
            return Ok(None);
        }
        let mut input = storage.open_input(SNAPSHOT_FILE)?;
        let size = input.size()?;
        let mut bytes = Vec::with_capacity(size as usize);
        input.read_to_end(&mut bytes)?;
        if bytes.len() as u64 != size {
            return Err(IndexerError::serialization(format!(
                "snapshot changed while reading: expected {size} bytes, read {}",
                bytes.len()
            )));
        }
        Self::decode(&bytes).map(Some)
    }

    /// Write this snapshot and publish it as the committed one.
    pub fn save(&self, storage: &dyn Storage) -> Result<()> {
        let bytes = self.encode()?;

        let mut output = storage.create_output(SNAPSHOT_TEMP_FILE)?;
        output.write_all(&bytes)?;
        output.close()?;
        storage.rename_file(SNAPSHOT_TEMP_FILE, SNAPSHOT_FILE)?;
        storage.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;

    fn doc(key: &str, words: &[&str], modified: i64) -> IndexedDocument {
        let mut terms = vec![("path".to_string(), key.to_string())];
        terms.extend(
            words
                .iter()
                .map(|w| ("contents".to_string(), w.to_string())),
        );
        IndexedDocument {
            stored: vec![StoredField {
                name: "path".to_string(),
                value: FieldValue::from(key),
            }],
            terms,
            points: vec![("modified".to_string(), modified)],
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut snapshot = IndexSnapshot::default();
        let a = snapshot.insert(doc("/a", &["hello", "world"], 10));
        let b = snapshot.insert(doc("/b", &["hello"], 20));

        assert_eq!(snapshot.doc_count(), 2);
        assert_eq!(snapshot.term_docs("contents", "hello"), vec![a, b]);
        assert_eq!(snapshot.term_docs("contents", "world"), vec![a]);
        assert_eq!(snapshot.range_docs("modified", 15, 30), vec![b]);
        assert!(snapshot.range_docs("modified", 30, 15).is_empty());
    }

    #[test]
    fn test_delete_by_term_removes_postings() {
        let mut snapshot = IndexSnapshot::default();
        snapshot.insert(doc("/a", &["hello"], 10));
        snapshot.insert(doc("/a", &["again"], 11));
        let b = snapshot.insert(doc("/b", &["hello"], 20));

        assert_eq!(snapshot.delete_by_term("path", "/a"), 2);
        assert_eq!(snapshot.doc_ids(), vec![b]);
        assert_eq!(snapshot.term_docs("contents", "hello"), vec![b]);
        assert!(snapshot.term_docs("contents", "again").is_empty());
        assert!(snapshot.range_docs("modified", 0, 15).is_empty());
        assert_eq!(snapshot.delete_by_term("path", "/a"), 0);
    }

    #[test]
    fn test_doc_ids_are_not_reused() {
        let mut snapshot = IndexSnapshot::default();
        let a = snapshot.insert(doc("/a", &[], 1));
        snapshot.delete(a);
        let b = snapshot.insert(doc("/a", &[], 2));
        assert_ne!(a, b);
    }

    #[test]
    fn test_save_and_load() {
        let storage = MemoryStorage::new_default();
        assert!(IndexSnapshot::load(&storage).unwrap().is_none());

        let mut snapshot = IndexSnapshot::default();
        snapshot.insert(doc("/a", &["hello"], 10));
        snapshot.save(&storage).unwrap();

        let loaded = IndexSnapshot::load(&storage).unwrap().unwrap();
        assert_eq!(loaded.doc_count(), 1);
        assert_eq!(loaded.term_docs("contents", "hello").len(), 1);
        assert_eq!(storage.list_files().unwrap(), vec![SNAPSHOT_FILE]);
    }

    #[test]
    fn test_decode_rejects_corruption() {
        let mut snapshot = IndexSnapshot::default();
        snapshot.insert(doc("/a", &["hello"], 10));
        let mut bytes = snapshot.encode().unwrap();

        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(IndexSnapshot::decode(&bytes).is_err());

        assert!(IndexSnapshot::decode(b"short").is_err());
        assert!(IndexSnapshot::decode(&[0u8; 32]).is_err());
    }
}
