//! Read-only view over the last committed snapshot.

use std::sync::Arc;

use crate::analysis::analyzer::{Analyzer, StandardAnalyzer};
use crate::document::FieldValue;
use crate::error::Result;
use crate::index::snapshot::{IndexSnapshot, StoredField};
use crate::storage::Storage;

/// A document as it can be retrieved: only its STORED fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub id: u64,
    pub fields: Vec<StoredField>,
}

impl StoredDocument {
    /// The first stored value with the given name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    /// Every stored value with the given name.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FieldValue> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.name == name)
            .map(|f| &f.value)
    }
}

/// Opens the committed snapshot without taking the writer lock.
///
/// The reader sees the index as of the moment it was opened. Changes a
/// writer has buffered but not committed are invisible.
#[derive(Debug)]
pub struct IndexReader {
    snapshot: IndexSnapshot,
    analyzer: Arc<dyn Analyzer>,
}

impl IndexReader {
    /// Open with the standard analyzer. An empty storage reads as an empty index.
    pub fn open(storage: &dyn Storage) -> Result<Self> {
        Self::with_analyzer(storage, Arc::new(StandardAnalyzer::new()))
    }

    /// Open, analyzing query text with `analyzer`.
    pub fn with_analyzer(storage: &dyn Storage, analyzer: Arc<dyn Analyzer>) -> Result<Self> {
        let snapshot = IndexSnapshot::load(storage)?.unwrap_or_default();
        Ok(IndexReader { snapshot, analyzer })
    }

    pub fn doc_count(&self) -> usize {
        self.snapshot.doc_count()
    }

    pub fn doc_ids(&self) -> Vec<u64> {
        self.snapshot.doc_ids()
    }

    /// Documents posted under the exact term `field:term`.
    pub fn term_docs(&self, field: &str, term: &str) -> Vec<u64> {
        self.snapshot.term_docs(field, term)
    }

    /// The stored form of a live document.
    pub fn document(&self, doc_id: u64) -> Option<StoredDocument> {
        self.snapshot.document(doc_id).map(|doc| StoredDocument {
            id: doc_id,
            fields: doc.stored.clone(),
        })
    }

    /// Documents with a numeric point on `field` within `[min, max]`.
    pub fn numeric_range(&self, field: &str, min: i64, max: i64) -> Vec<u64> {
        self.snapshot.range_docs(field, min, max)
    }

    /// Documents matching every term the analyzer produces for `text`.
    ///
    /// Returns nothing if `text` yields no terms.
    pub fn analyzed_docs(&self, field: &str, text: &str) -> Result<Vec<u64>> {
        let mut result: Option<Vec<u64>> = None;
        for token in self.analyzer.analyze(text)? {
            let docs = self.snapshot.term_docs(field, &token.text);
            result = Some(match result {
                None => docs,
                Some(prev) => prev.into_iter().filter(|id| docs.contains(id)).collect(),
            });
        }
        Ok(result.unwrap_or_default())
    }

    /// Stored forms of every document whose `field` term equals `value`.
    pub fn find_by_key(&self, field: &str, value: &str) -> Vec<StoredDocument> {
        self.term_docs(field, value)
            .into_iter()
            .filter_map(|id| self.document(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Store};
    use crate::index::{IndexStore, IndexWriter, OpenMode, WriterConfig};
    use crate::storage::memory::MemoryStorage;

    #[test]
    fn test_empty_storage_reads_as_empty_index() {
        let storage = MemoryStorage::new_default();
        let reader = IndexReader::open(&storage).unwrap();
        assert_eq!(reader.doc_count(), 0);
        assert!(reader.document(0).is_none());
    }

    #[test]
    fn test_stored_and_searchable_fields() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
        let mut writer =
            IndexWriter::open(storage.clone(), OpenMode::Create, WriterConfig::default()).unwrap();
        writer
            .add(
                Document::builder()
                    .add_string("path", "/a.txt", Store::Stored)
                    .add_long_point("modified", 1000, Store::Stored)
                    .add_text("contents", "Hello, World!", Store::NotStored)
                    .build(),
            )
            .unwrap();
        writer.close().unwrap();

        let reader = IndexReader::open(storage.as_ref()).unwrap();
        let docs = reader.find_by_key("path", "/a.txt");
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.get("path").unwrap().as_text(), Some("/a.txt"));
        assert_eq!(doc.get("modified").unwrap().as_long(), Some(1000));
        assert!(doc.get("contents").is_none());

        assert_eq!(reader.analyzed_docs("contents", "hello").unwrap(), vec![doc.id]);
        assert_eq!(
            reader.analyzed_docs("contents", "WORLD hello").unwrap(),
            vec![doc.id]
        );
        assert!(reader.analyzed_docs("contents", "goodbye").unwrap().is_empty());
        assert!(reader.analyzed_docs("contents", "  ").unwrap().is_empty());
        assert_eq!(reader.numeric_range("modified", 0, 1000), vec![doc.id]);
        assert!(reader.numeric_range("modified", 1001, 2000).is_empty());
    }
}
