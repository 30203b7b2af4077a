//! Index writer: the bundled [`IndexStore`] implementation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::analyzer::{Analyzer, AnalyzerKind};
use crate::document::{Document, Indexing};
use crate::error::{IndexerError, Result};
use crate::index::snapshot::{IndexSnapshot, IndexedDocument, StoredField};
use crate::index::{IndexStore, OpenMode, WRITE_LOCK};
use crate::storage::{Storage, StorageLock};

/// Longest exact term accepted, in UTF-8 bytes.
pub const DEFAULT_MAX_TERM_LENGTH: usize = 32766;

/// Configuration for [`IndexWriter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Commit automatically once this many changes are buffered.
    pub max_buffered_docs: usize,

    /// Documents with a longer exact-term value are rejected.
    pub max_term_length: usize,

    /// Analyzer applied to tokenized fields.
    pub analyzer: AnalyzerKind,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            max_buffered_docs: 1000,
            max_term_length: DEFAULT_MAX_TERM_LENGTH,
            analyzer: AnalyzerKind::default(),
        }
    }
}

/// Writes documents into a [`Storage`] under an exclusive lock.
///
/// All changes are applied to an in-memory [`IndexSnapshot`] and become
/// visible to readers only when committed, which happens every
/// `max_buffered_docs` changes and on close.
///
/// A commit that fails because the storage was closed or the writer lock
/// was lost is tragic: the writer refuses every later operation with a
/// fatal [`IndexerError::Write`]. Other commit failures are reported as
/// recoverable and the changes stay buffered for the next commit.
#[derive(Debug)]
pub struct IndexWriter {
    storage: Arc<dyn Storage>,
    config: WriterConfig,
    analyzer: Arc<dyn Analyzer>,
    lock: Option<Box<dyn StorageLock>>,
    snapshot: IndexSnapshot,
    pending: usize,
    tragedy: Option<String>,
    closed: bool,
}

impl IndexWriter {
    /// Open a writer over `storage`.
    ///
    /// Fails with [`IndexerError::StoreLocked`] if another writer holds
    /// the lock, or [`IndexerError::StoreOpen`] if the existing snapshot
    /// cannot be read.
    pub fn open(storage: Arc<dyn Storage>, mode: OpenMode, config: WriterConfig) -> Result<Self> {
        let analyzer = config.analyzer.build();
        Self::open_with_analyzer(storage, mode, config, analyzer)
    }

    /// Open a writer with an explicitly supplied analyzer.
    pub fn open_with_analyzer(
        storage: Arc<dyn Storage>,
        mode: OpenMode,
        config: WriterConfig,
        analyzer: Arc<dyn Analyzer>,
    ) -> Result<Self> {
        let location = storage.location();

        let lock = storage
            .lock_manager()
            .try_acquire_lock(WRITE_LOCK)
            .map_err(|e| IndexerError::store_open(&location, e.to_string()))?
            .ok_or_else(|| IndexerError::store_locked(&location))?;

        let snapshot = match mode {
            OpenMode::Create => {
                // Truncate up front so the old content is gone even if nothing is added.
                let snapshot = IndexSnapshot::default();
                snapshot
                    .save(storage.as_ref())
                    .map_err(|e| IndexerError::store_open(&location, e.to_string()))?;
                snapshot
            }
            OpenMode::CreateOrAppend => IndexSnapshot::load(storage.as_ref())
                .map_err(|e| IndexerError::store_open(&location, e.to_string()))?
                .unwrap_or_default(),
        };

        info!(
            location = %location,
            mode = %mode,
            docs = snapshot.doc_count(),
            "opened index writer"
        );

        Ok(IndexWriter {
            storage,
            config,
            analyzer,
            lock: Some(lock),
            snapshot,
            pending: 0,
            tragedy: None,
            closed: false,
        })
    }

    /// Number of live documents, committed or not.
    pub fn doc_count(&self) -> usize {
        self.snapshot.doc_count()
    }

    /// Number of changes not yet committed.
    pub fn pending_changes(&self) -> usize {
        self.pending
    }

    /// Whether the writer has hit an unrecoverable error.
    pub fn is_failed(&self) -> bool {
        self.tragedy.is_some()
    }

    fn ensure_writable(&self) -> Result<()> {
        if let Some(tragedy) = &self.tragedy {
            return Err(IndexerError::fatal_write(format!(
                "index writer failed earlier: {tragedy}"
            )));
        }
        if self.closed {
            return Err(IndexerError::fatal_write("index writer is closed"));
        }
        Ok(())
    }

    /// Turn a document into its stored and indexed form, validating it.
    ///
    /// Nothing is mutated, so a rejected document leaves the index as it was.
    fn invert(&self, doc: &Document) -> Result<IndexedDocument> {
        doc.validate()?;

        let mut indexed = IndexedDocument::default();
        for field in doc.fields() {
            let name = field.name();
            if field.is_stored() {
                indexed.stored.push(StoredField {
                    name: name.to_string(),
                    value: field.value().clone(),
                });
            }

            match field.indexing() {
                Indexing::ExactTerm => {
                    let term = field.value().to_term();
                    if term.len() > self.config.max_term_length {
                        return Err(IndexerError::write(format!(
                            "field '{name}' holds a term of {} bytes, longer than the limit of {}",
                            term.len(),
                            self.config.max_term_length
                        )));
                    }
                    indexed.terms.push((name.to_string(), term));
                }
                Indexing::Tokenized => {
                    let text = field.value().to_term();
                    let tokens = self
                        .analyzer
                        .analyze(&text)
                        .map_err(|e| IndexerError::write(format!("field '{name}': {e}")))?;
                    indexed
                        .terms
                        .extend(tokens.map(|token| (name.to_string(), token.text)));
                }
                Indexing::NumericPoint => {
                    let value = field.value().as_long().ok_or_else(|| {
                        IndexerError::write(format!(
                            "field '{name}' is a numeric point but holds '{}'",
                            field.value()
                        ))
                    })?;
                    indexed.points.push((name.to_string(), value));
                }
            }
        }

        indexed.terms.sort();
        indexed.terms.dedup();
        Ok(indexed)
    }

    /// Auto-flush after a change has been applied.
    ///
    /// The change is already in the snapshot, so only a tragic failure is
    /// returned. A recoverable one keeps the changes pending for the next
    /// commit or close, which report it.
    fn maybe_flush(&mut self) -> Result<()> {
        if self.pending < self.config.max_buffered_docs.max(1) {
            return Ok(());
        }
        match self.flush() {
            Err(e) if !e.is_fatal() => {
                warn!(
                    location = %self.storage.location(),
                    pending = self.pending,
                    error = %e,
                    "auto-flush failed, changes stay buffered"
                );
                Ok(())
            }
            result => result,
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self.snapshot.save(self.storage.as_ref()) {
            Ok(()) => {
                debug!(
                    location = %self.storage.location(),
                    changes = self.pending,
                    docs = self.snapshot.doc_count(),
                    "committed index snapshot"
                );
                self.pending = 0;
                Ok(())
            }
            Err(e) => {
                let lock_lost = self.lock.as_ref().is_none_or(|lock| !lock.is_valid());
                if self.storage.is_closed() || lock_lost {
                    let reason = e.to_string();
                    warn!(location = %self.storage.location(), error = %reason, "index writer failed");
                    self.tragedy = Some(reason.clone());
                    Err(IndexerError::fatal_write(format!("commit failed: {reason}")))
                } else {
                    Err(IndexerError::write(format!("commit failed: {e}")))
                }
            }
        }
    }
}

impl IndexStore for IndexWriter {
    fn location(&self) -> String {
        self.storage.location()
    }

    fn add(&mut self, doc: Document) -> Result<()> {
        self.ensure_writable()?;
        let indexed = self.invert(&doc)?;

        let doc_id = self.snapshot.insert(indexed);
        self.pending += 1;
        debug!(doc_id, "added document");
        self.maybe_flush()
    }

    fn replace(&mut self, key_field: &str, key_value: &str, doc: Document) -> Result<()> {
        self.ensure_writable()?;
        let indexed = self.invert(&doc)?;

        let removed = self.snapshot.delete_by_term(key_field, key_value);
        let doc_id = self.snapshot.insert(indexed);
        self.pending += 1;
        debug!(doc_id, key_field, key_value, removed, "replaced document");
        self.maybe_flush()
    }

    fn commit(&mut self) -> Result<()> {
        self.ensure_writable()?;
        if self.pending == 0 {
            return Ok(());
        }
        self.flush()
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let result = if self.tragedy.is_none() && self.pending > 0 {
            self.flush()
        } else {
            Ok(())
        };

        if let Some(mut lock) = self.lock.take()
            && let Err(e) = lock.release()
        {
            warn!(location = %self.storage.location(), error = %e, "failed to release writer lock");
        }
        self.closed = true;
        info!(
            location = %self.storage.location(),
            docs = self.snapshot.doc_count(),
            "closed index writer"
        );
        result
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if !self.closed
            && let Err(e) = self.close()
        {
            warn!(error = %e, "failed to close index writer on drop");
        }
    }
}
