//! Indexing sessions.
//!
//! An [`IndexSession`] owns one [`IndexStore`] for the length of an
//! indexing run. It applies the [`UpsertPolicy`] to every submitted
//! document and tracks whether the run can continue:
//!
//! ```text
//! open ──> Open ──submit──> Open
//!            │  \
//!            │   fatal store error ──> Failed
//!            └──close──> Closed
//! ```
//!
//! `Failed` and `Closed` are terminal. The store is closed exactly once,
//! by [`IndexSession::close`] or, failing that, on drop.
//!
//! # Examples
//!
//! ```
//! use docindex::document::{Document, Store};
//! use docindex::index::OpenMode;
//! use docindex::session::{IndexSession, SessionConfig};
//!
//! let config = SessionConfig::default()
//!     .with_open_mode(OpenMode::Create)
//!     .with_key_field("path");
//!
//! let stats = IndexSession::scoped(&config, |session| {
//!     for contents in ["hello world", "goodbye"] {
//!         let doc = Document::builder()
//!             .add_string("path", "/a.txt", Store::Stored)
//!             .add_text("contents", contents, Store::NotStored)
//!             .build();
//!         session.submit(doc, None)?;
//!     }
//!     Ok::<_, docindex::error::IndexerError>(session.stats())
//! })
//! .unwrap();
//!
//! assert_eq!(stats.added, 1);
//! assert_eq!(stats.replaced, 1);
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::Document;
use crate::error::{IndexerError, Result};
use crate::index::{IndexStore, IndexWriter, OpenMode, WriterConfig};
use crate::storage::{Storage, StorageConfig, StorageFactory};

pub mod policy;

pub use policy::{UpsertPolicy, WriteAction};

/// Everything needed to open a session over a configured storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Storage backend holding the index.
    pub storage: StorageConfig,

    /// Whether existing index content is kept.
    pub open_mode: OpenMode,

    /// Field used to find and replace prior versions of a document.
    pub key_field: Option<String>,

    /// Index writer tuning.
    pub writer: WriterConfig,
}

impl SessionConfig {
    pub fn new(storage: StorageConfig) -> Self {
        SessionConfig {
            storage,
            ..Default::default()
        }
    }

    pub fn with_open_mode(mut self, mode: OpenMode) -> Self {
        self.open_mode = mode;
        self
    }

    pub fn with_key_field<S: Into<String>>(mut self, key_field: S) -> Self {
        self.key_field = Some(key_field.into());
        self
    }

    pub fn with_writer(mut self, writer: WriterConfig) -> Self {
        self.writer = writer;
        self
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting submissions.
    Open,
    /// The store reported an unrecoverable error; submissions are refused.
    Failed,
    /// Closed by the caller.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Open => f.write_str("open"),
            SessionState::Failed => f.write_str("failed"),
            SessionState::Closed => f.write_str("closed"),
        }
    }
}

/// Per-session submission counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Documents written with a plain add.
    pub added: usize,
    /// Documents written with a replace-by-key.
    pub replaced: usize,
    /// Submissions refused with a recoverable error.
    pub rejected: usize,
}

impl SessionStats {
    /// Documents that reached the store.
    pub fn written(&self) -> usize {
        self.added + self.replaced
    }
}

/// One indexing run over one index store.
#[derive(Debug)]
pub struct IndexSession {
    id: Uuid,
    location: String,
    policy: UpsertPolicy,
    store: Option<Box<dyn IndexStore>>,
    state: SessionState,
    failure: Option<String>,
    stats: SessionStats,
}

impl IndexSession {
    /// Open a session on the storage described by `config`.
    ///
    /// Fails with [`IndexerError::StoreOpen`] if the storage cannot be
    /// created, or [`IndexerError::StoreLocked`] if another session holds it.
    pub fn open(config: &SessionConfig) -> Result<Self> {
        let location = config.storage.location();
        let storage = StorageFactory::create(config.storage.clone()).map_err(|e| match e {
            IndexerError::StoreOpen { .. } => e,
            other => IndexerError::store_open(location, other.to_string()),
        })?;
        Self::open_with_storage(storage, config)
    }

    /// Open a session over an already constructed storage.
    pub fn open_with_storage(storage: Arc<dyn Storage>, config: &SessionConfig) -> Result<Self> {
        let writer = IndexWriter::open(storage, config.open_mode, config.writer.clone())?;
        Ok(Self::with_store(
            Box::new(writer),
            config.open_mode,
            config.key_field.clone(),
        ))
    }

    /// Wrap an already opened store.
    ///
    /// The store is expected to have applied `mode` itself.
    pub fn with_store(
        store: Box<dyn IndexStore>,
        mode: OpenMode,
        key_field: Option<String>,
    ) -> Self {
        let id = Uuid::new_v4();
        let location = store.location();
        info!(
            session = %id,
            location = %location,
            mode = %mode,
            key_field = key_field.as_deref().unwrap_or("-"),
            "opened index session"
        );

        IndexSession {
            id,
            location,
            policy: UpsertPolicy::new(mode, key_field),
            store: Some(store),
            state: SessionState::Open,
            failure: None,
            stats: SessionStats::default(),
        }
    }

    /// Open a session, run `f` with it, and close it whatever `f` returns.
    ///
    /// An error from `f` takes precedence over an error from closing.
    pub fn scoped<T, E, F>(config: &SessionConfig, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut IndexSession) -> std::result::Result<T, E>,
        E: From<IndexerError>,
    {
        let mut session = Self::open(config)?;
        let result = f(&mut session);
        let closed = session.close();

        match result {
            Ok(value) => {
                closed?;
                Ok(value)
            }
            Err(e) => {
                if let Err(close_err) = closed {
                    warn!(session = %session.id, error = %close_err, "failed to close session after error");
                }
                Err(e)
            }
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn mode(&self) -> OpenMode {
        self.policy.mode()
    }

    pub fn key_field(&self) -> Option<&str> {
        self.policy.key_field()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    fn check_open(&self) -> Result<()> {
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Failed => Err(IndexerError::SessionFailed(
                self.failure.clone().unwrap_or_default(),
            )),
            SessionState::Closed => Err(IndexerError::SessionClosed),
        }
    }

    fn store_mut(&mut self) -> Result<&mut Box<dyn IndexStore>> {
        self.store.as_mut().ok_or(IndexerError::SessionClosed)
    }

    /// Note a store error: a fatal one fails the session.
    fn observe(&mut self, err: &IndexerError) {
        if err.is_fatal() {
            warn!(session = %self.id, location = %self.location, error = %err, "index session failed");
            self.state = SessionState::Failed;
            self.failure = Some(err.to_string());
        } else {
            warn!(session = %self.id, error = %err, "document rejected");
            self.stats.rejected += 1;
        }
    }

    /// Write one document, replacing its prior version when it has a key.
    ///
    /// `key_override` names the key field for this document only. Errors
    /// scoped to this document leave the session open; a fatal store error
    /// moves it to [`SessionState::Failed`].
    pub fn submit(&mut self, doc: Document, key_override: Option<&str>) -> Result<WriteAction> {
        self.check_open()?;

        let action = match self.policy.decide(&doc, key_override) {
            Ok(action) => action,
            Err(e) => {
                self.observe(&e);
                return Err(e);
            }
        };

        let store = self.store_mut()?;
        let result = match &action {
            WriteAction::Add => store.add(doc),
            WriteAction::Replace { field, value } => store.replace(field, value, doc),
        };

        match result {
            Ok(()) => {
                match &action {
                    WriteAction::Add => self.stats.added += 1,
                    WriteAction::Replace { .. } => self.stats.replaced += 1,
                }
                debug!(session = %self.id, ?action, "submitted document");
                Ok(action)
            }
            Err(e) => {
                self.observe(&e);
                Err(e)
            }
        }
    }

    /// Make everything submitted so far durable.
    pub fn commit(&mut self) -> Result<()> {
        self.check_open()?;
        let result = self.store_mut()?.commit();
        match &result {
            Err(e) if e.is_fatal() => self.observe(e),
            Err(e) => warn!(session = %self.id, error = %e, "commit failed, changes stay buffered"),
            Ok(()) => {}
        }
        result
    }

    /// Close the store. Later calls are no-ops.
    ///
    /// A failed session releases its store here but stays `Failed`.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut store) = self.store.take() else {
            return Ok(());
        };

        let result = store.close();
        if self.state == SessionState::Open {
            self.state = SessionState::Closed;
        }
        info!(
            session = %self.id,
            location = %self.location,
            state = %self.state,
            added = self.stats.added,
            replaced = self.stats.replaced,
            rejected = self.stats.rejected,
            "closed index session"
        );
        result
    }
}

impl Drop for IndexSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(session = %self.id, error = %e, "failed to close index session on drop");
        }
    }
}
