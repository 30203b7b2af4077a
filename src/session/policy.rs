//! Add-or-replace decision for each submitted document.

use crate::document::{Document, Indexing};
use crate::error::{IndexerError, Result};
use crate::index::OpenMode;

/// What the session asks the store to do with one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteAction {
    /// Append without looking for a prior version.
    Add,
    /// Delete every document whose `field` term is `value`, then add.
    Replace { field: String, value: String },
}

/// Decides add vs. replace, one submission at a time, in submission order.
///
/// The very first submission of a `Create` session is always an add since
/// the index was just emptied. After that a document is replaced by key
/// when a key field is configured (or overridden) and the document
/// carries it; otherwise it is appended.
#[derive(Debug, Clone)]
pub struct UpsertPolicy {
    mode: OpenMode,
    key_field: Option<String>,
    first_write: bool,
}

impl UpsertPolicy {
    pub fn new(mode: OpenMode, key_field: Option<String>) -> Self {
        UpsertPolicy {
            mode,
            key_field,
            first_write: mode == OpenMode::Create,
        }
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn key_field(&self) -> Option<&str> {
        self.key_field.as_deref()
    }

    /// Whether the next submission will be the first of a `Create` session.
    pub fn is_first_write(&self) -> bool {
        self.first_write
    }

    /// Decide what to do with `doc`.
    ///
    /// `key_override` takes precedence over the configured key field. A
    /// key field that occurs more than once, or that is not an exact
    /// term, is rejected with [`IndexerError::InvalidKey`].
    pub fn decide(&mut self, doc: &Document, key_override: Option<&str>) -> Result<WriteAction> {
        let key = match key_override.or(self.key_field.as_deref()) {
            Some(name) => key_value(doc, name)?.map(|value| (name.to_string(), value)),
            None => None,
        };

        if self.first_write {
            self.first_write = false;
            return Ok(WriteAction::Add);
        }

        Ok(match key {
            Some((field, value)) => WriteAction::Replace { field, value },
            None => WriteAction::Add,
        })
    }
}

/// The document's value for key field `name`, if it has exactly one.
fn key_value(doc: &Document, name: &str) -> Result<Option<String>> {
    let mut fields = doc.get_all(name);
    let Some(field) = fields.next() else {
        return Ok(None);
    };
    if fields.next().is_some() {
        return Err(IndexerError::invalid_key(
            name,
            "key field occurs more than once in the document",
        ));
    }
    if field.indexing() != Indexing::ExactTerm {
        return Err(IndexerError::invalid_key(
            name,
            format!("key field must be an exact term, found {:?}", field.indexing()),
        ));
    }
    Ok(Some(field.value().to_term()))
}
