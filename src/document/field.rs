//! Field values and per-field storage/indexing policy.
//!
//! # Examples
//!
//! ```
//! use docindex::document::field::{Field, FieldValue, Indexing, Store};
//!
//! let path = Field::string("path", "/docs/a.txt", Store::Stored);
//! assert_eq!(path.indexing(), Indexing::ExactTerm);
//! assert!(path.is_stored());
//!
//! let modified = Field::long_point("modified", 1_000, Store::Stored);
//! assert_eq!(modified.value(), &FieldValue::Long(1_000));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a field's original value is retrievable from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Store {
    /// Only the indexed form is kept; the value is searchable, not retrievable.
    #[default]
    #[serde(alias = "NO", alias = "no", alias = "not_stored")]
    NotStored,
    /// The original value is kept verbatim.
    #[serde(alias = "YES", alias = "yes", alias = "stored")]
    Stored,
}

/// How a field is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Indexing {
    /// The whole value is indexed as one term. Upsert keys must use this.
    ExactTerm,
    /// The value is passed through the analyzer and indexed term by term.
    Tokenized,
    /// The value is indexed as a 64-bit integer point for range lookups.
    NumericPoint,
}

/// Represents the value of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Text value
    Text(String),
    /// 64-bit integer value
    Long(i64),
}

impl FieldValue {
    /// Get the value as text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Long(_) => None,
        }
    }

    /// Get the value as an integer.
    ///
    /// Text values are accepted when they parse as a base-10 `i64`.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            FieldValue::Long(v) => Some(*v),
            FieldValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// The single term this value contributes when indexed as an exact term.
    pub fn to_term(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Long(v) => v.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Long(v) => write!(f, "{v}"),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Long(value)
    }
}

/// A named value together with its storage and indexing policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    value: FieldValue,
    store: Store,
    indexing: Indexing,
}

impl Field {
    /// Create a field with explicit policies.
    pub fn new<N, V>(name: N, value: V, store: Store, indexing: Indexing) -> Self
    where
        N: Into<String>,
        V: Into<FieldValue>,
    {
        Field {
            name: name.into(),
            value: value.into(),
            store,
            indexing,
        }
    }

    /// Create an exact-term field (indexed as a single, untokenized term).
    pub fn string<N: Into<String>, V: Into<String>>(name: N, value: V, store: Store) -> Self {
        Self::new(name, FieldValue::Text(value.into()), store, Indexing::ExactTerm)
    }

    /// Create a tokenized full-text field.
    pub fn text<N: Into<String>, V: Into<String>>(name: N, value: V, store: Store) -> Self {
        Self::new(name, FieldValue::Text(value.into()), store, Indexing::Tokenized)
    }

    /// Create a numeric point field.
    pub fn long_point<N: Into<String>>(name: N, value: i64, store: Store) -> Self {
        Self::new(name, FieldValue::Long(value), store, Indexing::NumericPoint)
    }

    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field value.
    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    /// The storage policy.
    pub fn store(&self) -> Store {
        self.store
    }

    /// The indexing policy.
    pub fn indexing(&self) -> Indexing {
        self.indexing
    }

    /// Whether the original value is kept in the store.
    pub fn is_stored(&self) -> bool {
        self.store == Store::Stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_constructors() {
        let field = Field::text("contents", "hello world", Store::NotStored);
        assert_eq!(field.name(), "contents");
        assert_eq!(field.indexing(), Indexing::Tokenized);
        assert!(!field.is_stored());

        let field = Field::long_point("modified", 42, Store::Stored);
        assert_eq!(field.value().as_long(), Some(42));
        assert_eq!(field.value().as_text(), None);
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(FieldValue::from("17").as_long(), Some(17));
        assert_eq!(FieldValue::from("seventeen").as_long(), None);
        assert_eq!(FieldValue::Long(-5).to_term(), "-5");
        assert_eq!(FieldValue::from("a b").to_string(), "a b");
    }

    #[test]
    fn test_store_serde_aliases() {
        let stored: Store = serde_json::from_str("\"STORED\"").unwrap();
        assert_eq!(stored, Store::Stored);
        let stored: Store = serde_json::from_str("\"YES\"").unwrap();
        assert_eq!(stored, Store::Stored);
        let not_stored: Store = serde_json::from_str("\"NO\"").unwrap();
        assert_eq!(not_stored, Store::NotStored);
        assert_eq!(
            serde_json::to_string(&Store::NotStored).unwrap(),
            "\"NOT_STORED\""
        );
    }
}
