//! Document structure.

use serde::{Deserialize, Serialize};

use crate::document::field::{Field, FieldValue, Store};
use crate::error::{IndexerError, Result};

/// A document represents a single item to be indexed.
///
/// Field order is preserved and names may repeat; a repeated name is
/// indexed as a multi-valued field. Documents are built transiently and
/// handed to an index session exactly once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    fields: Vec<Field>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Document { fields: Vec::new() }
    }

    /// Append a field to the document.
    pub fn add(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// All fields, in insertion order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The first field with the given name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Every field with the given name.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields.iter().filter(move |f| f.name() == name)
    }

    /// The value of the first field with the given name.
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.get(name).map(Field::value)
    }

    /// Check if the document has a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check structural validity: at least one field, no empty field names.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(IndexerError::write("document has no fields"));
        }
        if self.fields.iter().any(|f| f.name().is_empty()) {
            return Err(IndexerError::write("document has a field with an empty name"));
        }
        Ok(())
    }

    /// Create a builder for constructing documents.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }
}

/// A builder for constructing documents in a fluent manner.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Create a new document builder.
    pub fn new() -> Self {
        DocumentBuilder {
            document: Document::new(),
        }
    }

    /// Add an exact-term field.
    pub fn add_string<N: Into<String>, V: Into<String>>(
        mut self,
        name: N,
        value: V,
        store: Store,
    ) -> Self {
        self.document.add(Field::string(name, value, store));
        self
    }

    /// Add a tokenized text field.
    pub fn add_text<N: Into<String>, V: Into<String>>(
        mut self,
        name: N,
        value: V,
        store: Store,
    ) -> Self {
        self.document.add(Field::text(name, value, store));
        self
    }

    /// Add a numeric point field.
    pub fn add_long_point<N: Into<String>>(mut self, name: N, value: i64, store: Store) -> Self {
        self.document.add(Field::long_point(name, value, store));
        self
    }

    /// Add an already constructed field.
    pub fn add_field(mut self, field: Field) -> Self {
        self.document.add(field);
        self
    }

    /// Build the final document.
    pub fn build(self) -> Document {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::field::Indexing;

    #[test]
    fn test_builder_preserves_order() {
        let doc = Document::builder()
            .add_string("path", "/a.txt", Store::Stored)
            .add_long_point("modified", 1000, Store::Stored)
            .add_text("contents", "hello world", Store::NotStored)
            .build();

        let names: Vec<&str> = doc.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["path", "modified", "contents"]);
        assert_eq!(doc.get("modified").unwrap().indexing(), Indexing::NumericPoint);
        assert_eq!(doc.value("path").unwrap().as_text(), Some("/a.txt"));
    }

    #[test]
    fn test_multi_valued_fields() {
        let doc = Document::builder()
            .add_string("tag", "a", Store::Stored)
            .add_string("tag", "b", Store::Stored)
            .build();

        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get_all("tag").count(), 2);
        assert_eq!(doc.value("tag").unwrap().as_text(), Some("a"));
    }

    #[test]
    fn test_validate() {
        assert!(Document::new().validate().is_err());

        let doc = Document::builder()
            .add_string("", "x", Store::Stored)
            .build();
        assert!(doc.validate().is_err());

        let doc = Document::builder()
            .add_string("id", "1", Store::NotStored)
            .build();
        assert!(doc.validate().is_ok());
    }
}
