//! Stream header: an ordered field list plus an optional key.

use super::field::{Field, KEY_NAME};
use crate::error::{Error, Result};
use crate::pattern_match::PathPattern;
use crate::types::DataType;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a header. Every row produced under a header holds one.
pub type HeaderRef = Rc<Header>;

/// Schema of a row stream.
///
/// Fields are addressed by position; the full-name index resolves a path to
/// its position. The key is not a field: keyed rows carry it separately.
#[derive(Clone, Debug)]
pub struct Header {
    key: Option<Field>,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl Header {
    /// Creates an unkeyed header.
    pub fn new(fields: Vec<Field>) -> Self {
        Self::build(None, fields)
    }

    /// Creates a keyed header.
    pub fn with_key(fields: Vec<Field>) -> Self {
        Self::build(Some(Field::key()), fields)
    }

    /// Creates a header that is keyed iff `keyed`.
    pub fn of(keyed: bool, fields: Vec<Field>) -> Self {
        if keyed {
            Self::with_key(fields)
        } else {
            Self::new(fields)
        }
    }

    /// An unkeyed header without fields.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    fn build(key: Option<Field>, fields: Vec<Field>) -> Self {
        let mut index = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            index.entry(field.full_name().to_string()).or_insert(i);
        }
        Self { key, fields, index }
    }

    /// Wraps the header in a shared handle.
    pub fn into_ref(self) -> HeaderRef {
        Rc::new(self)
    }

    /// Returns whether rows under this header carry a key.
    #[inline]
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Returns the key field, if any.
    #[inline]
    pub fn key(&self) -> Option<&Field> {
        self.key.as_ref()
    }

    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[inline]
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Number of fields, excluding the key.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the field with the given full name.
    pub fn index_of(&self, full_name: &str) -> Option<usize> {
        self.index.get(full_name).copied()
    }

    /// Position of the field with the given full name, or a validation error.
    pub fn require_index(&self, full_name: &str) -> Result<usize> {
        self.index_of(full_name)
            .ok_or_else(|| Error::column_not_found(full_name))
    }

    /// Positions of the fields whose full name matches `pattern`, in header order.
    pub fn pattern_indices(&self, pattern: &PathPattern) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| pattern.matches(f.full_name()))
            .map(|(i, _)| i)
            .collect()
    }

    /// Data types in field order.
    pub fn data_types(&self) -> Vec<DataType> {
        self.fields.iter().map(Field::data_type).collect()
    }

    /// Returns true if `name` refers to the key rather than a field.
    pub fn is_key_name(&self, name: &str) -> bool {
        self.has_key() && name == KEY_NAME && self.index_of(name).is_none()
    }
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.has_key() == other.has_key() && self.fields == other.fields
    }
}

impl Eq for Header {}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.iter().map(Field::full_name).collect();
        if self.has_key() {
            write!(f, "[{KEY_NAME}; {}]", names.join(", "))
        } else {
            write!(f, "[{}]", names.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        Header::with_key(vec![
            Field::new("t.a", DataType::Int64),
            Field::new("t.b", DataType::Float64),
            Field::new("u.a", DataType::Binary),
        ])
    }

    #[test]
    fn test_index_of() {
        let h = sample();
        assert!(h.has_key());
        assert_eq!(h.len(), 3);
        assert_eq!(h.index_of("t.b"), Some(1));
        assert_eq!(h.index_of("missing"), None);
        assert!(h.require_index("missing").unwrap_err().is_validation());
    }

    #[test]
    fn test_pattern_indices() {
        let h = sample();
        assert_eq!(h.pattern_indices(&PathPattern::new("t.*").unwrap()), vec![0, 1]);
        assert_eq!(h.pattern_indices(&PathPattern::new("*.a").unwrap()), vec![0, 2]);
        assert_eq!(h.pattern_indices(&PathPattern::new("u.a").unwrap()), vec![2]);
    }

    #[test]
    fn test_key_name() {
        let h = sample();
        assert!(h.is_key_name("key"));
        assert!(!Header::new(vec![]).is_key_name("key"));
    }

    #[test]
    fn test_equality_ignores_index() {
        let a = sample();
        let b = sample();
        assert_eq!(a, b);
        assert_ne!(a, Header::new(a.fields().to_vec()));
    }

    #[test]
    fn test_display() {
        let h = Header::new(vec![Field::new("a", DataType::Int64)]);
        assert_eq!(h.to_string(), "[a]");
        assert_eq!(sample().to_string(), "[key; t.a, t.b, u.a]");
    }
}
