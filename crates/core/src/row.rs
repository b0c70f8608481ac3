//! Row definitions.

use crate::error::{Error, Result};
use crate::schema::HeaderRef;
use crate::value::Value;

/// An immutable row bound to exactly one header.
///
/// Holds one value slot per header field (null allowed in any slot) and a
/// key when the header is keyed. Operators that "modify" a row build a new one.
#[derive(Clone, Debug)]
pub struct Row {
    header: HeaderRef,
    key: Option<i64>,
    values: Vec<Value>,
}

impl Row {
    /// Creates an unkeyed row.
    pub fn new(header: HeaderRef, values: Vec<Value>) -> Self {
        debug_assert_eq!(header.len(), values.len());
        Self {
            header,
            key: None,
            values,
        }
    }

    /// Creates a keyed row.
    pub fn with_key(header: HeaderRef, key: i64, values: Vec<Value>) -> Self {
        debug_assert_eq!(header.len(), values.len());
        Self {
            header,
            key: Some(key),
            values,
        }
    }

    /// Creates a row whose key presence follows the header.
    ///
    /// Fails when the header is keyed and no key is given.
    pub fn try_new(header: HeaderRef, key: Option<i64>, values: Vec<Value>) -> Result<Self> {
        if values.len() != header.len() {
            return Err(Error::execution(format!(
                "row has {} values but header {} has {} fields",
                values.len(),
                header,
                header.len()
            )));
        }
        let key = match (header.has_key(), key) {
            (true, Some(k)) => Some(k),
            (true, None) => {
                return Err(Error::execution(format!("missing key for keyed header {header}")))
            }
            (false, _) => None,
        };
        Ok(Self {
            header,
            key,
            values,
        })
    }

    /// Rebinds the values of this row to another header of the same arity.
    pub fn rebind(&self, header: HeaderRef) -> Self {
        let key = if header.has_key() { self.key } else { None };
        Self {
            header,
            key,
            values: self.values.clone(),
        }
    }

    #[inline]
    pub fn header(&self) -> &HeaderRef {
        &self.header
    }

    /// Returns the row key, None for unkeyed rows.
    #[inline]
    pub fn key(&self) -> Option<i64> {
        self.key
    }

    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the row, returning its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of the field with the given full name.
    ///
    /// `key` resolves to the row key on keyed rows without a `key` field.
    pub fn value_of(&self, path: &str) -> Option<Value> {
        if self.header.is_key_name(path) {
            return self.key.map(Value::Int64);
        }
        self.header
            .index_of(path)
            .and_then(|i| self.values.get(i))
            .cloned()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns true if every value slot is null.
    pub fn all_null(&self) -> bool {
        self.values.iter().all(Value::is_null)
    }

    /// Dedup equality: keys must match and values are compared with
    /// null equal to null and numeric coercion.
    pub fn loose_eq(&self, other: &Row) -> bool {
        self.key == other.key
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| a.loose_eq(b))
    }
}

/// Rows compare by key and values; the header is not compared.
impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.values == other.values
    }
}
