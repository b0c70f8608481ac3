//! Hash-bucketed row set used for duplicate elimination.
//!
//! Rows are bucketed by a single value: the row key for keyed set
//! operations, otherwise the first column (numeric values widened to f64 so
//! `3` and `3.0` share a bucket). Rows whose bucket value is null live in a
//! separate list scanned linearly. Bucket membership is only a hint; every
//! candidate is compared value by value, null equal to null.

use hashbrown::HashMap;
use quarry_core::{Row, Value};

/// How rows are assigned to buckets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BucketBy {
    /// By row key; keys also take part in equality.
    Key,
    /// By first column value; keys are ignored.
    FirstColumn,
}

pub(crate) struct RowSet {
    bucket_by: BucketBy,
    buckets: HashMap<Value, Vec<Row>>,
    nulls: Vec<Row>,
    len: usize,
}

impl RowSet {
    pub(crate) fn new(bucket_by: BucketBy) -> Self {
        Self {
            bucket_by,
            buckets: HashMap::new(),
            nulls: Vec::new(),
            len: 0,
        }
    }

    /// Bucketing for set operations over headers that are keyed or not.
    pub(crate) fn for_header(keyed: bool) -> Self {
        Self::new(if keyed {
            BucketBy::Key
        } else {
            BucketBy::FirstColumn
        })
    }

    fn bucket_value(&self, row: &Row) -> Value {
        match self.bucket_by {
            BucketBy::Key => row.key().map_or(Value::Null, Value::Int64),
            BucketBy::FirstColumn => row
                .values()
                .first()
                .map_or(Value::Null, Value::coerce_to_double),
        }
    }

    fn same(&self, a: &Row, b: &Row) -> bool {
        if self.bucket_by == BucketBy::Key && a.key() != b.key() {
            return false;
        }
        a.len() == b.len()
            && a
                .values()
                .iter()
                .zip(b.values())
                .all(|(x, y)| x.loose_eq(y))
    }

    /// Returns true if an equal row was inserted before.
    pub(crate) fn contains(&self, row: &Row) -> bool {
        let value = self.bucket_value(row);
        let candidates = if value.is_null() {
            self.nulls.as_slice()
        } else {
            self.buckets.get(&value).map_or(&[][..], Vec::as_slice)
        };
        candidates.iter().any(|c| self.same(c, row))
    }

    /// Inserts the row unless an equal one is present. Returns true if inserted.
    pub(crate) fn insert(&mut self, row: Row) -> bool {
        if self.contains(&row) {
            return false;
        }
        let value = self.bucket_value(&row);
        if value.is_null() {
            self.nulls.push(row);
        } else {
            self.buckets.entry(value).or_default().push(row);
        }
        self.len += 1;
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}
