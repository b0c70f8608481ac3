//! Build-side multi-map of a hash join.

use crate::stream::RowStream;
use hashbrown::hash_map::DefaultHashBuilder;
use hashbrown::HashMap;
use quarry_core::{Result, Row, Value};
use std::hash::BuildHasher;

/// Rows of the build side bucketed by the hash of their join value.
///
/// Buckets are keyed by hash only, so a bucket may hold rows whose values
/// collide without being equal; callers re-verify every candidate. Rows
/// with a null join value are kept (outer joins must emit them) but never
/// bucketed.
pub(crate) struct JoinHashTable {
    hasher: DefaultHashBuilder,
    buckets: HashMap<u64, Vec<usize>>,
    rows: Vec<Row>,
    cast: bool,
}

impl JoinHashTable {
    /// Drains `stream` into a table keyed on column `index`.
    pub fn build(stream: &mut dyn RowStream, index: usize, cast: bool) -> Result<Self> {
        let mut table = Self {
            hasher: DefaultHashBuilder::default(),
            buckets: HashMap::new(),
            rows: Vec::new(),
            cast,
        };
        while stream.has_next()? {
            let row = stream.next()?;
            if let Some(hash) = table.hash_of(&row.values()[index]) {
                table.buckets.entry(hash).or_default().push(table.rows.len());
            }
            table.rows.push(row);
        }
        Ok(table)
    }

    fn hash_of(&self, value: &Value) -> Option<u64> {
        if value.is_null() {
            return None;
        }
        Some(if self.cast {
            self.hasher.hash_one(value.coerce_to_double())
        } else {
            self.hasher.hash_one(value)
        })
    }

    /// Build rows sharing the hash of `value`, with their row numbers.
    pub fn candidates<'a>(&'a self, value: &Value) -> impl Iterator<Item = (usize, &'a Row)> + 'a {
        let bucket = self
            .hash_of(value)
            .and_then(|hash| self.buckets.get(&hash))
            .map(Vec::as_slice)
            .unwrap_or_default();
        bucket.iter().map(move |&i| (i, &self.rows[i]))
    }

    /// Every build row, in arrival order.
    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_util::{long_header, value_table};

    #[test]
    fn test_build_skips_nulls_and_coerces() {
        let header = long_header(false, &["a"]);
        let mut stream = value_table(
            header,
            vec![
                (None, vec![Value::Int64(1)]),
                (None, vec![Value::Null]),
                (None, vec![Value::Int64(1)]),
                (None, vec![Value::Int64(2)]),
            ],
        );
        let table = JoinHashTable::build(stream.as_mut(), 0, true).unwrap();
        assert_eq!(table.rows().len(), 4);
        assert_eq!(table.bucket_count(), 2);

        let hits: Vec<usize> = table.candidates(&Value::Float64(1.0)).map(|(i, _)| i).collect();
        assert_eq!(hits, vec![0, 2]);
        assert_eq!(table.candidates(&Value::Null).count(), 0);
        assert_eq!(table.candidates(&Value::Int64(3)).count(), 0);
    }
}
