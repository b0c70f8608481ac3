//! Distinct stream.

use super::dedup::{BucketBy, RowSet};
use crate::stream::{BoxedStream, RowStream};
use quarry_core::schema::HeaderRef;
use quarry_core::{Error, Result, Row};

/// Emits each row the first time an equal row is seen.
///
/// Rows are compared on values only (keys are ignored) with null equal to
/// null. Every distinct row is kept in memory until the stream is closed.
pub struct DistinctStream {
    input: BoxedStream,
    seen: RowSet,
    next_row: Option<Row>,
}

impl DistinctStream {
    pub fn new(input: BoxedStream) -> Self {
        Self {
            input,
            seen: RowSet::new(BucketBy::FirstColumn),
            next_row: None,
        }
    }
}

impl RowStream for DistinctStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.input.header()
    }

    fn has_next(&mut self) -> Result<bool> {
        while self.next_row.is_none() && self.input.has_next()? {
            let row = self.input.next()?;
            if self.seen.insert(row.clone()) {
                self.next_row = Some(row);
            }
        }
        Ok(self.next_row.is_some())
    }

    fn next(&mut self) -> Result<Row> {
        if !self.has_next()? {
            return Err(Error::StreamExhausted);
        }
        self.next_row.take().ok_or(Error::StreamExhausted)
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_util::*;
    use quarry_core::Value;

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        let header = long_header(true, &["a", "b"]);
        let input = value_table(
            header,
            vec![
                (Some(0), vec![Value::Int64(1), Value::Int64(1)]),
                (Some(1), vec![Value::Int64(1), Value::Int64(1)]),
                (Some(2), vec![Value::Null, Value::Int64(1)]),
                (Some(3), vec![Value::Int64(1), Value::Int64(2)]),
                (Some(4), vec![Value::Null, Value::Int64(1)]),
            ],
        );
        let rows = crate::stream::collect_rows(Box::new(DistinctStream::new(input))).unwrap();
        let keys: Vec<_> = rows.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec![Some(0), Some(2), Some(3)]);
    }

    #[test]
    fn test_distinct_is_idempotent() {
        let input = long_table(false, &["a"], &[&[1], &[2], &[1], &[3], &[2]]);
        let once = DistinctStream::new(input);
        let twice = DistinctStream::new(Box::new(once));
        assert_eq!(drain_values(Box::new(twice)).len(), 3);
    }
}
