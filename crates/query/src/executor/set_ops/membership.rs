//! Except and Intersect.

use super::check_headers_comparable;
use crate::executor::dedup::RowSet;
use crate::stream::{close_pair, BoxedStream, RowStream};
use quarry_core::schema::HeaderRef;
use quarry_core::{Error, Result, Row};
use tracing::debug;

/// Which rows of A survive, judged by their presence in B.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Membership {
    /// Except: rows of A without an equal row in B.
    Absent,
    /// Intersect: rows of A with an equal row in B.
    Present,
}

impl Membership {
    fn name(self) -> &'static str {
        match self {
            Membership::Absent => "except",
            Membership::Present => "intersect",
        }
    }
}

/// Filters A by membership in B.
///
/// B is drained into a row set on first use. With `distinct`, each output
/// row is also emitted only once.
pub struct MembershipStream {
    a: BoxedStream,
    b: BoxedStream,
    keep: Membership,
    distinct: bool,
    header: Option<HeaderRef>,
    right: Option<RowSet>,
    emitted: Option<RowSet>,
    next_row: Option<Row>,
}

impl MembershipStream {
    pub fn new(a: BoxedStream, b: BoxedStream, keep: Membership, distinct: bool) -> Self {
        Self {
            a,
            b,
            keep,
            distinct,
            header: None,
            right: None,
            emitted: None,
            next_row: None,
        }
    }

    pub fn except(a: BoxedStream, b: BoxedStream, distinct: bool) -> Self {
        Self::new(a, b, Membership::Absent, distinct)
    }

    pub fn intersect(a: BoxedStream, b: BoxedStream, distinct: bool) -> Self {
        Self::new(a, b, Membership::Present, distinct)
    }

    fn init(&mut self) -> Result<HeaderRef> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        let header_a = self.a.header()?;
        let header_b = self.b.header()?;
        check_headers_comparable(&header_a, &header_b)?;

        let keyed = header_a.has_key();
        let mut right = RowSet::for_header(keyed);
        while self.b.has_next()? {
            right.insert(self.b.next()?);
        }
        debug!(rows = right.len(), op = self.keep.name(), "built right row set");
        self.right = Some(right);
        if self.distinct {
            self.emitted = Some(RowSet::for_header(keyed));
        }
        self.header = Some(header_a.clone());
        Ok(header_a)
    }

    fn keeps(&self, row: &Row) -> bool {
        let present = self.right.as_ref().is_some_and(|right| right.contains(row));
        present == (self.keep == Membership::Present)
    }
}

impl RowStream for MembershipStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.init()
    }

    fn has_next(&mut self) -> Result<bool> {
        self.init()?;
        while self.next_row.is_none() && self.a.has_next()? {
            let row = self.a.next()?;
            if !self.keeps(&row) {
                continue;
            }
            if let Some(emitted) = self.emitted.as_mut() {
                if !emitted.insert(row.clone()) {
                    continue;
                }
            }
            self.next_row = Some(row);
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
        close_pair(self.a.as_mut(), self.b.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_util::*;
    use crate::executor::DistinctStream;
    use quarry_core::schema::{Field, Header};
    use quarry_core::{DataType, Value};

    fn float_table(values: &[f64]) -> BoxedStream {
        let header = Header::new(vec![Field::new("f", DataType::Float64)]).into_ref();
        value_table(
            header,
            values.iter().map(|v| (None, vec![Value::Float64(*v)])).collect(),
        )
    }

    #[test]
    fn test_except() {
        let a = long_table(false, &["a"], &[&[1], &[2], &[2], &[3]]);
        let b = long_table(false, &["b"], &[&[3]]);
        let rows = drain_values(Box::new(MembershipStream::except(a, b, false)));
        assert_eq!(rows.len(), 3);

        let a = long_table(false, &["a"], &[&[1], &[2], &[2], &[3]]);
        let b = long_table(false, &["b"], &[&[3]]);
        let rows = drain_values(Box::new(MembershipStream::except(a, b, true)));
        assert_eq!(rows, vec![vec![Value::Int64(1)], vec![Value::Int64(2)]]);
    }

    #[test]
    fn test_except_treats_null_as_equal() {
        let header = long_header(false, &["a", "b"]);
        let a = value_table(
            header.clone(),
            vec![
                (None, vec![Value::Null, Value::Int64(1)]),
                (None, vec![Value::Null, Value::Int64(2)]),
            ],
        );
        let b = value_table(header, vec![(None, vec![Value::Null, Value::Int64(1)])]);
        let rows = drain_values(Box::new(MembershipStream::except(a, b, false)));
        assert_eq!(rows, vec![vec![Value::Null, Value::Int64(2)]]);
    }

    #[test]
    fn test_intersect() {
        let a = long_table(false, &["a"], &[&[1], &[2], &[2], &[3]]);
        let b = long_table(false, &["b"], &[&[2], &[3], &[4]]);
        let rows = drain_values(Box::new(MembershipStream::intersect(a, b, false)));
        assert_eq!(rows.len(), 3);

        let a = long_table(false, &["a"], &[&[1], &[2], &[2], &[3]]);
        let b = long_table(false, &["b"], &[&[2], &[3], &[4]]);
        let rows = drain_values(Box::new(MembershipStream::intersect(a, b, true)));
        let values: Vec<_> = rows.iter().map(|r| longs(r)).collect();
        assert_eq!(values, vec![vec![Some(2)], vec![Some(3)]]);
    }

    #[test]
    fn test_intersect_coerces_numbers() {
        let a = long_table(false, &["a"], &[&[1]]);
        let b = float_table(&[1.0]);
        assert_eq!(drain_values(Box::new(MembershipStream::intersect(a, b, true))).len(), 1);
    }

    #[test]
    fn test_nan_rows_match_themselves() {
        let input = [f64::NAN, 1.0, f64::NAN];
        for distinct in [false, true] {
            let rows = drain_values(Box::new(MembershipStream::except(
                float_table(&input),
                float_table(&input),
                distinct,
            )));
            assert!(rows.is_empty());
        }

        let intersect = drain_values(Box::new(MembershipStream::intersect(
            float_table(&input),
            float_table(&input),
            true,
        )));
        let distinct = drain_values(Box::new(DistinctStream::new(float_table(&input))));
        assert_eq!(intersect.len(), 2);
        assert_eq!(intersect, distinct);
    }
}
