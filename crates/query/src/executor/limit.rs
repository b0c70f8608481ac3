//! Limit stream.

use crate::stream::{BoxedStream, RowStream};
use quarry_core::schema::HeaderRef;
use quarry_core::{Error, Result, Row};

/// Skips `offset` rows, then yields at most `limit` rows.
///
/// Once `limit` rows were yielded the child is not polled again.
pub struct LimitStream {
    input: BoxedStream,
    offset: usize,
    limit: usize,
    skipped: bool,
    emitted: usize,
}

impl LimitStream {
    pub fn new(input: BoxedStream, limit: usize, offset: usize) -> Self {
        Self {
            input,
            offset,
            limit,
            skipped: false,
            emitted: 0,
        }
    }

    fn skip_offset(&mut self) -> Result<()> {
        if self.skipped {
            return Ok(());
        }
        let mut skipped = 0;
        while skipped < self.offset && self.input.has_next()? {
            self.input.next()?;
            skipped += 1;
        }
        self.skipped = true;
        Ok(())
    }
}

impl RowStream for LimitStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.input.header()
    }

    fn has_next(&mut self) -> Result<bool> {
        if self.emitted >= self.limit {
            return Ok(false);
        }
        self.skip_offset()?;
        self.input.has_next()
    }

    fn next(&mut self) -> Result<Row> {
        if !self.has_next()? {
            return Err(Error::StreamExhausted);
        }
        let row = self.input.next()?;
        self.emitted += 1;
        Ok(row)
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_util::*;
    use crate::stream::Table;
    use quarry_core::Value;

    /// Counts how many rows were pulled from the wrapped table.
    struct Counting {
        inner: Table,
        pulled: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl RowStream for Counting {
        fn header(&mut self) -> Result<HeaderRef> {
            self.inner.header()
        }
        fn has_next(&mut self) -> Result<bool> {
            self.inner.has_next()
        }
        fn next(&mut self) -> Result<Row> {
            self.pulled.set(self.pulled.get() + 1);
            self.inner.next()
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn counting(n: i64) -> (BoxedStream, std::rc::Rc<std::cell::Cell<usize>>) {
        let header = long_header(false, &["a"]);
        let rows = (0..n)
            .map(|i| Row::new(header.clone(), vec![Value::Int64(i)]))
            .collect();
        let pulled = std::rc::Rc::new(std::cell::Cell::new(0));
        let stream = Counting {
            inner: Table::new(header, rows),
            pulled: pulled.clone(),
        };
        (Box::new(stream), pulled)
    }

    #[test]
    fn test_limit_offset_slice() {
        let (input, _) = counting(10);
        let rows = drain_values(Box::new(LimitStream::new(input, 3, 2)));
        let got: Vec<_> = rows.iter().map(|r| r[0].as_i64()).collect();
        assert_eq!(got, vec![Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn test_limit_does_not_over_pull() {
        let (input, pulled) = counting(100);
        let mut stream = LimitStream::new(input, 2, 3);
        while stream.has_next().unwrap() {
            stream.next().unwrap();
        }
        assert_eq!(pulled.get(), 5);
        assert!(matches!(stream.next(), Err(Error::StreamExhausted)));
    }

    #[test]
    fn test_offset_past_end() {
        let (input, _) = counting(3);
        let rows = drain_values(Box::new(LimitStream::new(input, 5, 10)));
        assert!(rows.is_empty());
    }
}
