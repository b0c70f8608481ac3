//! UnionAll and UnionDistinct.

use super::check_headers_comparable;
use crate::executor::dedup::RowSet;
use crate::stream::{close_pair, BoxedStream, RowStream};
use quarry_core::schema::HeaderRef;
use quarry_core::{Error, Result, Row};

/// Shared header handling: both headers are checked once and B's rows are
/// rebound to A's header.
struct Sides {
    a: BoxedStream,
    b: BoxedStream,
    header: Option<HeaderRef>,
}

impl Sides {
    fn init(&mut self) -> Result<HeaderRef> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        let header_a = self.a.header()?;
        let header_b = self.b.header()?;
        check_headers_comparable(&header_a, &header_b)?;
        self.header = Some(header_a.clone());
        Ok(header_a)
    }

    /// Next row of A, then of B, bound to the output header.
    fn pull(&mut self) -> Result<Option<Row>> {
        let header = self.init()?;
        if self.a.has_next()? {
            return self.a.next().map(Some);
        }
        if self.b.has_next()? {
            return Ok(Some(self.b.next()?.rebind(header)));
        }
        Ok(None)
    }
}

/// All rows of A followed by all rows of B.
pub struct UnionAllStream {
    sides: Sides,
    next_row: Option<Row>,
}

impl UnionAllStream {
    pub fn new(a: BoxedStream, b: BoxedStream) -> Self {
        Self {
            sides: Sides { a, b, header: None },
            next_row: None,
        }
    }
}

impl RowStream for UnionAllStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.sides.init()
    }

    fn has_next(&mut self) -> Result<bool> {
        if self.next_row.is_none() {
            self.next_row = self.sides.pull()?;
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
        close_pair(self.sides.a.as_mut(), self.sides.b.as_mut())
    }
}

/// Rows of A then B, each distinct row once.
///
/// Every emitted row is kept for deduplication until the stream is closed.
pub struct UnionDistinctStream {
    sides: Sides,
    seen: Option<RowSet>,
    next_row: Option<Row>,
}

impl UnionDistinctStream {
    pub fn new(a: BoxedStream, b: BoxedStream) -> Self {
        Self {
            sides: Sides { a, b, header: None },
            seen: None,
            next_row: None,
        }
    }
}

impl RowStream for UnionDistinctStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.sides.init()
    }

    fn has_next(&mut self) -> Result<bool> {
        let keyed = self.sides.init()?.has_key();
        let seen = self.seen.get_or_insert_with(|| RowSet::for_header(keyed));
        while self.next_row.is_none() {
            let Some(row) = self.sides.pull()? else {
                break;
            };
            if seen.insert(row.clone()) {
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
        close_pair(self.sides.a.as_mut(), self.sides.b.as_mut())
    }
}
