//! In-memory table: a materialized header plus rows.
//!
//! Tables are the leaf streams of literal plans and the argument type of
//! set-mapping and mapping functions.

use super::RowStream;
use quarry_core::schema::HeaderRef;
use quarry_core::{Error, Result, Row};

/// A fully materialized row stream.
#[derive(Clone, Debug)]
pub struct Table {
    header: HeaderRef,
    rows: Vec<Row>,
    cursor: usize,
}

impl Table {
    /// Creates a table. Rows are expected to be bound to `header`.
    pub fn new(header: HeaderRef, rows: Vec<Row>) -> Self {
        Self {
            header,
            rows,
            cursor: 0,
        }
    }

    /// Creates a table without rows.
    pub fn empty(header: HeaderRef) -> Self {
        Self::new(header, Vec::new())
    }

    /// Materializes the remaining rows of a stream.
    pub fn from_stream(stream: &mut dyn RowStream) -> Result<Self> {
        let header = stream.header()?;
        let rows = super::drain(stream)?;
        Ok(Self::new(header, rows))
    }

    #[inline]
    pub fn header_ref(&self) -> &HeaderRef {
        &self.header
    }

    /// All rows, regardless of the cursor.
    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rewinds the cursor to the first row.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

impl RowStream for Table {
    fn header(&mut self) -> Result<HeaderRef> {
        Ok(self.header.clone())
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(self.cursor < self.rows.len())
    }

    fn next(&mut self) -> Result<Row> {
        let row = self
            .rows
            .get(self.cursor)
            .cloned()
            .ok_or(Error::StreamExhausted)?;
        self.cursor += 1;
        Ok(row)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
