//! Sort stream.

use crate::ast::SortOrder;
use crate::stream::{drain, BoxedStream, RowStream, StreamState};
use quarry_core::schema::{HeaderRef, KEY_NAME};
use quarry_core::{Error, Result, Row, Value};
use std::cmp::Ordering;
use std::collections::VecDeque;
use tracing::debug;

/// Where a sort column's value comes from.
#[derive(Clone, Copy, Debug)]
enum SortColumn {
    Key,
    Field(usize),
}

/// Fully materializes the child, then replays it in sorted order.
///
/// Sorting is stable. `key` names the row key on keyed inputs. Nulls sort
/// first in ascending order.
pub struct SortStream {
    input: BoxedStream,
    sort_by: Vec<(String, SortOrder)>,
    state: StreamState,
    rows: VecDeque<Row>,
}

impl SortStream {
    pub fn new(input: BoxedStream, sort_by: Vec<(String, SortOrder)>) -> Self {
        Self {
            input,
            sort_by,
            state: StreamState::Uninitialized,
            rows: VecDeque::new(),
        }
    }

    fn init(&mut self) -> Result<()> {
        if self.state.is_initialized() {
            return Ok(());
        }
        let header = self.input.header()?;
        let mut columns = Vec::with_capacity(self.sort_by.len());
        for (name, order) in &self.sort_by {
            let column = match header.index_of(name) {
                Some(i) => SortColumn::Field(i),
                None if name == KEY_NAME && header.has_key() => SortColumn::Key,
                None => return Err(Error::column_not_found(name.clone())),
            };
            columns.push((column, *order));
        }

        let mut rows = drain(self.input.as_mut())?;
        debug!(rows = rows.len(), "sort materialized input");
        rows.sort_by(|a, b| compare_rows(a, b, &columns));
        self.rows = rows.into();
        self.state = StreamState::Initialized;
        Ok(())
    }
}

fn column_value(row: &Row, column: SortColumn) -> Value {
    match column {
        SortColumn::Key => row.key().map_or(Value::Null, Value::Int64),
        SortColumn::Field(i) => row.values()[i].clone(),
    }
}

fn compare_rows(a: &Row, b: &Row, columns: &[(SortColumn, SortOrder)]) -> Ordering {
    for (column, order) in columns {
        let cmp = column_value(a, *column).cmp(&column_value(b, *column));
        if cmp != Ordering::Equal {
            return match order {
                SortOrder::Asc => cmp,
                SortOrder::Desc => cmp.reverse(),
            };
        }
    }
    Ordering::Equal
}

impl RowStream for SortStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.input.header()
    }

    fn has_next(&mut self) -> Result<bool> {
        self.init()?;
        if self.rows.is_empty() {
            self.state = StreamState::Exhausted;
        }
        Ok(!self.rows.is_empty())
    }

    fn next(&mut self) -> Result<Row> {
        if !self.has_next()? {
            return Err(Error::StreamExhausted);
        }
        self.rows.pop_front().ok_or(Error::StreamExhausted)
    }

    fn close(&mut self) -> Result<()> {
        self.rows.clear();
        self.input.close()
    }
}
