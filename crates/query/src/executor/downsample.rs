//! Downsample stream: windowed aggregation over a keyed input.

use crate::function::FunctionCall;
use crate::stream::{BoxedStream, RowStream, Table};
use quarry_core::schema::{Field, Header, HeaderRef};
use quarry_core::{DataType, Error, Result, Row, Value};
use std::collections::VecDeque;
use tracing::trace;

/// Name of the column holding the inclusive window start.
pub const WINDOW_START: &str = "window_start";
/// Name of the column holding the exclusive window end.
pub const WINDOW_END: &str = "window_end";

/// Window results before they are bound to the output header.
struct Window {
    start: i64,
    results: Vec<Option<Row>>,
}

/// Aggregates a keyed input over windows `[start, start + precision)`,
/// with starts at `begin + n * slide`.
///
/// A row takes part in every window that contains it, so `slide <
/// precision` yields overlapping windows and `slide > precision` leaves
/// gaps whose rows are skipped. Rows outside `[begin, end)` are ignored and
/// windows without rows produce no output. The input must be ordered by key.
///
/// Output rows are keyed by window start and carry `window_start`,
/// `window_end`, then the concatenated call results.
pub struct DownsampleStream {
    input: BoxedStream,
    precision: i64,
    slide: i64,
    begin: i64,
    end: i64,
    calls: Vec<FunctionCall>,
    input_header: Option<HeaderRef>,
    header: Option<HeaderRef>,
    call_widths: Vec<usize>,
    buffer: VecDeque<Row>,
    input_done: bool,
    next_start: i64,
    pending: Option<Row>,
}

impl DownsampleStream {
    pub fn new(
        input: BoxedStream,
        precision: i64,
        slide: i64,
        begin: i64,
        end: i64,
        calls: Vec<FunctionCall>,
    ) -> Result<Self> {
        if precision <= 0 || slide <= 0 {
            return Err(Error::invalid_parameter(format!(
                "downsample precision ({precision}) and slide ({slide}) must be positive"
            )));
        }
        if begin >= end {
            return Err(Error::invalid_parameter(format!(
                "downsample range [{begin}, {end}) is empty"
            )));
        }
        Ok(Self {
            input,
            precision,
            slide,
            begin,
            end,
            calls,
            input_header: None,
            header: None,
            call_widths: Vec::new(),
            buffer: VecDeque::new(),
            input_done: false,
            next_start: begin,
            pending: None,
        })
    }

    /// Pulls the next in-range row from the child.
    fn pull(&mut self) -> Result<Option<Row>> {
        while !self.input_done {
            if !self.input.has_next()? {
                self.input_done = true;
                break;
            }
            let row = self.input.next()?;
            let key = row
                .key()
                .ok_or_else(|| Error::execution("downsample input row has no key"))?;
            if key >= self.begin && key < self.end {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    /// Earliest aligned window start whose window contains `key`, not
    /// before the next pending start.
    fn window_start_for(&self, key: i64) -> i64 {
        let offset = i128::from(key) - i128::from(self.precision) + 1 - i128::from(self.begin);
        let slide = i128::from(self.slide);
        let n = if offset <= 0 { 0 } else { (offset + slide - 1) / slide };
        let start = i128::from(self.begin) + n * slide;
        let start = i64::try_from(start).unwrap_or(i64::MAX);
        start.max(self.next_start)
    }

    fn key_of(row: &Row) -> i64 {
        row.key().unwrap_or(i64::MIN)
    }

    fn next_window(&mut self) -> Result<Option<Window>> {
        loop {
            if self.buffer.is_empty() {
                match self.pull()? {
                    Some(row) => self.buffer.push_back(row),
                    None => return Ok(None),
                }
            }
            let first = self.buffer.front().map_or(i64::MIN, Self::key_of);
            let start = self.window_start_for(first);
            while self.buffer.front().is_some_and(|r| Self::key_of(r) < start) {
                self.buffer.pop_front();
            }
            if self.buffer.is_empty() {
                continue;
            }

            let window_end = start.saturating_add(self.precision);
            while self.buffer.back().is_some_and(|r| Self::key_of(r) < window_end) {
                match self.pull()? {
                    Some(row) => self.buffer.push_back(row),
                    None => break,
                }
            }

            let rows: Vec<Row> = self
                .buffer
                .iter()
                .take_while(|r| Self::key_of(r) < window_end)
                .cloned()
                .collect();
            trace!(start, rows = rows.len(), "downsample window");

            let header = self
                .input_header
                .clone()
                .ok_or_else(|| Error::execution("downsample header not initialized"))?;
            let table = Table::new(header, rows);
            let results = self
                .calls
                .iter()
                .map(|call| call.call_set(&table))
                .collect::<Result<Vec<_>>>()?;

            self.next_start = start.saturating_add(self.slide);
            while self
                .buffer
                .front()
                .is_some_and(|r| Self::key_of(r) < self.next_start)
            {
                self.buffer.pop_front();
            }
            return Ok(Some(Window { start, results }));
        }
    }

    fn assemble(&self, header: &HeaderRef, window: Window) -> Result<Row> {
        let mut values = vec![
            Value::Int64(window.start),
            Value::Int64(window.start.saturating_add(self.precision)),
        ];
        for (c, result) in window.results.into_iter().enumerate() {
            let width = self.call_widths[c];
            match result {
                Some(row) if row.len() == width => values.extend(row.into_values()),
                Some(row) => {
                    return Err(Error::execution(format!(
                        "function {} returned {} columns, expected {}",
                        self.calls[c].identifier(),
                        row.len(),
                        width
                    )))
                }
                None => values.extend(std::iter::repeat(Value::Null).take(width)),
            }
        }
        Ok(Row::with_key(header.clone(), window.start, values))
    }

    fn init(&mut self) -> Result<HeaderRef> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        let input = self.input.header()?;
        if !input.has_key() {
            return Err(Error::invalid_parameter("downsample requires a keyed input"));
        }
        self.input_header = Some(input);

        let first = self.next_window()?;
        let mut fields = vec![
            Field::new(WINDOW_START, DataType::Int64),
            Field::new(WINDOW_END, DataType::Int64),
        ];
        self.call_widths = vec![0; self.calls.len()];
        if let Some(window) = &first {
            for (c, result) in window.results.iter().enumerate() {
                if let Some(row) = result {
                    fields.extend(row.header().fields().iter().cloned());
                    self.call_widths[c] = row.len();
                }
            }
        }
        let header = Header::with_key(fields).into_ref();
        if let Some(window) = first {
            self.pending = Some(self.assemble(&header, window)?);
        }
        self.header = Some(header.clone());
        Ok(header)
    }
}

impl RowStream for DownsampleStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.init()
    }

    fn has_next(&mut self) -> Result<bool> {
        let header = self.init()?;
        if self.pending.is_none() {
            if let Some(window) = self.next_window()? {
                self.pending = Some(self.assemble(&header, window)?);
            }
        }
        Ok(self.pending.is_some())
    }

    fn next(&mut self) -> Result<Row> {
        if !self.has_next()? {
            return Err(Error::StreamExhausted);
        }
        self.pending.take().ok_or(Error::StreamExhausted)
    }

    fn close(&mut self) -> Result<()> {
        self.buffer.clear();
        self.input.close()
    }
}
