//! Select stream: batched filter evaluation.

use crate::ast::{CompiledFilter, Filter};
use crate::stream::{BoxedStream, RowStream};
use quarry_core::schema::HeaderRef;
use quarry_core::{Error, Result, Row};
use std::collections::VecDeque;

/// Keeps the rows satisfying a filter.
///
/// The child is pulled `batch_size` rows at a time and the filter is
/// evaluated over the whole batch before any row is handed out; results are
/// identical to row-at-a-time evaluation. The filter is compiled once here.
pub struct SelectStream {
    input: BoxedStream,
    filter: CompiledFilter,
    batch_size: usize,
    cache: VecDeque<Row>,
}

impl SelectStream {
    pub fn new(input: BoxedStream, filter: Filter, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::invalid_parameter("select batch size must be positive"));
        }
        Ok(Self {
            input,
            filter: filter.compile()?,
            batch_size,
            cache: VecDeque::new(),
        })
    }

    fn fetch_batch(&mut self) -> Result<bool> {
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size && self.input.has_next()? {
            batch.push(self.input.next()?);
        }
        if batch.is_empty() {
            return Ok(false);
        }
        let mask = batch
            .iter()
            .map(|row| self.filter.validate(row))
            .collect::<Result<Vec<bool>>>()?;
        self.cache.extend(
            batch
                .into_iter()
                .zip(mask)
                .filter_map(|(row, keep)| keep.then_some(row)),
        );
        Ok(true)
    }
}

impl RowStream for SelectStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.input.header()
    }

    fn has_next(&mut self) -> Result<bool> {
        while self.cache.is_empty() {
            if !self.fetch_batch()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn next(&mut self) -> Result<Row> {
        if !self.has_next()? {
            return Err(Error::StreamExhausted);
        }
        self.cache.pop_front().ok_or(Error::StreamExhausted)
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}
