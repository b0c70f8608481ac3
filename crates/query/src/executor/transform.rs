//! Function-call dispatch: RowTransform, SetTransform and MappingTransform.
//!
//! Results of several calls are combined by concatenating their columns in
//! call order.

use super::join::{JoinBy, JoinByStream};
use super::set_ops::PathUnionStream;
use crate::function::{distinct_projection, Function, FunctionCall, InputKey};
use crate::context::RequestContext;
use crate::stream::{BoxedStream, RowStream, Table};
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use quarry_core::schema::{Field, Header, HeaderRef};
use quarry_core::{Error, Result, Row, Value};
use tracing::debug;

/// Concatenates the values of several result rows.
fn combine_values(results: Vec<Row>) -> Vec<Value> {
    results.into_iter().flat_map(Row::into_values).collect()
}

/// Concatenates the fields of several result rows.
fn combine_fields(results: &[Row]) -> Vec<Field> {
    results
        .iter()
        .flat_map(|r| r.header().fields().iter().cloned())
        .collect()
}

/// Applies row-mapping calls to every input row.
///
/// Input rows for which no call yields a result are skipped. The header is
/// taken from the first produced row and keeps the input's key.
pub struct RowTransformStream {
    input: BoxedStream,
    calls: Vec<FunctionCall>,
    header: Option<HeaderRef>,
    next_row: Option<Row>,
}

impl RowTransformStream {
    pub fn new(input: BoxedStream, calls: Vec<FunctionCall>) -> Self {
        Self {
            input,
            calls,
            header: None,
            next_row: None,
        }
    }

    /// Transforms input rows until one produces output.
    fn fetch(&mut self) -> Result<Option<(Option<i64>, Vec<Row>)>> {
        while self.input.has_next()? {
            let row = self.input.next()?;
            let mut results = Vec::with_capacity(self.calls.len());
            for call in &self.calls {
                if let Some(result) = call.call_row(&row)? {
                    results.push(result);
                }
            }
            if !results.is_empty() {
                return Ok(Some((row.key(), results)));
            }
        }
        Ok(None)
    }

    fn init(&mut self) -> Result<HeaderRef> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        let keyed = self.input.header()?.has_key();
        let first = self.fetch()?;
        let fields = first
            .as_ref()
            .map(|(_, results)| combine_fields(results))
            .unwrap_or_default();
        let header = Header::of(keyed, fields).into_ref();
        if let Some((key, results)) = first {
            self.next_row = Some(Row::try_new(header.clone(), key, combine_values(results))?);
        }
        self.header = Some(header.clone());
        Ok(header)
    }
}

impl RowStream for RowTransformStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.init()
    }

    fn has_next(&mut self) -> Result<bool> {
        let header = self.init()?;
        if self.next_row.is_none() {
            if let Some((key, results)) = self.fetch()? {
                self.next_row = Some(Row::try_new(header, key, combine_values(results))?);
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

/// Applies set-mapping calls to the whole materialized input, yielding at
/// most one unkeyed row.
///
/// Calls asking for `DISTINCT` over the same paths share one deduplicated
/// copy of the input.
pub struct SetTransformStream {
    input: BoxedStream,
    calls: Vec<FunctionCall>,
    header: Option<HeaderRef>,
    row: Option<Row>,
}

impl SetTransformStream {
    pub fn new(input: BoxedStream, calls: Vec<FunctionCall>) -> Self {
        Self {
            input,
            calls,
            header: None,
            row: None,
        }
    }

    fn init(&mut self) -> Result<HeaderRef> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        let table = Table::from_stream(self.input.as_mut())?;
        let mut views: HashMap<InputKey, Table> = HashMap::new();
        let mut results = Vec::with_capacity(self.calls.len());
        for call in &self.calls {
            let result = match call.input_key() {
                InputKey::Unfiltered => call.call_set_on(&table)?,
                InputKey::Distinct(paths) => {
                    let view = match views.entry(InputKey::Distinct(paths)) {
                        Entry::Occupied(entry) => entry.into_mut(),
                        Entry::Vacant(entry) => {
                            let view = distinct_projection(&table, &call.params.paths)
                                .map_err(|e| Error::function_failure(call.identifier(), e))?;
                            entry.insert(view)
                        }
                    };
                    call.call_set_on(view)?
                }
            };
            if let Some(row) = result {
                results.push(row);
            }
        }
        debug!(rows = table.len(), views = views.len(), "set transform evaluated");

        let header = Header::new(combine_fields(&results)).into_ref();
        if !results.is_empty() {
            self.row = Some(Row::new(header.clone(), combine_values(results)));
        }
        self.header = Some(header.clone());
        Ok(header)
    }
}

impl RowStream for SetTransformStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.init()
    }

    fn has_next(&mut self) -> Result<bool> {
        self.init()?;
        Ok(self.row.is_some())
    }

    fn next(&mut self) -> Result<Row> {
        if !self.has_next()? {
            return Err(Error::StreamExhausted);
        }
        self.row.take().ok_or(Error::StreamExhausted)
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}

/// Applies table-to-table calls to the whole materialized input.
///
/// When every call merges by key (`first`, `last`) the result tables are
/// merged like PathUnion, otherwise they are joined by position.
pub struct MappingTransformStream {
    input: BoxedStream,
    calls: Vec<FunctionCall>,
    context: Option<RequestContext>,
    output: Option<BoxedStream>,
}

impl MappingTransformStream {
    pub fn new(input: BoxedStream, calls: Vec<FunctionCall>) -> Self {
        Self {
            input,
            calls,
            context: None,
            output: None,
        }
    }

    fn init(&mut self) -> Result<&mut BoxedStream> {
        if self.output.is_none() {
            let table = Table::from_stream(self.input.as_mut())?;
            let merge_by_key = self.calls.iter().all(|c| match &c.function {
                Function::Mapping(f) => f.merges_by_key(),
                _ => false,
            });
            let mut combined: Option<BoxedStream> = None;
            for call in &self.calls {
                let Some(result) = call.call_mapping(&table)? else {
                    continue;
                };
                let result: BoxedStream = Box::new(result);
                combined = Some(match combined {
                    None => result,
                    Some(prev) if merge_by_key => Box::new(PathUnionStream::new(prev, result)),
                    Some(prev) => Box::new(JoinByStream::new(prev, result, JoinBy::Ordinal)),
                });
            }
            let mut output =
                combined.unwrap_or_else(|| Box::new(Table::empty(Header::empty().into_ref())));
            if let Some(context) = &self.context {
                output.set_context(context);
            }
            self.output = Some(output);
        }
        self.output
            .as_mut()
            .ok_or_else(|| Error::execution("mapping transform output missing"))
    }
}

impl RowStream for MappingTransformStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.init()?.header()
    }

    fn has_next(&mut self) -> Result<bool> {
        self.init()?.has_next()
    }

    fn next(&mut self) -> Result<Row> {
        self.init()?.next()
    }

    fn close(&mut self) -> Result<()> {
        let output = match self.output.as_mut() {
            Some(output) => output.close(),
            None => Ok(()),
        };
        let input = self.input.close();
        output.and(input)
    }

    fn set_context(&mut self, context: &RequestContext) {
        self.context = Some(context.clone());
    }
}
