//! PathUnion: merge of streams whose field sets differ.

use crate::context::RequestContext;
use crate::stream::{close_pair, BoxedStream, RowStream};
use quarry_core::schema::{Header, HeaderRef};
use quarry_core::{Error, Result, Row, Value};

/// Merges two streams over the union of their fields.
///
/// The output has A's fields followed by B's fields that A lacks. Keyed
/// inputs are merged by ascending key; rows of both sides with the same key
/// become one row, A's values taking precedence over B's non-null ones, and
/// an overlapping-key warning is sent to the request context. Unkeyed
/// inputs yield A's rows, then B's.
pub struct PathUnionStream {
    a: BoxedStream,
    b: BoxedStream,
    warn_on_overlap: bool,
    context: Option<RequestContext>,
    header: Option<HeaderRef>,
    /// Output position of each B field.
    positions_b: Vec<usize>,
    head_a: Option<Row>,
    head_b: Option<Row>,
    overlapped: bool,
}

impl PathUnionStream {
    pub fn new(a: BoxedStream, b: BoxedStream) -> Self {
        Self {
            a,
            b,
            warn_on_overlap: true,
            context: None,
            header: None,
            positions_b: Vec::new(),
            head_a: None,
            head_b: None,
            overlapped: false,
        }
    }

    pub fn warn_on_overlapping_keys(mut self, warn: bool) -> Self {
        self.warn_on_overlap = warn;
        self
    }

    fn init(&mut self) -> Result<HeaderRef> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        let header_a = self.a.header()?;
        let header_b = self.b.header()?;
        if header_a.has_key() != header_b.has_key() {
            return Err(Error::incomparable_headers(format!(
                "path union of {header_a} and {header_b} mixes keyed and unkeyed streams"
            )));
        }
        let mut fields = header_a.fields().to_vec();
        let mut positions_b = Vec::with_capacity(header_b.len());
        for field in header_b.fields() {
            match header_a.index_of(field.full_name()) {
                Some(i) => positions_b.push(i),
                None => {
                    positions_b.push(fields.len());
                    fields.push(field.clone());
                }
            }
        }
        let header = Header::of(header_a.has_key(), fields).into_ref();
        self.positions_b = positions_b;
        self.header = Some(header.clone());
        Ok(header)
    }

    fn fill(stream: &mut BoxedStream, slot: &mut Option<Row>) -> Result<()> {
        if slot.is_none() && stream.has_next()? {
            *slot = Some(stream.next()?);
        }
        Ok(())
    }

    /// Picks the rows making up the next output row.
    fn take_heads(&mut self, keyed: bool) -> (Option<Row>, Option<Row>) {
        if !keyed {
            return match self.head_a.take() {
                Some(row) => (Some(row), None),
                None => (None, self.head_b.take()),
            };
        }
        let key_a = self.head_a.as_ref().and_then(Row::key);
        let key_b = self.head_b.as_ref().and_then(Row::key);
        match (key_a, key_b) {
            (Some(ka), Some(kb)) if ka < kb => (self.head_a.take(), None),
            (Some(ka), Some(kb)) if ka > kb => (None, self.head_b.take()),
            _ => (self.head_a.take(), self.head_b.take()),
        }
    }

    fn report_overlap(&mut self, key: i64) {
        if self.overlapped || !self.warn_on_overlap {
            return;
        }
        self.overlapped = true;
        let message = format!("path union merged rows with overlapping key {key}");
        match &self.context {
            Some(context) => context.warn(message),
            None => tracing::warn!(%message, "query warning"),
        }
    }
}

impl RowStream for PathUnionStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.init()
    }

    fn has_next(&mut self) -> Result<bool> {
        self.init()?;
        Self::fill(&mut self.a, &mut self.head_a)?;
        Self::fill(&mut self.b, &mut self.head_b)?;
        Ok(self.head_a.is_some() || self.head_b.is_some())
    }

    fn next(&mut self) -> Result<Row> {
        if !self.has_next()? {
            return Err(Error::StreamExhausted);
        }
        let header = self.init()?;
        let (row_a, row_b) = self.take_heads(header.has_key());

        let mut values = vec![Value::Null; header.len()];
        if let Some(row) = &row_a {
            values[..row.len()].clone_from_slice(row.values());
        }
        if let Some(row) = &row_b {
            for (value, &position) in row.values().iter().zip(&self.positions_b) {
                if values[position].is_null() {
                    values[position] = value.clone();
                }
            }
        }
        if let (Some(_), Some(row)) = (&row_a, &row_b) {
            if let Some(key) = row.key() {
                self.report_overlap(key);
            }
        }
        let key = row_a.as_ref().or(row_b.as_ref()).and_then(Row::key);
        Row::try_new(header, key, values)
    }

    fn close(&mut self) -> Result<()> {
        close_pair(self.a.as_mut(), self.b.as_mut())
    }

    fn set_context(&mut self, context: &RequestContext) {
        self.context = Some(context.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_util::*;
    use crate::stream::collect_rows;

    #[test]
    fn test_keyed_merge_with_overlap_warning() {
        let a = long_table(true, &["x", "y"], &[&[1, 10, 100], &[3, 30, 300]]);
        let header_b = long_header(true, &["y", "z"]);
        let b = value_table(
            header_b,
            vec![
                (Some(2), vec![Value::Int64(20), Value::Int64(2000)]),
                (Some(3), vec![Value::Int64(99), Value::Int64(3000)]),
            ],
        );
        let context = RequestContext::new();
        let mut stream = PathUnionStream::new(a, b);
        stream.set_context(&context);
        let names: Vec<String> = stream
            .header()
            .unwrap()
            .fields()
            .iter()
            .map(|f| f.full_name().to_string())
            .collect();
        assert_eq!(names, vec!["x", "y", "z"]);

        let rows = collect_rows(Box::new(stream)).unwrap();
        let keys: Vec<_> = rows.iter().map(Row::key).collect();
        assert_eq!(keys, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(longs(rows[1].values()), vec![None, Some(20), Some(2000)]);
        // A's value wins on the shared field
        assert_eq!(longs(rows[2].values()), vec![Some(30), Some(300), Some(3000)]);
        assert_eq!(context.warnings().len(), 1);
    }

    #[test]
    fn test_overlap_warning_can_be_disabled() {
        let a = long_table(true, &["x"], &[&[1, 10]]);
        let b = long_table(true, &["x"], &[&[1, 11]]);
        let context = RequestContext::new();
        let mut stream = PathUnionStream::new(a, b).warn_on_overlapping_keys(false);
        stream.set_context(&context);
        assert_eq!(drain_values(Box::new(stream)), vec![vec![Value::Int64(10)]]);
        assert!(context.is_clean());
    }

    #[test]
    fn test_unkeyed_appends() {
        let a = long_table(false, &["x"], &[&[1]]);
        let b = long_table(false, &["z"], &[&[2]]);
        let rows = drain_values(Box::new(PathUnionStream::new(a, b)));
        assert_eq!(longs(&rows[0]), vec![Some(1), None]);
        assert_eq!(longs(&rows[1]), vec![None, Some(2)]);
    }
}
