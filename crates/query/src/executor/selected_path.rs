//! ValueToSelectedPath stream.

use crate::stream::{BoxedStream, RowStream};
use quarry_core::schema::{Field, Header, HeaderRef};
use quarry_core::{DataType, Error, Result, Row, Value};
use std::collections::VecDeque;

/// Name of the single output column.
pub const SELECTED_PATH: &str = "SelectedPath";

/// Turns every cell of the input into a column path: one output row per
/// non-null, non-empty cell, holding `prefix.value` (or the bare value).
///
/// The output is unkeyed and has the single Binary column [`SELECTED_PATH`].
/// Rows are produced in input order, cells left to right.
pub struct ValueToSelectedPathStream {
    input: BoxedStream,
    prefix: Option<String>,
    header: HeaderRef,
    pending: VecDeque<Row>,
}

impl ValueToSelectedPathStream {
    pub fn new(input: BoxedStream, prefix: Option<String>) -> Self {
        let header = Header::new(vec![Field::new(SELECTED_PATH, DataType::Binary)]).into_ref();
        Self {
            input,
            prefix: prefix.filter(|p| !p.is_empty()),
            header,
            pending: VecDeque::new(),
        }
    }

    fn path_of(&self, value: &Value) -> Option<String> {
        if value.is_null() {
            return None;
        }
        let text = value.to_string();
        if text.is_empty() {
            return None;
        }
        Some(match &self.prefix {
            Some(prefix) => format!("{prefix}.{text}"),
            None => text,
        })
    }
}

impl RowStream for ValueToSelectedPathStream {
    fn header(&mut self) -> Result<HeaderRef> {
        Ok(self.header.clone())
    }

    fn has_next(&mut self) -> Result<bool> {
        while self.pending.is_empty() && self.input.has_next()? {
            let row = self.input.next()?;
            let paths: Vec<String> = row.values().iter().filter_map(|v| self.path_of(v)).collect();
            self.pending.extend(
                paths
                    .into_iter()
                    .map(|path| Row::new(self.header.clone(), vec![Value::from(path)])),
            );
        }
        Ok(!self.pending.is_empty())
    }

    fn next(&mut self) -> Result<Row> {
        if !self.has_next()? {
            return Err(Error::StreamExhausted);
        }
        self.pending.pop_front().ok_or(Error::StreamExhausted)
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_util::*;

    fn paths(stream: ValueToSelectedPathStream) -> Vec<String> {
        drain_values(Box::new(stream))
            .into_iter()
            .map(|row| row[0].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn input() -> BoxedStream {
        let header = Header::with_key(vec![
            Field::new("t.name", DataType::Binary),
            Field::new("t.id", DataType::Int64),
        ])
        .into_ref();
        value_table(
            header,
            vec![
                (Some(1), vec![Value::from("s1"), Value::Int64(7)]),
                (Some(2), vec![Value::Null, Value::Int64(8)]),
                (Some(3), vec![Value::from(""), Value::Null]),
                (Some(4), vec![Value::from("s2"), Value::Null]),
            ],
        )
    }

    #[test]
    fn test_cells_become_prefixed_paths() {
        let mut stream = ValueToSelectedPathStream::new(input(), Some("us.d1".into()));
        let header = stream.header().unwrap();
        assert!(!header.has_key());
        assert_eq!(header.len(), 1);
        assert_eq!(header.field(0).unwrap().name(), SELECTED_PATH);
        assert_eq!(header.field(0).unwrap().data_type(), DataType::Binary);
        assert_eq!(paths(stream), vec!["us.d1.s1", "us.d1.7", "us.d1.8", "us.d1.s2"]);
    }

    #[test]
    fn test_without_prefix() {
        let stream = ValueToSelectedPathStream::new(input(), None);
        assert_eq!(paths(stream), vec!["s1", "7", "8", "s2"]);

        let stream = ValueToSelectedPathStream::new(input(), Some(String::new()));
        assert_eq!(paths(stream), vec!["s1", "7", "8", "s2"]);
    }

    #[test]
    fn test_empty_input() {
        let input = long_table(false, &["a"], &[]);
        let mut stream = ValueToSelectedPathStream::new(input, Some("p".into()));
        assert!(!stream.has_next().unwrap());
        assert!(matches!(stream.next(), Err(Error::StreamExhausted)));
    }
}
