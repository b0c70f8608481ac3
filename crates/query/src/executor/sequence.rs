//! AddSequence stream.

use crate::stream::{BoxedStream, RowStream};
use quarry_core::schema::{Field, Header, HeaderRef};
use quarry_core::{DataType, Error, Result, Row, Value};

/// Appends long counter columns. Column `i` starts at `starts[i]` and
/// advances by `increments[i]` per row.
pub struct AddSequenceStream {
    input: BoxedStream,
    columns: Vec<String>,
    increments: Vec<i64>,
    current: Vec<i64>,
    header: Option<HeaderRef>,
}

impl AddSequenceStream {
    pub fn new(
        input: BoxedStream,
        starts: Vec<i64>,
        increments: Vec<i64>,
        columns: Vec<String>,
    ) -> Result<Self> {
        if starts.len() != increments.len() || starts.len() != columns.len() {
            return Err(Error::invalid_parameter(format!(
                "sequence needs as many starts ({}) and increments ({}) as columns ({})",
                starts.len(),
                increments.len(),
                columns.len()
            )));
        }
        Ok(Self {
            input,
            columns,
            increments,
            current: starts,
            header: None,
        })
    }

    fn init(&mut self) -> Result<HeaderRef> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        let input = self.input.header()?;
        let mut fields = input.fields().to_vec();
        for column in &self.columns {
            if input.index_of(column).is_some() {
                return Err(Error::invalid_parameter(format!(
                    "sequence column {column} already exists"
                )));
            }
            fields.push(Field::new(column.clone(), DataType::Int64));
        }
        let header = Header::of(input.has_key(), fields).into_ref();
        self.header = Some(header.clone());
        Ok(header)
    }
}

impl RowStream for AddSequenceStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.init()
    }

    fn has_next(&mut self) -> Result<bool> {
        self.input.has_next()
    }

    fn next(&mut self) -> Result<Row> {
        let header = self.init()?;
        let row = self.input.next()?;
        let key = row.key();
        let mut values = row.into_values();
        for (current, increment) in self.current.iter_mut().zip(&self.increments) {
            values.push(Value::Int64(*current));
            *current = current.wrapping_add(*increment);
        }
        Row::try_new(header, key, values)
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_util::*;

    #[test]
    fn test_two_independent_sequences() {
        let input = long_table(false, &["a"], &[&[10], &[20], &[30]]);
        let stream = AddSequenceStream::new(
            input,
            vec![0, 100],
            vec![1, -10],
            vec!["seq".into(), "down".into()],
        )
        .unwrap();
        let rows = drain_values(Box::new(stream));
        assert_eq!(longs(&rows[0]), vec![Some(10), Some(0), Some(100)]);
        assert_eq!(longs(&rows[2]), vec![Some(30), Some(2), Some(80)]);
    }

    #[test]
    fn test_arity_mismatch() {
        let input = long_table(false, &["a"], &[]);
        assert!(AddSequenceStream::new(input, vec![0], vec![], vec!["s".into()]).is_err());
    }

    #[test]
    fn test_existing_column_rejected() {
        let input = long_table(false, &["a"], &[]);
        let mut stream = AddSequenceStream::new(input, vec![0], vec![1], vec!["a".into()]).unwrap();
        assert!(stream.header().is_err());
    }
}
