//! GroupBy stream.

use crate::function::FunctionCall;
use crate::stream::{drain, BoxedStream, RowStream, Table};
use hashbrown::HashMap;
use quarry_core::schema::{Field, Header, HeaderRef};
use quarry_core::{Error, Result, Row, Value};
use std::collections::VecDeque;
use tracing::debug;

/// Groups the child by the values of the group-by columns and evaluates
/// each set-mapping call per group.
///
/// Output: the group-by fields followed by the concatenated call results,
/// unkeyed, one row per group in order of first appearance. A call that
/// yields nothing for a group contributes nulls. The header is known only
/// after the whole child was grouped; with no input rows it is empty.
pub struct GroupByStream {
    input: BoxedStream,
    group_by: Vec<String>,
    calls: Vec<FunctionCall>,
    header: Option<HeaderRef>,
    rows: VecDeque<Row>,
}

impl GroupByStream {
    pub fn new(input: BoxedStream, group_by: Vec<String>, calls: Vec<FunctionCall>) -> Self {
        Self {
            input,
            group_by,
            calls,
            header: None,
            rows: VecDeque::new(),
        }
    }

    fn init(&mut self) -> Result<HeaderRef> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        let input = self.input.header()?;
        let indices = self
            .group_by
            .iter()
            .map(|name| input.require_index(name))
            .collect::<Result<Vec<_>>>()?;

        let mut positions: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<Value>, Vec<Row>)> = Vec::new();
        for row in drain(self.input.as_mut())? {
            let group: Vec<Value> = indices.iter().map(|&i| row.values()[i].clone()).collect();
            let position = *positions.entry(group.clone()).or_insert_with(|| {
                groups.push((group, Vec::new()));
                groups.len() - 1
            });
            groups[position].1.push(row);
        }
        debug!(groups = groups.len(), "group by materialized input");

        if groups.is_empty() {
            let header = Header::empty().into_ref();
            self.header = Some(header.clone());
            return Ok(header);
        }

        let mut results: Vec<Vec<Option<Row>>> = Vec::with_capacity(groups.len());
        for (_, rows) in &groups {
            let table = Table::new(input.clone(), rows.clone());
            let row = self
                .calls
                .iter()
                .map(|call| call.call_set(&table))
                .collect::<Result<Vec<_>>>()?;
            results.push(row);
        }

        // each call's output fields come from the first group that produced a row
        let mut call_fields: Vec<Vec<Field>> = vec![Vec::new(); self.calls.len()];
        for (c, fields) in call_fields.iter_mut().enumerate() {
            if let Some(row) = results.iter().find_map(|r| r[c].as_ref()) {
                *fields = row.header().fields().to_vec();
            }
        }

        let mut fields: Vec<Field> = indices
            .iter()
            .filter_map(|&i| input.field(i).cloned())
            .collect();
        fields.extend(call_fields.iter().flatten().cloned());
        let header = Header::new(fields).into_ref();

        for ((group, _), result) in groups.into_iter().zip(results) {
            let mut values = group;
            for (c, row) in result.into_iter().enumerate() {
                match row {
                    Some(row) if row.len() == call_fields[c].len() => {
                        values.extend(row.into_values())
                    }
                    Some(row) => {
                        return Err(Error::execution(format!(
                            "function {} returned {} columns, expected {}",
                            self.calls[c].identifier(),
                            row.len(),
                            call_fields[c].len()
                        )))
                    }
                    None => values.extend(std::iter::repeat(Value::Null).take(call_fields[c].len())),
                }
            }
            self.rows.push_back(Row::new(header.clone(), values));
        }

        self.header = Some(header.clone());
        Ok(header)
    }
}

impl RowStream for GroupByStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.init()
    }

    fn has_next(&mut self) -> Result<bool> {
        self.init()?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_util::*;
    use crate::function::{Aggregate, FunctionParams};

    fn calls() -> Vec<FunctionCall> {
        vec![
            FunctionCall::set(Aggregate::count(), FunctionParams::new(vec!["v".into()])),
            FunctionCall::set(Aggregate::sum(), FunctionParams::new(vec!["v".into()])),
        ]
    }

    #[test]
    fn test_group_by_counts_and_sums() {
        let input = long_table(
            true,
            &["g", "v"],
            &[&[0, 1, 10], &[1, 2, 20], &[2, 1, 30], &[3, 2, 40], &[4, 3, 50]],
        );
        let mut stream = GroupByStream::new(input, vec!["g".into()], calls());
        let header = stream.header().unwrap();
        assert!(!header.has_key());
        let names: Vec<_> = header.fields().iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["g", "count(v)", "sum(v)"]);

        let rows = drain_values(Box::new(stream));
        assert_eq!(longs(&rows[0]), vec![Some(1), Some(2), Some(40)]);
        assert_eq!(longs(&rows[1]), vec![Some(2), Some(2), Some(60)]);
        assert_eq!(longs(&rows[2]), vec![Some(3), Some(1), Some(50)]);
    }

    #[test]
    fn test_group_by_null_group() {
        let header = long_header(false, &["g", "v"]);
        let input = value_table(
            header,
            vec![
                (None, vec![Value::Null, Value::Int64(1)]),
                (None, vec![Value::Null, Value::Int64(2)]),
            ],
        );
        let rows = drain_values(Box::new(GroupByStream::new(input, vec!["g".into()], calls())));
        assert_eq!(rows.len(), 1);
        assert_eq!(longs(&rows[0]), vec![None, Some(2), Some(3)]);
    }

    #[test]
    fn test_group_by_empty_input() {
        let input = long_table(false, &["g", "v"], &[]);
        let mut stream = GroupByStream::new(input, vec!["g".into()], calls());
        assert!(stream.header().unwrap().is_empty());
        assert!(!stream.has_next().unwrap());
    }

    #[test]
    fn test_group_by_unknown_column() {
        let input = long_table(false, &["g"], &[&[1]]);
        let mut stream = GroupByStream::new(input, vec!["nope".into()], calls());
        assert!(stream.header().unwrap_err().is_validation());
    }
}
