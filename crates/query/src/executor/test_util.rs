//! Helpers shared by executor unit tests.

use crate::stream::{collect_rows, BoxedStream, Table};
use quarry_core::schema::{Field, Header, HeaderRef};
use quarry_core::{DataType, Row, Value};

/// Header of Int64 fields.
pub(crate) fn long_header(keyed: bool, names: &[&str]) -> HeaderRef {
    Header::of(
        keyed,
        names
            .iter()
            .map(|n| Field::new(*n, DataType::Int64))
            .collect(),
    )
    .into_ref()
}

/// Table of Int64 values; for keyed tables the first number of each row is the key.
pub(crate) fn long_table(keyed: bool, names: &[&str], rows: &[&[i64]]) -> BoxedStream {
    let header = long_header(keyed, names);
    let rows = rows
        .iter()
        .map(|r| {
            if keyed {
                let values = r[1..].iter().map(|v| Value::Int64(*v)).collect();
                Row::with_key(header.clone(), r[0], values)
            } else {
                Row::new(header.clone(), r.iter().map(|v| Value::Int64(*v)).collect())
            }
        })
        .collect();
    Box::new(Table::new(header, rows))
}

/// Table from explicit values.
pub(crate) fn value_table(header: HeaderRef, rows: Vec<(Option<i64>, Vec<Value>)>) -> BoxedStream {
    let rows = rows
        .into_iter()
        .map(|(key, values)| match key {
            Some(k) => Row::with_key(header.clone(), k, values),
            None => Row::new(header.clone(), values),
        })
        .collect();
    Box::new(Table::new(header, rows))
}

/// Drains a stream and returns its rows' values.
pub(crate) fn drain_values(stream: BoxedStream) -> Vec<Vec<Value>> {
    collect_rows(stream)
        .unwrap()
        .into_iter()
        .map(Row::into_values)
        .collect()
}

/// Int64 values as a vector, nulls as None.
pub(crate) fn longs(values: &[Value]) -> Vec<Option<i64>> {
    values.iter().map(Value::as_i64).collect()
}
