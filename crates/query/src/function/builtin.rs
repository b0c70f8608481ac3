//! Built-in aggregate and mapping functions.

use super::{FunctionParams, MappingFunction, SetMappingFunction};
use crate::stream::Table;
use quarry_core::pattern_match::PathPattern;
use quarry_core::schema::{Field, Header};
use quarry_core::{DataType, Error, Result, Row, Value};

/// Indices of the columns matched by any of `paths`, in order of first match.
fn matched_columns(header: &Header, paths: &[String]) -> Result<Vec<usize>> {
    let mut indices = Vec::new();
    for path in paths {
        let pattern = PathPattern::new(path)?;
        for index in header.pattern_indices(&pattern) {
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
    }
    Ok(indices)
}

/// Aggregation performed by [`Aggregate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateKind {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::Count => "count",
            AggregateKind::Sum => "sum",
            AggregateKind::Avg => "avg",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
        }
    }
}

/// Column-wise aggregate: one output column `name(column)` per matched column.
#[derive(Clone, Copy, Debug)]
pub struct Aggregate {
    kind: AggregateKind,
}

impl Aggregate {
    pub fn new(kind: AggregateKind) -> Self {
        Self { kind }
    }

    pub fn count() -> Self {
        Self::new(AggregateKind::Count)
    }

    pub fn sum() -> Self {
        Self::new(AggregateKind::Sum)
    }

    pub fn avg() -> Self {
        Self::new(AggregateKind::Avg)
    }

    pub fn min() -> Self {
        Self::new(AggregateKind::Min)
    }

    pub fn max() -> Self {
        Self::new(AggregateKind::Max)
    }

    fn compute(&self, field: &Field, rows: &[Row], index: usize) -> Result<(DataType, Value)> {
        let data_type = field.data_type();
        let values = rows
            .iter()
            .filter_map(|r| r.get(index))
            .filter(|v| !v.is_null());

        match self.kind {
            AggregateKind::Count => Ok((DataType::Int64, Value::Int64(values.count() as i64))),
            AggregateKind::Sum => {
                self.require_numeric(field)?;
                if data_type.is_integral() {
                    let mut sum: Option<i64> = None;
                    for v in values.filter_map(Value::as_i64) {
                        let acc = sum.unwrap_or(0);
                        sum = Some(acc.checked_add(v).ok_or_else(|| {
                            Error::execution(format!("sum overflow on {}", field.full_name()))
                        })?);
                    }
                    Ok((DataType::Int64, sum.map_or(Value::Null, Value::Int64)))
                } else {
                    let nums: Vec<f64> = values.filter_map(Value::as_f64).collect();
                    if nums.is_empty() {
                        Ok((DataType::Float64, Value::Null))
                    } else {
                        Ok((DataType::Float64, Value::Float64(nums.iter().sum())))
                    }
                }
            }
            AggregateKind::Avg => {
                self.require_numeric(field)?;
                let nums: Vec<f64> = values.filter_map(Value::as_f64).collect();
                if nums.is_empty() {
                    Ok((DataType::Float64, Value::Null))
                } else {
                    let sum: f64 = nums.iter().sum();
                    Ok((DataType::Float64, Value::Float64(sum / nums.len() as f64)))
                }
            }
            AggregateKind::Min => Ok((data_type, values.min().cloned().unwrap_or(Value::Null))),
            AggregateKind::Max => Ok((data_type, values.max().cloned().unwrap_or(Value::Null))),
        }
    }

    fn require_numeric(&self, field: &Field) -> Result<()> {
        if field.data_type().is_numeric() {
            Ok(())
        } else {
            Err(Error::execution(format!(
                "{} is not supported for {} column {}",
                self.kind.name(),
                field.data_type(),
                field.full_name()
            )))
        }
    }
}

impl SetMappingFunction for Aggregate {
    fn identifier(&self) -> &str {
        self.kind.name()
    }

    fn supports_distinct(&self) -> bool {
        true
    }

    fn ignores_duplicates(&self) -> bool {
        matches!(self.kind, AggregateKind::Min | AggregateKind::Max)
    }

    fn transform(&self, table: &Table, params: &FunctionParams) -> Result<Option<Row>> {
        let header = table.header_ref();
        let indices = matched_columns(header, &params.paths)?;
        if indices.is_empty() {
            return Ok(None);
        }

        let mut fields = Vec::with_capacity(indices.len());
        let mut values = Vec::with_capacity(indices.len());
        for index in indices {
            let Some(field) = header.field(index) else {
                continue;
            };
            let (data_type, value) = self.compute(field, table.rows(), index)?;
            fields.push(Field::new(
                format!("{}({})", self.kind.name(), field.full_name()),
                data_type,
            ));
            values.push(value);
        }
        Ok(Some(Row::new(Header::new(fields).into_ref(), values)))
    }
}

/// `first`/`last`: the earliest (latest) non-null value of each matched
/// column, as keyed `(path, value)` rows ordered by key.
#[derive(Clone, Copy, Debug)]
pub struct FirstLast {
    last: bool,
}

impl FirstLast {
    pub fn first() -> Self {
        Self { last: false }
    }

    pub fn last() -> Self {
        Self { last: true }
    }
}

impl MappingFunction for FirstLast {
    fn identifier(&self) -> &str {
        if self.last {
            "last"
        } else {
            "first"
        }
    }

    fn merges_by_key(&self) -> bool {
        true
    }

    fn transform(&self, table: &Table, params: &FunctionParams) -> Result<Option<Table>> {
        let header = table.header_ref();
        if !header.has_key() {
            return Err(Error::invalid_parameter(format!(
                "{} requires a keyed input",
                self.identifier()
            )));
        }
        let out = Header::with_key(vec![
            Field::new("path", DataType::Binary),
            Field::new("value", DataType::Binary),
        ])
        .into_ref();

        let mut found: Vec<(i64, usize, Value)> = Vec::new();
        for index in matched_columns(header, &params.paths)? {
            let hit = if self.last {
                table.rows().iter().rev().find(|r| !r.values()[index].is_null())
            } else {
                table.rows().iter().find(|r| !r.values()[index].is_null())
            };
            if let Some(row) = hit {
                if let Some(key) = row.key() {
                    found.push((key, index, row.values()[index].clone()));
                }
            }
        }
        found.sort_by_key(|(key, index, _)| (*key, *index));

        let rows = found
            .into_iter()
            .filter_map(|(key, index, value)| {
                let path = header.field(index)?.full_name().to_string();
                Some(Row::with_key(
                    out.clone(),
                    key,
                    vec![Value::from(path), Value::from(value.to_string())],
                ))
            })
            .collect();
        Ok(Some(Table::new(out, rows)))
    }
}
