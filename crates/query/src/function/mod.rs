//! Function-call contracts for the transform and aggregation operators.
//!
//! Three kinds of pluggable functions exist:
//!
//! - [`RowMappingFunction`]: one row in, at most one row out (RowTransform)
//! - [`SetMappingFunction`]: a whole table in, at most one row out
//!   (SetTransform, GroupBy, Downsample)
//! - [`MappingFunction`]: a whole table in, a table out (MappingTransform)
//!
//! Function bodies report failures as ordinary errors; [`FunctionCall`]
//! wraps them with the function identifier before they leave the operator.

mod builtin;

pub use builtin::{Aggregate, AggregateKind, FirstLast};

use crate::stream::Table;
use hashbrown::HashSet;
use quarry_core::pattern_match::PathPattern;
use quarry_core::schema::Header;
use quarry_core::{Error, Result, Row, Value};
use std::fmt;
use std::rc::Rc;

/// Scalar function applied to each row.
pub trait RowMappingFunction {
    fn identifier(&self) -> &str;

    fn transform(&self, row: &Row, params: &FunctionParams) -> Result<Option<Row>>;
}

/// Aggregate function applied to a materialized table.
pub trait SetMappingFunction {
    fn identifier(&self) -> &str;

    /// Whether `DISTINCT` may be requested for this function.
    fn supports_distinct(&self) -> bool {
        false
    }

    /// Whether the result is unaffected by duplicates, so `DISTINCT` can be skipped.
    fn ignores_duplicates(&self) -> bool {
        false
    }

    fn transform(&self, table: &Table, params: &FunctionParams) -> Result<Option<Row>>;
}

/// Table-to-table function.
pub trait MappingFunction {
    fn identifier(&self) -> &str;

    fn supports_distinct(&self) -> bool {
        false
    }

    /// Whether results of several calls are merged by key instead of
    /// being joined by position.
    fn merges_by_key(&self) -> bool {
        false
    }

    fn transform(&self, table: &Table, params: &FunctionParams) -> Result<Option<Table>>;
}

/// A function of any kind.
#[derive(Clone)]
pub enum Function {
    Row(Rc<dyn RowMappingFunction>),
    Set(Rc<dyn SetMappingFunction>),
    Mapping(Rc<dyn MappingFunction>),
}

/// Discriminant of [`Function`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    Row,
    Set,
    Mapping,
}

impl Function {
    pub fn identifier(&self) -> &str {
        match self {
            Function::Row(f) => f.identifier(),
            Function::Set(f) => f.identifier(),
            Function::Mapping(f) => f.identifier(),
        }
    }

    pub fn kind(&self) -> FunctionKind {
        match self {
            Function::Row(_) => FunctionKind::Row,
            Function::Set(_) => FunctionKind::Set,
            Function::Mapping(_) => FunctionKind::Mapping,
        }
    }

    pub fn supports_distinct(&self) -> bool {
        match self {
            Function::Row(_) => false,
            Function::Set(f) => f.supports_distinct(),
            Function::Mapping(f) => f.supports_distinct(),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind(), self.identifier())
    }
}

/// The input view a call reads.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InputKey {
    /// The materialized input unchanged.
    Unfiltered,
    /// The distinct projection onto these paths.
    Distinct(Vec<String>),
}

/// Parameters of one call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FunctionParams {
    /// Column paths (wildcards allowed) the function reads.
    pub paths: Vec<String>,
    /// Whether duplicate input rows are removed first.
    pub distinct: bool,
}

impl FunctionParams {
    pub fn new(paths: Vec<String>) -> Self {
        Self {
            paths,
            distinct: false,
        }
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

/// A function together with the parameters it is called with.
#[derive(Clone, Debug)]
pub struct FunctionCall {
    pub function: Function,
    pub params: FunctionParams,
}

impl FunctionCall {
    pub fn new(function: Function, params: FunctionParams) -> Self {
        Self { function, params }
    }

    pub fn row(function: impl RowMappingFunction + 'static, params: FunctionParams) -> Self {
        Self::new(Function::Row(Rc::new(function)), params)
    }

    pub fn set(function: impl SetMappingFunction + 'static, params: FunctionParams) -> Self {
        Self::new(Function::Set(Rc::new(function)), params)
    }

    pub fn mapping(function: impl MappingFunction + 'static, params: FunctionParams) -> Self {
        Self::new(Function::Mapping(Rc::new(function)), params)
    }

    pub fn identifier(&self) -> &str {
        self.function.identifier()
    }

    /// Checks the call has the kind the operator needs and that `DISTINCT`
    /// is only requested where supported.
    pub fn check(&self, expected: FunctionKind) -> Result<()> {
        if self.function.kind() != expected {
            return Err(Error::invalid_parameter(format!(
                "function {} is not a {:?} function",
                self.identifier(),
                expected
            )));
        }
        if self.params.distinct && !self.function.supports_distinct() {
            return Err(Error::invalid_parameter(format!(
                "function {} does not support distinct",
                self.identifier()
            )));
        }
        Ok(())
    }

    /// Calls a row-mapping function.
    pub fn call_row(&self, row: &Row) -> Result<Option<Row>> {
        match &self.function {
            Function::Row(f) => f
                .transform(row, &self.params)
                .map_err(|e| Error::function_failure(self.identifier(), e)),
            _ => Err(self.kind_error(FunctionKind::Row)),
        }
    }

    /// Which view of the input this call reads: the table as is, or its
    /// distinct projection onto the call's paths.
    pub fn input_key(&self) -> InputKey {
        let dedup = match &self.function {
            Function::Set(f) => self.params.distinct && !f.ignores_duplicates(),
            _ => self.params.distinct,
        };
        if dedup {
            InputKey::Distinct(self.params.paths.clone())
        } else {
            InputKey::Unfiltered
        }
    }

    /// Calls a set-mapping function, removing duplicates first when asked.
    pub fn call_set(&self, table: &Table) -> Result<Option<Row>> {
        match self.input_key() {
            InputKey::Unfiltered => self.call_set_on(table),
            InputKey::Distinct(paths) => distinct_projection(table, &paths)
                .map_err(|e| Error::function_failure(self.identifier(), e))
                .and_then(|t| self.call_set_on(&t)),
        }
    }

    /// Calls a set-mapping function on a table already prepared for
    /// [`FunctionCall::input_key`].
    pub fn call_set_on(&self, table: &Table) -> Result<Option<Row>> {
        match &self.function {
            Function::Set(f) => f
                .transform(table, &self.params)
                .map_err(|e| Error::function_failure(self.identifier(), e)),
            _ => Err(self.kind_error(FunctionKind::Set)),
        }
    }

    /// Calls a mapping function.
    pub fn call_mapping(&self, table: &Table) -> Result<Option<Table>> {
        match &self.function {
            Function::Mapping(f) => {
                let result = if self.params.distinct {
                    distinct_projection(table, &self.params.paths)
                        .and_then(|t| f.transform(&t, &self.params))
                } else {
                    f.transform(table, &self.params)
                };
                result.map_err(|e| Error::function_failure(self.identifier(), e))
            }
            _ => Err(self.kind_error(FunctionKind::Mapping)),
        }
    }

    fn kind_error(&self, expected: FunctionKind) -> Error {
        Error::invalid_parameter(format!(
            "function {} is not a {:?} function",
            self.identifier(),
            expected
        ))
    }
}

/// Projects `table` onto the columns matching `paths` and removes duplicate
/// rows, treating null as equal to null. Keys are dropped.
pub fn distinct_projection(table: &Table, paths: &[String]) -> Result<Table> {
    let header = table.header_ref();
    let mut indices = Vec::new();
    for path in paths {
        let pattern = PathPattern::new(path)?;
        for index in header.pattern_indices(&pattern) {
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
    }
    indices.sort_unstable();
    let fields = indices
        .iter()
        .filter_map(|&i| header.field(i).cloned())
        .collect();
    let projected = Header::new(fields).into_ref();

    let mut seen: HashSet<Vec<Value>> = HashSet::new();
    let mut rows = Vec::new();
    for row in table.rows() {
        let values: Vec<Value> = indices
            .iter()
            .map(|&i| row.values()[i].coerce_to_double())
            .collect();
        if seen.insert(values) {
            let original = indices.iter().map(|&i| row.values()[i].clone()).collect();
            rows.push(Row::new(projected.clone(), original));
        }
    }
    Ok(Table::new(projected, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::schema::Field;
    use quarry_core::DataType;

    struct Failing;

    impl SetMappingFunction for Failing {
        fn identifier(&self) -> &str {
            "failing"
        }
        fn transform(&self, _table: &Table, _params: &FunctionParams) -> Result<Option<Row>> {
            Err(Error::execution("boom"))
        }
    }

    fn table() -> Table {
        let header = Header::with_key(vec![
            Field::new("a", DataType::Int64),
            Field::new("b", DataType::Int64),
        ])
        .into_ref();
        let rows = vec![
            Row::with_key(header.clone(), 0, vec![Value::Int64(1), Value::Int64(1)]),
            Row::with_key(header.clone(), 1, vec![Value::Int64(1), Value::Int64(2)]),
            Row::with_key(header.clone(), 2, vec![Value::Int64(1), Value::Null]),
            Row::with_key(header.clone(), 3, vec![Value::Int64(1), Value::Null]),
        ];
        Table::new(header, rows)
    }

    #[test]
    fn test_failure_wrapped_with_identifier() {
        let call = FunctionCall::set(Failing, FunctionParams::new(vec!["a".into()]));
        let err = call.call_set(&table()).unwrap_err();
        match err {
            Error::FunctionFailure { function, .. } => assert_eq!(function, "failing"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_kind_and_distinct() {
        let call = FunctionCall::set(Failing, FunctionParams::new(vec![]));
        assert!(call.check(FunctionKind::Set).is_ok());
        assert!(call.check(FunctionKind::Row).unwrap_err().is_validation());

        let call = FunctionCall::set(Failing, FunctionParams::new(vec![]).distinct());
        assert!(call.check(FunctionKind::Set).is_err());
    }

    #[test]
    fn test_distinct_projection() {
        let t = distinct_projection(&table(), &["a".to_string()]).unwrap();
        assert_eq!(t.len(), 1);
        assert!(!t.header_ref().has_key());

        let t = distinct_projection(&table(), &["*".to_string()]).unwrap();
        assert_eq!(t.len(), 3);
    }
}
