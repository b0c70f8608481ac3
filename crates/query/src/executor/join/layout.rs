//! Join column resolution and joined-row layout.

use super::{Cut, JoinCondition};
use crate::ast::{CompiledFilter, Filter};
use quarry_core::schema::{Field, Header, HeaderRef, KEY_NAME};
use quarry_core::{DataType, Error, Result, Row, Value};

/// `prefix.column`, or the bare column without a prefix.
pub(crate) fn qualify(prefix: Option<&str>, column: &str) -> String {
    match prefix {
        Some(p) => format!("{p}.{column}"),
        None => column.to_string(),
    }
}

fn strip_prefix<'a>(prefix: Option<&str>, name: &'a str) -> &'a str {
    prefix
        .and_then(|p| name.strip_prefix(p))
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(name)
}

/// Join columns and extra join paths resolved to positions in both headers.
#[derive(Clone, Debug, Default)]
pub(crate) struct ResolvedColumns {
    pub columns: Vec<String>,
    /// `(index in A, index in B)` per join column.
    pub pairs: Vec<(usize, usize)>,
    pub extra_paths: Vec<String>,
    /// `(index in A, index in B)` per extra join path.
    pub extra: Vec<(usize, usize)>,
}

impl ResolvedColumns {
    pub fn resolve(cond: &JoinCondition, header_a: &Header, header_b: &Header) -> Result<Self> {
        let prefix_a = cond.prefix_a.as_deref();
        let prefix_b = cond.prefix_b.as_deref();

        let mut columns = cond.join_columns.clone();
        if cond.natural {
            if !columns.is_empty() {
                return Err(Error::invalid_parameter(
                    "natural join should not have using columns",
                ));
            }
            for field_a in header_a.fields() {
                let column_a = strip_prefix(prefix_a, field_a.full_name());
                for field_b in header_b.fields() {
                    let column_b = strip_prefix(prefix_b, field_b.full_name());
                    if column_a == column_b && !columns.iter().any(|c| c == column_a) {
                        columns.push(column_a.to_string());
                    }
                }
            }
            if columns.is_empty() {
                return Err(Error::invalid_parameter("natural join has no matching columns"));
            }
        }

        let mut pairs = Vec::with_capacity(columns.len());
        for column in &columns {
            let path_a = qualify(prefix_a, column);
            let index_a = header_a
                .index_of(&path_a)
                .ok_or_else(|| Error::invalid_parameter(format!("TableA has no path: {path_a}")))?;
            let path_b = qualify(prefix_b, column);
            let index_b = header_b
                .index_of(&path_b)
                .ok_or_else(|| Error::invalid_parameter(format!("TableB has no path: {path_b}")))?;
            pairs.push((index_a, index_b));
        }

        let mut extra_paths = Vec::new();
        let mut extra = Vec::new();
        if !cond.extra_join_prefixes.is_empty() {
            for (index_a, field) in header_a.fields().iter().enumerate() {
                let name = field.full_name();
                let Some(index_b) = header_b.index_of(name) else {
                    continue;
                };
                let shared = cond.extra_join_prefixes.iter().any(|prefix| {
                    let prefix = prefix.strip_suffix(".*").unwrap_or(prefix);
                    name.starts_with(prefix)
                });
                if shared {
                    extra_paths.push(name.to_string());
                    extra.push((index_a, index_b));
                }
            }
        }

        Ok(Self {
            columns,
            pairs,
            extra_paths,
            extra,
        })
    }

    /// Column pair a hash or merge join partitions on: the first extra join
    /// path, else the first join column, else the first equality between an
    /// A column and a B column in the filter.
    pub fn hash_path(
        &self,
        filter: Option<&Filter>,
        header_a: &Header,
        header_b: &Header,
    ) -> Result<(usize, usize)> {
        if let Some(&pair) = self.extra.first().or(self.pairs.first()) {
            return Ok(pair);
        }
        if let Some(filter) = filter {
            for (x, y) in filter.equality_paths() {
                if let (Some(a), Some(b)) = (header_a.index_of(x), header_b.index_of(y)) {
                    return Ok((a, b));
                }
                if let (Some(a), Some(b)) = (header_a.index_of(y), header_b.index_of(x)) {
                    return Ok((a, b));
                }
            }
        }
        Err(Error::invalid_parameter(
            "cannot find an equality path for this join",
        ))
    }
}

/// Whether join values are widened to double before hashing or ordering.
pub(crate) fn needs_cast(header_a: &Header, header_b: &Header, (a, b): (usize, usize)) -> bool {
    let numeric = |h: &Header, i: usize| h.field(i).is_some_and(|f| f.data_type().is_numeric());
    numeric(header_a, a) && numeric(header_b, b)
}

/// Output layout of a joined row:
/// `[prefix_a.key] A fields [prefix_b.key] B fields`, minus dropped columns.
#[derive(Clone, Debug)]
pub(crate) struct JoinLayout {
    header: HeaderRef,
    key_a: bool,
    keep_a: Vec<usize>,
    key_b: bool,
    keep_b: Vec<usize>,
}

impl JoinLayout {
    pub fn new(
        header_a: &Header,
        header_b: &Header,
        prefix_a: Option<&str>,
        prefix_b: Option<&str>,
        drop_a: &[usize],
        drop_b: &[usize],
    ) -> Self {
        let mut fields = Vec::with_capacity(header_a.len() + header_b.len() + 2);

        let key_a = header_a.has_key() && prefix_a.is_some();
        if key_a {
            fields.push(Field::new(qualify(prefix_a, KEY_NAME), DataType::Int64));
        }
        let keep_a: Vec<usize> = (0..header_a.len()).filter(|i| !drop_a.contains(i)).collect();
        fields.extend(keep_a.iter().filter_map(|&i| header_a.field(i).cloned()));

        let key_b = header_b.has_key() && prefix_b.is_some();
        if key_b {
            fields.push(Field::new(qualify(prefix_b, KEY_NAME), DataType::Int64));
        }
        let keep_b: Vec<usize> = (0..header_b.len()).filter(|i| !drop_b.contains(i)).collect();
        fields.extend(keep_b.iter().filter_map(|&i| header_b.field(i).cloned()));

        Self {
            header: Header::new(fields).into_ref(),
            key_a,
            keep_a,
            key_b,
            keep_b,
        }
    }

    #[inline]
    pub fn header(&self) -> &HeaderRef {
        &self.header
    }

    /// Builds a joined row. An absent side contributes nulls.
    pub fn join(&self, a: Option<&Row>, b: Option<&Row>) -> Row {
        let mut values = Vec::with_capacity(self.header.len());
        Self::push_side(&mut values, a, self.key_a, &self.keep_a);
        Self::push_side(&mut values, b, self.key_b, &self.keep_b);
        Row::new(self.header.clone(), values)
    }

    fn push_side(values: &mut Vec<Value>, row: Option<&Row>, key: bool, keep: &[usize]) {
        if key {
            values.push(row.and_then(Row::key).map_or(Value::Null, Value::Int64));
        }
        match row {
            Some(row) => values.extend(keep.iter().map(|&i| row.values()[i].clone())),
            None => values.extend(keep.iter().map(|_| Value::Null)),
        }
    }
}

/// Resolved columns, output layout and residual filter of a join.
///
/// Every algorithm confirms a candidate pair through [`JoinPlan::try_join`].
#[derive(Clone, Debug)]
pub(crate) struct JoinPlan {
    pub resolved: ResolvedColumns,
    pub layout: JoinLayout,
    filter: Option<CompiledFilter>,
}

impl JoinPlan {
    pub fn new(cond: &JoinCondition, header_a: &Header, header_b: &Header, cut: Cut) -> Result<Self> {
        let resolved = ResolvedColumns::resolve(cond, header_a, header_b)?;
        let dropped = |side: fn(&(usize, usize)) -> usize| -> Vec<usize> {
            resolved.pairs.iter().chain(resolved.extra.iter()).map(side).collect()
        };
        let (drop_a, drop_b) = match cut {
            Cut::Neither => (Vec::new(), Vec::new()),
            Cut::A => (dropped(|p| p.0), Vec::new()),
            Cut::B => (Vec::new(), dropped(|p| p.1)),
        };
        let layout = JoinLayout::new(
            header_a,
            header_b,
            cond.prefix_a.as_deref(),
            cond.prefix_b.as_deref(),
            &drop_a,
            &drop_b,
        );
        Ok(Self {
            resolved,
            layout,
            filter: cond.filter.as_ref().map(|f| f.compile()).transpose()?,
        })
    }

    /// Re-verifies a candidate pair on the extra join paths, the join columns
    /// and the filter. Returns the joined row when all of them hold.
    pub fn try_join(&self, a: &Row, b: &Row) -> Result<Option<Row>> {
        let equal = self
            .resolved
            .extra
            .iter()
            .chain(self.resolved.pairs.iter())
            .all(|&(i, j)| a.values()[i].join_eq(&b.values()[j]));
        if !equal {
            return Ok(None);
        }
        let row = self.layout.join(Some(a), Some(b));
        if let Some(filter) = &self.filter {
            if !filter.validate(&row)? {
                return Ok(None);
            }
        }
        Ok(Some(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Op;
    use crate::executor::test_util::long_header;

    fn headers() -> (HeaderRef, HeaderRef) {
        (
            long_header(true, &["l.a", "l.b", "l.env.x"]),
            long_header(true, &["r.a", "r.c", "l.env.x"]),
        )
    }

    #[test]
    fn test_resolve_using_columns() {
        let (a, b) = headers();
        let cond = JoinCondition::new().prefixes("l", "r").on(&["a"]);
        let resolved = ResolvedColumns::resolve(&cond, &a, &b).unwrap();
        assert_eq!(resolved.pairs, vec![(0, 0)]);

        let cond = JoinCondition::new().prefixes("l", "r").on(&["b"]);
        let err = ResolvedColumns::resolve(&cond, &a, &b).unwrap_err();
        assert!(err.to_string().contains("TableB has no path: r.b"));
    }

    #[test]
    fn test_natural_columns() {
        let (a, b) = headers();
        let cond = JoinCondition::new().prefixes("l", "r").natural();
        let resolved = ResolvedColumns::resolve(&cond, &a, &b).unwrap();
        assert_eq!(resolved.columns, vec!["a".to_string()]);

        let cond = JoinCondition::new().prefixes("l", "r").natural().on(&["a"]);
        assert!(ResolvedColumns::resolve(&cond, &a, &b).unwrap_err().is_validation());

        let c = long_header(false, &["r.z"]);
        let cond = JoinCondition::new().prefixes("l", "r").natural();
        assert!(ResolvedColumns::resolve(&cond, &a, &c).is_err());
    }

    #[test]
    fn test_extra_paths_and_hash_path() {
        let (a, b) = headers();
        let cond = JoinCondition::new()
            .prefixes("l", "r")
            .on(&["a"])
            .extra_join_prefixes(vec!["l.env.*".into()]);
        let resolved = ResolvedColumns::resolve(&cond, &a, &b).unwrap();
        assert_eq!(resolved.extra_paths, vec!["l.env.x".to_string()]);
        assert_eq!(resolved.hash_path(None, &a, &b).unwrap(), (2, 2));

        let filter = Filter::path("r.c", Op::Eq, "l.b");
        let empty = ResolvedColumns::default();
        assert_eq!(empty.hash_path(Some(&filter), &a, &b).unwrap(), (1, 1));
        assert!(empty.hash_path(None, &a, &b).is_err());
    }

    #[test]
    fn test_layout_drops_join_columns() {
        let (a, b) = headers();
        let cond = JoinCondition::new().prefixes("l", "r").on(&["a"]);
        let plan = JoinPlan::new(&cond, &a, &b, Cut::B).unwrap();
        let names: Vec<&str> = plan.layout.header().fields().iter().map(Field::full_name).collect();
        assert_eq!(names, vec!["l.key", "l.a", "l.b", "l.env.x", "r.key", "r.c", "l.env.x"]);
        assert!(!plan.layout.header().has_key());

        let plan = JoinPlan::new(&cond, &a, &b, Cut::A).unwrap();
        let names: Vec<&str> = plan.layout.header().fields().iter().map(Field::full_name).collect();
        assert_eq!(names, vec!["l.key", "l.b", "l.env.x", "r.key", "r.a", "r.c", "l.env.x"]);
    }

    #[test]
    fn test_try_join_rechecks_values() {
        let (a, b) = headers();
        let cond = JoinCondition::new()
            .prefixes("l", "r")
            .on(&["a"])
            .filter(Filter::value("r.c", Op::Gt, 5i64));
        let plan = JoinPlan::new(&cond, &a, &b, Cut::B).unwrap();
        let row_a = Row::with_key(a.clone(), 1, vec![Value::Int64(1), Value::Int64(2), Value::Null]);
        let hit = Row::with_key(b.clone(), 7, vec![Value::Float64(1.0), Value::Int64(9), Value::Null]);
        let miss = Row::with_key(b.clone(), 8, vec![Value::Int64(1), Value::Int64(3), Value::Null]);
        let null = Row::with_key(b, 9, vec![Value::Null, Value::Int64(9), Value::Null]);

        let joined = plan.try_join(&row_a, &hit).unwrap().unwrap();
        assert_eq!(joined.value_of("l.key"), Some(Value::Int64(1)));
        assert_eq!(joined.value_of("r.key"), Some(Value::Int64(7)));
        assert!(plan.try_join(&row_a, &miss).unwrap().is_none());
        assert!(plan.try_join(&row_a, &null).unwrap().is_none());

        let padded = plan.layout.join(Some(&row_a), None);
        assert_eq!(padded.value_of("r.c"), Some(Value::Null));
        assert_eq!(padded.value_of("l.b"), Some(Value::Int64(2)));
    }
}
