//! Join operators.
//!
//! Every algorithm shares one column resolution and one output layout (see
//! `layout`), so hash, nested-loop and sorted-merge joins over the same
//! inputs produce the same rows and differ only in how candidates are found:
//!
//! - [`HashJoinStream`]: builds a multi-map over one side, probes with the other
//! - [`NestedLoopJoinStream`]: tries every cached right row for each left row
//! - [`SortedMergeJoinStream`]: sorts both sides on the join path and merges runs
//! - [`CrossJoinStream`]: Cartesian product
//! - [`JoinByStream`]: column-wise merge by key or by position

mod cross;
mod hash;
mod hash_table;
mod join_by;
mod layout;
mod merge;
mod nested;

pub use cross::CrossJoinStream;
pub use hash::HashJoinStream;
pub use join_by::{JoinBy, JoinByStream};
pub use merge::SortedMergeJoinStream;
pub use nested::NestedLoopJoinStream;

use crate::ast::Filter;
use quarry_core::schema::{Field, Header, HeaderRef};
use quarry_core::{DataType, Result, Row, Value};
use std::fmt;

/// Join algorithm chosen by the planner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinAlgorithm {
    HashJoin,
    NestedLoopJoin,
    SortedMergeJoin,
}

impl fmt::Display for JoinAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinAlgorithm::HashJoin => "hash join",
            JoinAlgorithm::NestedLoopJoin => "nested loop join",
            JoinAlgorithm::SortedMergeJoin => "sorted merge join",
        };
        f.write_str(name)
    }
}

/// Which unmatched rows an outer join keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OuterJoinType {
    Left,
    Right,
    Full,
}

impl OuterJoinType {
    #[inline]
    pub fn keeps_left(&self) -> bool {
        matches!(self, OuterJoinType::Left | OuterJoinType::Full)
    }

    #[inline]
    pub fn keeps_right(&self) -> bool {
        matches!(self, OuterJoinType::Right | OuterJoinType::Full)
    }
}

/// What a join emits for its matches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinKind {
    /// Joined rows for matching pairs.
    Inner,
    /// Inner rows plus null-padded unmatched rows.
    Outer(OuterJoinType),
    /// Each left row once, with a boolean column telling whether it matched.
    /// `anti` inverts the column.
    Mark { column: String, anti: bool },
    /// Each left row joined with its only match, or null-padded. A second
    /// match is an error.
    Single,
}

impl JoinKind {
    pub fn name(&self) -> &'static str {
        match self {
            JoinKind::Inner => "inner join",
            JoinKind::Outer(_) => "outer join",
            JoinKind::Mark { .. } => "mark join",
            JoinKind::Single => "single join",
        }
    }

    /// Side whose join columns are left out of the joined header.
    pub(crate) fn cut(&self) -> Cut {
        match self {
            JoinKind::Inner | JoinKind::Outer(OuterJoinType::Left | OuterJoinType::Full) => Cut::B,
            JoinKind::Outer(OuterJoinType::Right) => Cut::A,
            JoinKind::Mark { .. } | JoinKind::Single => Cut::Neither,
        }
    }
}

/// Side whose join columns are dropped from a joined header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Cut {
    Neither,
    A,
    B,
}

/// How the rows of two streams are matched.
///
/// Join columns are written without prefix: column `c` is `prefix_a.c` on
/// side A and `prefix_b.c` on side B.
#[derive(Clone, Debug, Default)]
pub struct JoinCondition {
    pub prefix_a: Option<String>,
    pub prefix_b: Option<String>,
    /// Residual predicate over the joined row.
    pub filter: Option<Filter>,
    pub join_columns: Vec<String>,
    /// Infer the join columns from the suffixes both sides share.
    pub natural: bool,
    /// Columns present on both sides under one of these prefixes are
    /// compared too.
    pub extra_join_prefixes: Vec<String>,
}

impl JoinCondition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefixes(mut self, prefix_a: impl Into<String>, prefix_b: impl Into<String>) -> Self {
        self.prefix_a = Some(prefix_a.into());
        self.prefix_b = Some(prefix_b.into());
        self
    }

    pub fn on(mut self, columns: &[&str]) -> Self {
        self.join_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn natural(mut self) -> Self {
        self.natural = true;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn extra_join_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.extra_join_prefixes = prefixes;
        self
    }
}

/// Header of a mark join: A's header plus the boolean mark column.
pub(crate) fn mark_header(header_a: &Header, column: &str) -> HeaderRef {
    let mut fields = header_a.fields().to_vec();
    fields.push(Field::new(column, DataType::Boolean));
    Header::of(header_a.has_key(), fields).into_ref()
}

/// A left row annotated with its mark.
pub(crate) fn mark_row(header: &HeaderRef, row: &Row, mark: bool) -> Result<Row> {
    let mut values = Vec::with_capacity(row.len() + 1);
    values.extend_from_slice(row.values());
    values.push(Value::Boolean(mark));
    Row::try_new(header.clone(), row.key(), values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cut_per_kind() {
        assert_eq!(JoinKind::Inner.cut(), Cut::B);
        assert_eq!(JoinKind::Outer(OuterJoinType::Full).cut(), Cut::B);
        assert_eq!(JoinKind::Outer(OuterJoinType::Right).cut(), Cut::A);
        assert_eq!(JoinKind::Single.cut(), Cut::Neither);
    }

    #[test]
    fn test_outer_sides() {
        assert!(OuterJoinType::Left.keeps_left());
        assert!(!OuterJoinType::Left.keeps_right());
        assert!(OuterJoinType::Full.keeps_left() && OuterJoinType::Full.keeps_right());
    }
}
