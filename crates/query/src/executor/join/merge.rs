//! Sorted merge join.

use super::layout::JoinPlan;
use super::{JoinCondition, JoinKind};
use crate::stream::{close_pair, drain, BoxedStream, RowStream};
use quarry_core::schema::HeaderRef;
use quarry_core::{Error, Result, Row};
use std::cmp::Ordering;
use std::collections::VecDeque;
use tracing::debug;

/// Sorted merge join for inner and outer joins.
///
/// Both sides are materialized and sorted on the join path the hash join
/// would partition on. Runs of equal values are paired and re-verified like
/// hash join candidates, so the output rows are the same as the hash join's.
pub struct SortedMergeJoinStream {
    a: BoxedStream,
    b: BoxedStream,
    condition: JoinCondition,
    kind: JoinKind,
    header: Option<HeaderRef>,
    cache: VecDeque<Row>,
}

impl SortedMergeJoinStream {
    /// Fails for mark and single joins, which need per-row semantics the
    /// merge does not provide.
    pub fn new(
        a: BoxedStream,
        b: BoxedStream,
        condition: JoinCondition,
        kind: JoinKind,
    ) -> Result<Self> {
        if !matches!(kind, JoinKind::Inner | JoinKind::Outer(_)) {
            return Err(Error::unsupported_algorithm(kind.name(), "sorted merge join"));
        }
        Ok(Self {
            a,
            b,
            condition,
            kind,
            header: None,
            cache: VecDeque::new(),
        })
    }

    fn init(&mut self) -> Result<HeaderRef> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        let header_a = self.a.header()?;
        let header_b = self.b.header()?;
        let plan = JoinPlan::new(&self.condition, &header_a, &header_b, self.kind.cut())?;
        let (index_a, index_b) =
            plan.resolved
                .hash_path(self.condition.filter.as_ref(), &header_a, &header_b)?;

        let mut rows_a = drain(self.a.as_mut())?;
        let mut rows_b = drain(self.b.as_mut())?;
        rows_a.sort_by(|x, y| x.values()[index_a].cmp(&y.values()[index_a]));
        rows_b.sort_by(|x, y| x.values()[index_b].cmp(&y.values()[index_b]));
        debug!(left = rows_a.len(), right = rows_b.len(), "sorted merge join inputs sorted");

        let (keep_a, keep_b) = match self.kind {
            JoinKind::Outer(outer) => (outer.keeps_left(), outer.keeps_right()),
            _ => (false, false),
        };
        let mut matched_b = vec![false; rows_b.len()];
        let mut right_idx = 0;

        for row_a in &rows_a {
            let value_a = &row_a.values()[index_a];
            let mut matched = false;

            if !value_a.is_null() {
                // Skip right rows that sort before the current left value
                while right_idx < rows_b.len() {
                    let value_b = &rows_b[right_idx].values()[index_b];
                    if value_b.is_null() || value_b.cmp(value_a) == Ordering::Less {
                        right_idx += 1;
                    } else {
                        break;
                    }
                }

                let mut scan = right_idx;
                while scan < rows_b.len() {
                    let row_b = &rows_b[scan];
                    if !row_b.values()[index_b].join_eq(value_a) {
                        break;
                    }
                    if let Some(joined) = plan.try_join(row_a, row_b)? {
                        matched = true;
                        matched_b[scan] = true;
                        self.cache.push_back(joined);
                    }
                    scan += 1;
                }
            }

            if keep_a && !matched {
                self.cache.push_back(plan.layout.join(Some(row_a), None));
            }
        }

        if keep_b {
            for (row_b, _) in rows_b.iter().zip(&matched_b).filter(|(_, m)| !**m) {
                self.cache.push_back(plan.layout.join(None, Some(row_b)));
            }
        }

        let header = plan.layout.header().clone();
        self.header = Some(header.clone());
        Ok(header)
    }
}

impl RowStream for SortedMergeJoinStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.init()
    }

    fn has_next(&mut self) -> Result<bool> {
        self.init()?;
        Ok(!self.cache.is_empty())
    }

    fn next(&mut self) -> Result<Row> {
        if !self.has_next()? {
            return Err(Error::StreamExhausted);
        }
        self.cache.pop_front().ok_or(Error::StreamExhausted)
    }

    fn close(&mut self) -> Result<()> {
        close_pair(self.a.as_mut(), self.b.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::join::OuterJoinType;
    use crate::executor::test_util::*;
    use quarry_core::Value;

    fn on_a() -> JoinCondition {
        JoinCondition::new().prefixes("l", "r").on(&["a"])
    }

    #[test]
    fn test_merge_equal_runs() {
        let a = long_table(false, &["l.a", "l.b"], &[&[2, 20], &[1, 10], &[1, 11]]);
        let b = long_table(false, &["r.a", "r.c"], &[&[1, 100], &[1, 101], &[3, 300]]);
        let stream = SortedMergeJoinStream::new(a, b, on_a(), JoinKind::Inner).unwrap();
        let rows = drain_values(Box::new(stream));
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r[0] == Value::Int64(1)));
    }

    #[test]
    fn test_merge_full_outer() {
        let header_a = long_header(false, &["l.a"]);
        let a = value_table(
            header_a,
            vec![(None, vec![Value::Int64(2)]), (None, vec![Value::Null]), (None, vec![Value::Int64(1)])],
        );
        let b = long_table(false, &["r.a", "r.c"], &[&[1, 100], &[3, 300]]);
        let kind = JoinKind::Outer(OuterJoinType::Full);
        let rows = drain_values(Box::new(SortedMergeJoinStream::new(a, b, on_a(), kind).unwrap()));
        // null, 1-1, 2, and right 3
        assert_eq!(rows.len(), 4);
        assert_eq!(longs(&rows[1]), vec![Some(1), Some(100)]);
        assert_eq!(longs(&rows[3]), vec![None, Some(300)]);
    }

    #[test]
    fn test_rejects_mark_and_single() {
        let a = long_table(false, &["l.a"], &[]);
        let b = long_table(false, &["r.a"], &[]);
        let result = SortedMergeJoinStream::new(a, b, on_a(), JoinKind::Single);
        assert!(matches!(result, Err(Error::UnsupportedAlgorithm { .. })));
    }
}
