//! Nested loop join.

use super::layout::JoinPlan;
use super::{mark_header, mark_row, JoinCondition, JoinKind};
use crate::stream::{close_pair, BoxedStream, RowStream, StreamState};
use quarry_core::schema::HeaderRef;
use quarry_core::{Error, Result, Row};
use std::collections::VecDeque;
use tracing::debug;

/// Nested loop join over two streams, for every [`JoinKind`].
///
/// Compares every left row with every right row, so any filter works as a
/// join condition. The right side is cached as it is first scanned and
/// never pulled twice. Right rows are tracked by position for outer joins
/// that keep them.
pub struct NestedLoopJoinStream {
    a: BoxedStream,
    b: BoxedStream,
    condition: JoinCondition,
    kind: JoinKind,
    state: StreamState,
    plan: Option<JoinPlan>,
    header: Option<HeaderRef>,
    right: Vec<Row>,
    right_matched: Vec<bool>,
    right_done: bool,
    cache: VecDeque<Row>,
}

impl NestedLoopJoinStream {
    pub fn new(a: BoxedStream, b: BoxedStream, condition: JoinCondition, kind: JoinKind) -> Self {
        Self {
            a,
            b,
            condition,
            kind,
            state: StreamState::Uninitialized,
            plan: None,
            header: None,
            right: Vec::new(),
            right_matched: Vec::new(),
            right_done: false,
            cache: VecDeque::new(),
        }
    }

    fn init(&mut self) -> Result<HeaderRef> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        let header_a = self.a.header()?;
        let header_b = self.b.header()?;
        let plan = JoinPlan::new(&self.condition, &header_a, &header_b, self.kind.cut())?;
        let header = match &self.kind {
            JoinKind::Mark { column, .. } => mark_header(&header_a, column),
            _ => plan.layout.header().clone(),
        };
        self.plan = Some(plan);
        self.header = Some(header.clone());
        self.state = StreamState::Initialized;
        Ok(header)
    }

    /// Returns right row `i`, pulling it into the cache on first access.
    fn right_row(&mut self, i: usize) -> Result<bool> {
        while i >= self.right.len() {
            if self.right_done || !self.b.has_next()? {
                if !self.right_done {
                    debug!(rows = self.right.len(), "nested loop join cached right side");
                }
                self.right_done = true;
                return Ok(false);
            }
            self.right.push(self.b.next()?);
            self.right_matched.push(false);
        }
        Ok(true)
    }

    /// Emits everything one left row produces.
    fn probe(&mut self, header: &HeaderRef, left: Row) -> Result<()> {
        let mut matched = false;
        let mut found = None;
        let mut i = 0;
        while self.right_row(i)? {
            let Some(plan) = self.plan.as_ref() else {
                break;
            };
            if let Some(joined) = plan.try_join(&left, &self.right[i])? {
                match &self.kind {
                    JoinKind::Inner | JoinKind::Outer(_) => {
                        self.right_matched[i] = true;
                        self.cache.push_back(joined);
                    }
                    JoinKind::Mark { .. } => {
                        matched = true;
                        break;
                    }
                    JoinKind::Single => {
                        if found.is_some() {
                            return Err(Error::cardinality_violation(
                                "the right side of a single join returned more than one row",
                            ));
                        }
                        found = Some(joined);
                    }
                }
                matched = true;
            }
            i += 1;
        }

        let Some(plan) = self.plan.as_ref() else {
            return Err(Error::execution("nested loop join is not initialized"));
        };
        match &self.kind {
            JoinKind::Outer(outer) if !matched && outer.keeps_left() => {
                self.cache.push_back(plan.layout.join(Some(&left), None));
            }
            JoinKind::Mark { anti, .. } => {
                self.cache.push_back(mark_row(header, &left, matched != *anti)?);
            }
            JoinKind::Single => {
                let row = found.unwrap_or_else(|| plan.layout.join(Some(&left), None));
                self.cache.push_back(row);
            }
            _ => {}
        }
        Ok(())
    }

    /// Pads the right rows that never matched, draining the right side first.
    fn unmatched_right(&mut self) -> Result<()> {
        let mut i = self.right.len();
        while self.right_row(i)? {
            i += 1;
        }
        let Some(plan) = self.plan.as_ref() else {
            return Ok(());
        };
        for (row, _) in self
            .right
            .iter()
            .zip(&self.right_matched)
            .filter(|(_, matched)| !**matched)
        {
            self.cache.push_back(plan.layout.join(None, Some(row)));
        }
        Ok(())
    }
}

impl RowStream for NestedLoopJoinStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.init()
    }

    fn has_next(&mut self) -> Result<bool> {
        let header = self.init()?;
        while self.cache.is_empty() && !self.state.is_exhausted() {
            if self.a.has_next()? {
                let left = self.a.next()?;
                self.probe(&header, left)?;
            } else {
                if let JoinKind::Outer(outer) = self.kind {
                    if outer.keeps_right() {
                        self.unmatched_right()?;
                    }
                }
                self.state = StreamState::Exhausted;
            }
        }
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
    use crate::ast::{Filter, Op};
    use crate::executor::join::OuterJoinType;
    use crate::executor::test_util::*;
    use quarry_core::Value;

    fn left() -> BoxedStream {
        long_table(false, &["l.a"], &[&[1], &[2], &[3]])
    }

    fn right() -> BoxedStream {
        long_table(false, &["r.a"], &[&[2], &[3], &[4]])
    }

    fn less_than() -> JoinCondition {
        JoinCondition::new().filter(Filter::path("l.a", Op::Lt, "r.a"))
    }

    #[test]
    fn test_theta_join() {
        let stream = NestedLoopJoinStream::new(left(), right(), less_than(), JoinKind::Inner);
        let rows = drain_values(Box::new(stream));
        // 1<2,1<3,1<4,2<3,2<4,3<4
        assert_eq!(rows.len(), 6);
        assert_eq!(longs(&rows[3]), vec![Some(2), Some(3)]);
    }

    #[test]
    fn test_outer_theta_join() {
        let cond = JoinCondition::new().filter(Filter::path("l.a", Op::Gt, "r.a"));
        let kind = JoinKind::Outer(OuterJoinType::Full);
        let rows = drain_values(Box::new(NestedLoopJoinStream::new(left(), right(), cond, kind)));
        // 3>2 matches; 1 and 2 padded on the left, 3 and 4 padded on the right
        assert_eq!(rows.len(), 5);
        assert_eq!(longs(&rows[0]), vec![Some(1), None]);
        assert_eq!(longs(&rows[2]), vec![Some(3), Some(2)]);
        assert_eq!(longs(&rows[4]), vec![None, Some(4)]);
    }

    #[test]
    fn test_anti_mark_join() {
        let cond = JoinCondition::new().filter(Filter::path("l.a", Op::Eq, "r.a"));
        let kind = JoinKind::Mark {
            column: "m".into(),
            anti: true,
        };
        let rows = drain_values(Box::new(NestedLoopJoinStream::new(left(), right(), cond, kind)));
        let marks: Vec<_> = rows.iter().map(|r| r[1].clone()).collect();
        assert_eq!(marks, vec![Value::Boolean(true), Value::Boolean(false), Value::Boolean(false)]);
    }

    #[test]
    fn test_single_join_violation() {
        let stream = NestedLoopJoinStream::new(left(), right(), less_than(), JoinKind::Single);
        let mut stream: BoxedStream = Box::new(stream);
        assert!(matches!(
            stream.has_next().unwrap_err(),
            Error::CardinalityViolation { .. }
        ));
    }

    #[test]
    fn test_empty_left_does_not_pull_right() {
        let a = long_table(false, &["l.a"], &[]);
        let mut stream = NestedLoopJoinStream::new(a, right(), less_than(), JoinKind::Inner);
        assert!(!stream.has_next().unwrap());
        assert!(stream.right.is_empty());
    }
}
