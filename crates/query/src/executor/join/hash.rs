//! Hash join.

use super::hash_table::JoinHashTable;
use super::layout::{needs_cast, JoinPlan};
use super::{mark_header, mark_row, JoinCondition, JoinKind, OuterJoinType};
use crate::stream::{close_pair, BoxedStream, RowStream, StreamState};
use quarry_core::schema::HeaderRef;
use quarry_core::{Error, Result, Row};
use std::collections::VecDeque;
use tracing::debug;

/// Hash join over two streams, for every [`JoinKind`].
///
/// Implements the classic hash join algorithm:
/// 1. Build phase: drain the build side into a [`JoinHashTable`]
/// 2. Probe phase: pull the probe side row by row and look up its bucket
///
/// B is the build side, except for RIGHT outer joins which build on A so
/// that unmatched tracking always covers the side emitted last. Probe rows
/// without a match are emitted as they are seen; unmatched build rows are
/// emitted once the probe side is exhausted.
pub struct HashJoinStream {
    a: BoxedStream,
    b: BoxedStream,
    condition: JoinCondition,
    kind: JoinKind,
    state: StreamState,
    build: Option<BuildSide>,
    cache: VecDeque<Row>,
}

struct BuildSide {
    plan: JoinPlan,
    table: JoinHashTable,
    /// Join column of the probe side.
    probe_index: usize,
    /// Whether A is the build side.
    swapped: bool,
    matched: Vec<bool>,
    header: HeaderRef,
}

impl HashJoinStream {
    pub fn new(a: BoxedStream, b: BoxedStream, condition: JoinCondition, kind: JoinKind) -> Self {
        Self {
            a,
            b,
            condition,
            kind,
            state: StreamState::Uninitialized,
            build: None,
            cache: VecDeque::new(),
        }
    }

    fn init(&mut self) -> Result<&mut BuildSide> {
        if self.build.is_none() {
            let header_a = self.a.header()?;
            let header_b = self.b.header()?;
            let plan = JoinPlan::new(&self.condition, &header_a, &header_b, self.kind.cut())?;
            let (index_a, index_b) =
                plan.resolved
                    .hash_path(self.condition.filter.as_ref(), &header_a, &header_b)?;
            let cast = needs_cast(&header_a, &header_b, (index_a, index_b));

            let swapped = self.kind == JoinKind::Outer(OuterJoinType::Right);
            let (table, probe_index) = if swapped {
                (JoinHashTable::build(self.a.as_mut(), index_a, cast)?, index_b)
            } else {
                (JoinHashTable::build(self.b.as_mut(), index_b, cast)?, index_a)
            };
            debug!(
                kind = self.kind.name(),
                rows = table.rows().len(),
                buckets = table.bucket_count(),
                swapped,
                "hash join build side ready"
            );

            let header = match &self.kind {
                JoinKind::Mark { column, .. } => mark_header(&header_a, column),
                _ => plan.layout.header().clone(),
            };
            self.build = Some(BuildSide {
                matched: vec![false; table.rows().len()],
                plan,
                table,
                probe_index,
                swapped,
                header,
            });
            self.state = StreamState::Initialized;
        }
        self.build
            .as_mut()
            .ok_or_else(|| Error::execution("hash join build side missing"))
    }
}

impl BuildSide {
    /// Emits everything one probe row produces.
    fn probe(&mut self, row: Row, kind: &JoinKind, out: &mut VecDeque<Row>) -> Result<()> {
        let value = &row.values()[self.probe_index];
        match kind {
            JoinKind::Inner | JoinKind::Outer(_) => {
                let mut matched = false;
                for (i, build) in self.table.candidates(value) {
                    let (a, b) = if self.swapped { (build, &row) } else { (&row, build) };
                    if let Some(joined) = self.plan.try_join(a, b)? {
                        matched = true;
                        self.matched[i] = true;
                        out.push_back(joined);
                    }
                }
                if !matched && matches!(kind, JoinKind::Outer(_)) {
                    let padded = if self.swapped {
                        self.plan.layout.join(None, Some(&row))
                    } else {
                        self.plan.layout.join(Some(&row), None)
                    };
                    out.push_back(padded);
                }
            }
            JoinKind::Mark { anti, .. } => {
                let mut matched = false;
                for (_, build) in self.table.candidates(value) {
                    if self.plan.try_join(&row, build)?.is_some() {
                        matched = true;
                        break;
                    }
                }
                out.push_back(mark_row(&self.header, &row, matched != *anti)?);
            }
            JoinKind::Single => {
                let mut found = None;
                for (_, build) in self.table.candidates(value) {
                    if let Some(joined) = self.plan.try_join(&row, build)? {
                        if found.is_some() {
                            return Err(Error::cardinality_violation(
                                "the right side of a single join returned more than one row",
                            ));
                        }
                        found = Some(joined);
                    }
                }
                out.push_back(found.unwrap_or_else(|| self.plan.layout.join(Some(&row), None)));
            }
        }
        Ok(())
    }

    /// Pads the build rows that never matched.
    fn unmatched(&self, out: &mut VecDeque<Row>) {
        for (row, _) in self
            .table
            .rows()
            .iter()
            .zip(&self.matched)
            .filter(|(_, matched)| !**matched)
        {
            let padded = if self.swapped {
                self.plan.layout.join(Some(row), None)
            } else {
                self.plan.layout.join(None, Some(row))
            };
            out.push_back(padded);
        }
    }
}

impl RowStream for HashJoinStream {
    fn header(&mut self) -> Result<HeaderRef> {
        Ok(self.init()?.header.clone())
    }

    fn has_next(&mut self) -> Result<bool> {
        self.init()?;
        while self.cache.is_empty() && !self.state.is_exhausted() {
            let Some(build) = self.build.as_mut() else {
                break;
            };
            let probe = if build.swapped { &mut self.b } else { &mut self.a };
            if probe.has_next()? {
                let row = probe.next()?;
                build.probe(row, &self.kind, &mut self.cache)?;
            } else {
                if let JoinKind::Outer(outer) = self.kind {
                    let keeps_build = if build.swapped {
                        outer.keeps_left()
                    } else {
                        outer.keeps_right()
                    };
                    if keeps_build {
                        build.unmatched(&mut self.cache);
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
