//! Operator dispatch.

use super::join::{
    CrossJoinStream, HashJoinStream, JoinAlgorithm, JoinBy, JoinByStream, JoinCondition,
    JoinKind, NestedLoopJoinStream, SortedMergeJoinStream,
};
use super::set_ops::{MembershipStream, PathUnionStream, UnionAllStream, UnionDistinctStream};
use super::{
    AddSchemaPrefixStream, AddSequenceStream, DistinctStream, DownsampleStream, GroupByStream,
    LimitStream, MappingTransformStream, ProjectStream, RenameStream, ReorderStream,
    RowTransformStream, SelectStream, SetTransformStream, SortStream, ValueToSelectedPathStream,
};
use crate::config::ExecutorConfig;
use crate::context::RequestContext;
use crate::function::{FunctionCall, FunctionKind};
use crate::planner::{BinaryOperator, PhysicalPlan, UnaryOperator};
use crate::stream::BoxedStream;
use quarry_core::{Error, Result};
use tracing::debug;

/// Maps operator descriptions to stream implementations.
///
/// Parameter combinations that can never run (a downsample over an
/// unkeyed stream, a function of the wrong kind, a sorted merge mark join)
/// are rejected here, before any row is pulled.
#[derive(Clone, Debug, Default)]
pub struct StreamExecutor {
    config: ExecutorConfig,
}

impl StreamExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Builds a plan bottom-up, binding `context` to every stream.
    pub fn build(&self, plan: PhysicalPlan, context: &RequestContext) -> Result<BoxedStream> {
        let mut stream = match plan {
            PhysicalPlan::Source(stream) => stream,
            PhysicalPlan::Unary { op, input } => {
                let input = self.build(*input, context)?;
                self.execute_unary(op, input)?
            }
            PhysicalPlan::Binary { op, left, right } => {
                let left = self.build(*left, context)?;
                let right = self.build(*right, context)?;
                self.execute_binary(op, left, right)?
            }
        };
        stream.set_context(context);
        Ok(stream)
    }

    /// Wraps `input` in the stream implementing `op`.
    pub fn execute_unary(&self, op: UnaryOperator, mut input: BoxedStream) -> Result<BoxedStream> {
        debug!(operator = op.name(), "building unary stream");
        let stream: BoxedStream = match op {
            UnaryOperator::Project {
                patterns,
                remain_key,
            } => Box::new(ProjectStream::new(input, &patterns, remain_key)?),
            UnaryOperator::Select { filter } => Box::new(SelectStream::new(
                input,
                filter,
                self.config.select_batch_size,
            )?),
            UnaryOperator::Sort { sort_by } => Box::new(SortStream::new(input, sort_by)),
            UnaryOperator::Limit { limit, offset } => {
                Box::new(LimitStream::new(input, limit, offset))
            }
            UnaryOperator::Downsample {
                precision,
                slide,
                begin,
                end,
                calls,
            } => {
                check_calls(&calls, FunctionKind::Set)?;
                if !input.header()?.has_key() {
                    return Err(Error::invalid_parameter(
                        "downsample requires a key column",
                    ));
                }
                Box::new(DownsampleStream::new(input, precision, slide, begin, end, calls)?)
            }
            UnaryOperator::RowTransform { calls } => {
                check_calls(&calls, FunctionKind::Row)?;
                Box::new(RowTransformStream::new(input, calls))
            }
            UnaryOperator::SetTransform { calls } => {
                check_calls(&calls, FunctionKind::Set)?;
                Box::new(SetTransformStream::new(input, calls))
            }
            UnaryOperator::MappingTransform { calls } => {
                check_calls(&calls, FunctionKind::Mapping)?;
                Box::new(MappingTransformStream::new(input, calls))
            }
            UnaryOperator::Rename { aliases, ignore } => {
                Box::new(RenameStream::new(input, aliases, &ignore)?)
            }
            UnaryOperator::Reorder {
                patterns,
                keep_order,
            } => Box::new(ReorderStream::new(input, &patterns, &keep_order)?),
            UnaryOperator::AddSchemaPrefix { prefix } => {
                Box::new(AddSchemaPrefixStream::new(input, prefix))
            }
            UnaryOperator::GroupBy { group_by, calls } => {
                check_calls(&calls, FunctionKind::Set)?;
                Box::new(GroupByStream::new(input, group_by, calls))
            }
            UnaryOperator::Distinct { patterns } => {
                let projected = Box::new(ProjectStream::new(input, &patterns, false)?);
                Box::new(DistinctStream::new(projected))
            }
            UnaryOperator::AddSequence {
                starts,
                increments,
                columns,
            } => Box::new(AddSequenceStream::new(input, starts, increments, columns)?),
            UnaryOperator::ValueToSelectedPath { prefix } => {
                Box::new(ValueToSelectedPathStream::new(input, prefix))
            }
        };
        Ok(stream)
    }

    /// Combines `left` and `right` with the stream implementing `op`.
    pub fn execute_binary(
        &self,
        op: BinaryOperator,
        left: BoxedStream,
        right: BoxedStream,
    ) -> Result<BoxedStream> {
        debug!(operator = op.name(), "building binary stream");
        let stream: BoxedStream = match op {
            BinaryOperator::CrossJoin { prefix_a, prefix_b } => {
                Box::new(CrossJoinStream::new(left, right, prefix_a, prefix_b))
            }
            BinaryOperator::InnerJoin {
                condition,
                algorithm,
            } => join(left, right, condition, JoinKind::Inner, algorithm)?,
            BinaryOperator::OuterJoin {
                outer_type,
                condition,
                algorithm,
            } => join(left, right, condition, JoinKind::Outer(outer_type), algorithm)?,
            BinaryOperator::MarkJoin {
                condition,
                mark_column,
                anti,
                algorithm,
            } => {
                let kind = JoinKind::Mark {
                    column: mark_column,
                    anti,
                };
                join(left, right, condition, kind, algorithm)?
            }
            BinaryOperator::SingleJoin {
                condition,
                algorithm,
            } => join(left, right, condition, JoinKind::Single, algorithm)?,
            BinaryOperator::Join { join_by } => {
                let join_by: JoinBy = join_by.parse()?;
                Box::new(JoinByStream::new(left, right, join_by))
            }
            BinaryOperator::PathUnion => Box::new(
                PathUnionStream::new(left, right)
                    .warn_on_overlapping_keys(self.config.warn_on_overlapping_keys),
            ),
            BinaryOperator::Union {
                distinct,
                left_order,
                right_order,
            } => {
                let left = reorder(left, &left_order)?;
                let right = reorder(right, &right_order)?;
                if distinct {
                    Box::new(UnionDistinctStream::new(left, right))
                } else {
                    Box::new(UnionAllStream::new(left, right))
                }
            }
            BinaryOperator::Except {
                distinct,
                left_order,
                right_order,
            } => Box::new(MembershipStream::except(
                reorder(left, &left_order)?,
                reorder(right, &right_order)?,
                distinct,
            )),
            BinaryOperator::Intersect {
                distinct,
                left_order,
                right_order,
            } => Box::new(MembershipStream::intersect(
                reorder(left, &left_order)?,
                reorder(right, &right_order)?,
                distinct,
            )),
        };
        Ok(stream)
    }
}

fn check_calls(calls: &[FunctionCall], kind: FunctionKind) -> Result<()> {
    calls.iter().try_for_each(|call| call.check(kind))
}

fn reorder(stream: BoxedStream, patterns: &[String]) -> Result<BoxedStream> {
    if patterns.is_empty() {
        return Ok(stream);
    }
    Ok(Box::new(ReorderStream::new(stream, patterns, &[])?))
}

fn join(
    left: BoxedStream,
    right: BoxedStream,
    condition: JoinCondition,
    kind: JoinKind,
    algorithm: JoinAlgorithm,
) -> Result<BoxedStream> {
    debug!(kind = kind.name(), %algorithm, "selected join algorithm");
    if let Some(filter) = &condition.filter {
        filter.compile()?;
    }
    let stream: BoxedStream = match algorithm {
        JoinAlgorithm::HashJoin => Box::new(HashJoinStream::new(left, right, condition, kind)),
        JoinAlgorithm::NestedLoopJoin => {
            Box::new(NestedLoopJoinStream::new(left, right, condition, kind))
        }
        JoinAlgorithm::SortedMergeJoin => {
            Box::new(SortedMergeJoinStream::new(left, right, condition, kind)?)
        }
    };
    Ok(stream)
}
