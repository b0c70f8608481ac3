//! Typed operator descriptions, one variant per operator kind.

use crate::ast::{Filter, SortOrder};
use crate::executor::join::{JoinAlgorithm, JoinCondition, OuterJoinType};
use crate::function::FunctionCall;

/// Operator over one child stream.
#[derive(Clone, Debug)]
pub enum UnaryOperator {
    /// Keeps the fields matching any pattern.
    Project {
        patterns: Vec<String>,
        remain_key: bool,
    },
    /// Keeps the rows satisfying the filter.
    Select { filter: Filter },
    Sort { sort_by: Vec<(String, SortOrder)> },
    Limit { limit: usize, offset: usize },
    /// Windowed aggregation over `[begin, end)`.
    Downsample {
        precision: i64,
        slide: i64,
        begin: i64,
        end: i64,
        calls: Vec<FunctionCall>,
    },
    RowTransform { calls: Vec<FunctionCall> },
    SetTransform { calls: Vec<FunctionCall> },
    MappingTransform { calls: Vec<FunctionCall> },
    /// Renames fields; `ignore` patterns are left untouched.
    Rename {
        aliases: Vec<(String, String)>,
        ignore: Vec<String>,
    },
    Reorder {
        patterns: Vec<String>,
        keep_order: Vec<bool>,
    },
    AddSchemaPrefix { prefix: Option<String> },
    GroupBy {
        group_by: Vec<String>,
        calls: Vec<FunctionCall>,
    },
    /// Distinct rows of the projection onto `patterns`.
    Distinct { patterns: Vec<String> },
    AddSequence {
        starts: Vec<i64>,
        increments: Vec<i64>,
        columns: Vec<String>,
    },
    /// Emits each non-null cell as a `SelectedPath` row, under `prefix` if set.
    ValueToSelectedPath { prefix: Option<String> },
}

impl UnaryOperator {
    pub fn name(&self) -> &'static str {
        match self {
            UnaryOperator::Project { .. } => "Project",
            UnaryOperator::Select { .. } => "Select",
            UnaryOperator::Sort { .. } => "Sort",
            UnaryOperator::Limit { .. } => "Limit",
            UnaryOperator::Downsample { .. } => "Downsample",
            UnaryOperator::RowTransform { .. } => "RowTransform",
            UnaryOperator::SetTransform { .. } => "SetTransform",
            UnaryOperator::MappingTransform { .. } => "MappingTransform",
            UnaryOperator::Rename { .. } => "Rename",
            UnaryOperator::Reorder { .. } => "Reorder",
            UnaryOperator::AddSchemaPrefix { .. } => "AddSchemaPrefix",
            UnaryOperator::GroupBy { .. } => "GroupBy",
            UnaryOperator::Distinct { .. } => "Distinct",
            UnaryOperator::AddSequence { .. } => "AddSequence",
            UnaryOperator::ValueToSelectedPath { .. } => "ValueToSelectedPath",
        }
    }
}

/// Operator over two child streams.
#[derive(Clone, Debug)]
pub enum BinaryOperator {
    CrossJoin {
        prefix_a: Option<String>,
        prefix_b: Option<String>,
    },
    InnerJoin {
        condition: JoinCondition,
        algorithm: JoinAlgorithm,
    },
    OuterJoin {
        outer_type: OuterJoinType,
        condition: JoinCondition,
        algorithm: JoinAlgorithm,
    },
    MarkJoin {
        condition: JoinCondition,
        mark_column: String,
        anti: bool,
        algorithm: JoinAlgorithm,
    },
    SingleJoin {
        condition: JoinCondition,
        algorithm: JoinAlgorithm,
    },
    /// Column-wise merge; `join_by` is `key` or `ordinal`.
    Join { join_by: String },
    PathUnion,
    /// `left_order`/`right_order`, when set, reorder each child first.
    Union {
        distinct: bool,
        left_order: Vec<String>,
        right_order: Vec<String>,
    },
    Except {
        distinct: bool,
        left_order: Vec<String>,
        right_order: Vec<String>,
    },
    Intersect {
        distinct: bool,
        left_order: Vec<String>,
        right_order: Vec<String>,
    },
}

impl BinaryOperator {
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOperator::CrossJoin { .. } => "CrossJoin",
            BinaryOperator::InnerJoin { .. } => "InnerJoin",
            BinaryOperator::OuterJoin { .. } => "OuterJoin",
            BinaryOperator::MarkJoin { .. } => "MarkJoin",
            BinaryOperator::SingleJoin { .. } => "SingleJoin",
            BinaryOperator::Join { .. } => "Join",
            BinaryOperator::PathUnion => "PathUnion",
            BinaryOperator::Union { .. } => "Union",
            BinaryOperator::Except { .. } => "Except",
            BinaryOperator::Intersect { .. } => "Intersect",
        }
    }
}
