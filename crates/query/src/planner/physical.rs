//! Physical plan tree.

use super::{BinaryOperator, UnaryOperator};
use crate::stream::BoxedStream;

/// A tree of operators over already-built leaf streams.
pub enum PhysicalPlan {
    /// A leaf stream, e.g. a storage scan or an in-memory table.
    Source(BoxedStream),
    Unary {
        op: UnaryOperator,
        input: Box<PhysicalPlan>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<PhysicalPlan>,
        right: Box<PhysicalPlan>,
    },
}

impl PhysicalPlan {
    pub fn source(stream: BoxedStream) -> Self {
        PhysicalPlan::Source(stream)
    }

    /// Applies a unary operator on top of this plan.
    pub fn then(self, op: UnaryOperator) -> Self {
        PhysicalPlan::Unary {
            op,
            input: Box::new(self),
        }
    }

    pub fn binary(op: BinaryOperator, left: PhysicalPlan, right: PhysicalPlan) -> Self {
        PhysicalPlan::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Number of operators in the tree, leaves excluded.
    pub fn operator_count(&self) -> usize {
        match self {
            PhysicalPlan::Source(_) => 0,
            PhysicalPlan::Unary { input, .. } => 1 + input.operator_count(),
            PhysicalPlan::Binary { left, right, .. } => {
                1 + left.operator_count() + right.operator_count()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_util::long_table;

    #[test]
    fn test_operator_count() {
        let plan = PhysicalPlan::binary(
            BinaryOperator::PathUnion,
            PhysicalPlan::source(long_table(true, &["a"], &[])),
            PhysicalPlan::source(long_table(true, &["b"], &[]))
                .then(UnaryOperator::Limit { limit: 1, offset: 0 }),
        )
        .then(UnaryOperator::AddSchemaPrefix {
            prefix: Some("p".into()),
        });
        assert_eq!(plan.operator_count(), 3);
    }
}
