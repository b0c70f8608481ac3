//! Operator descriptions and the physical plan tree.

mod operator;
mod physical;

pub use operator::{BinaryOperator, UnaryOperator};
pub use physical::PhysicalPlan;
