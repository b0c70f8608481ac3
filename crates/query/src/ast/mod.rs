//! AST module for filter expressions and sort orders.

mod filter;

pub use filter::{CompiledFilter, Filter, Op};

/// Sort direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}
