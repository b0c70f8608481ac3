//! Stream operators.
//!
//! Each operator wraps its input streams and produces rows lazily on
//! `has_next`/`next`. [`StreamExecutor`] builds operator trees from plans.

mod dedup;
mod distinct;
mod downsample;
mod group_by;
pub mod join;
mod limit;
mod project;
mod rename;
mod reorder;
mod runner;
mod schema_prefix;
mod select;
mod selected_path;
mod sequence;
pub mod set_ops;
mod sort;
mod transform;

#[cfg(test)]
pub(crate) mod test_util;

pub use distinct::DistinctStream;
pub use downsample::{DownsampleStream, WINDOW_END, WINDOW_START};
pub use group_by::GroupByStream;
pub use limit::LimitStream;
pub use project::ProjectStream;
pub use rename::RenameStream;
pub use reorder::ReorderStream;
pub use runner::StreamExecutor;
pub use schema_prefix::AddSchemaPrefixStream;
pub use select::SelectStream;
pub use selected_path::{ValueToSelectedPathStream, SELECTED_PATH};
pub use sequence::AddSequenceStream;
pub use sort::SortStream;
pub use transform::{MappingTransformStream, RowTransformStream, SetTransformStream};
