//! Quarry Query - pull-based row stream operators.
//!
//! This crate provides the query execution layer built on `quarry-core`:
//!
//! - `stream`: The `RowStream` pull protocol and the in-memory `Table`
//! - `ast`: Row filters and sort orders
//! - `function`: Row, set and mapping function contracts plus builtin aggregates
//! - `executor`: Stream operators (project, select, sort, joins, set operations, ...)
//! - `planner`: Operator descriptions and physical plan trees
//! - `config`: Executor tunables
//! - `context`: Request-scoped warning channel
//!
//! # Example
//!
//! ```rust
//! use quarry_core::schema::{Field, Header};
//! use quarry_core::{DataType, Row, Value};
//! use quarry_query::context::RequestContext;
//! use quarry_query::executor::StreamExecutor;
//! use quarry_query::planner::{PhysicalPlan, UnaryOperator};
//! use quarry_query::stream::{collect_rows, Table};
//!
//! let header = Header::with_key(vec![Field::new("t.a", DataType::Int64)]).into_ref();
//! let rows = (1..=5)
//!     .map(|k| Row::with_key(header.clone(), k, vec![Value::Int64(k * 10)]))
//!     .collect();
//! let table = Table::new(header, rows);
//!
//! let plan = PhysicalPlan::source(Box::new(table))
//!     .then(UnaryOperator::Limit { limit: 2, offset: 1 });
//! let stream = StreamExecutor::default()
//!     .build(plan, &RequestContext::new())
//!     .unwrap();
//! let rows = collect_rows(stream).unwrap();
//!
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[0].key(), Some(2));
//! ```

pub mod ast;
pub mod config;
pub mod context;
pub mod executor;
pub mod function;
pub mod planner;
pub mod stream;

pub use config::ExecutorConfig;
pub use context::RequestContext;
pub use stream::{BoxedStream, RowStream, Table};
