//! Quarry Core - value, schema and row vocabulary for the Quarry stream executor.
//!
//! This crate provides the foundational types shared by every operator:
//!
//! - `DataType`: Supported column types (Boolean, Int32, Int64, Float32, Float64, Binary)
//! - `Value`: Runtime values, with strict typed equality and numeric-coercing comparison
//! - `schema`: `Field` (name, type, tags) and `Header` (fields plus optional key)
//! - `Row`: Immutable values bound to one header, with an optional i64 key
//! - `pattern_match`: Wildcard column path patterns
//! - `Error`: Error taxonomy for stream construction and iteration
//!
//! # Example
//!
//! ```rust
//! use quarry_core::schema::{Field, Header};
//! use quarry_core::{DataType, Row, Value};
//!
//! let header = Header::with_key(vec![
//!     Field::new("t.a", DataType::Int64),
//!     Field::new("t.name", DataType::Binary),
//! ])
//! .into_ref();
//!
//! let row = Row::with_key(header, 1, vec![Value::Int64(10), Value::from("Alice")]);
//!
//! assert_eq!(row.key(), Some(1));
//! assert_eq!(row.value_of("t.a"), Some(Value::Int64(10)));
//! ```

mod error;
pub mod pattern_match;
mod row;
pub mod schema;
mod types;
mod value;

pub use error::{Error, Result};
pub use row::Row;
pub use types::DataType;
pub use value::Value;
