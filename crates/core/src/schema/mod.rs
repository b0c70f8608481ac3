//! Schema module.
//!
//! Field and header definitions shared by every stream.

mod field;
mod header;

pub use field::{Field, KEY_NAME};
pub use header::{Header, HeaderRef};
