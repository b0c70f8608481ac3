//! Set operations over two streams.
//!
//! Union, Except and Intersect need structurally comparable headers and
//! compare rows with null equal to null; see [`check_headers_comparable`].
//! PathUnion instead merges streams whose field sets differ.

mod membership;
mod path_union;
mod union;

pub use membership::{Membership, MembershipStream};
pub use path_union::PathUnionStream;
pub use union::{UnionAllStream, UnionDistinctStream};

use quarry_core::schema::Header;
use quarry_core::{Error, Result};

/// Checks that rows of `b` can be compared with (and rebound to) `a`'s header.
///
/// Both must be keyed or both unkeyed, have the same number of fields, and
/// agree per position on type, where numeric types are interchangeable. An
/// unkeyed header needs at least one field.
pub fn check_headers_comparable(a: &Header, b: &Header) -> Result<()> {
    if a.has_key() != b.has_key() {
        return Err(Error::incomparable_headers(format!(
            "{a} and {b} do not agree on having a key"
        )));
    }
    if a.len() != b.len() {
        return Err(Error::incomparable_headers(format!(
            "{a} has {} fields but {b} has {}",
            a.len(),
            b.len()
        )));
    }
    if !a.has_key() && a.is_empty() {
        return Err(Error::incomparable_headers("unkeyed headers without fields"));
    }
    for (fa, fb) in a.fields().iter().zip(b.fields()) {
        if !fa.data_type().is_comparable_with(fb.data_type()) {
            return Err(Error::incomparable_headers(format!(
                "{} ({}) is not comparable with {} ({})",
                fa.full_name(),
                fa.data_type(),
                fb.full_name(),
                fb.data_type()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_util::long_header;
    use quarry_core::schema::Field;
    use quarry_core::DataType;

    #[test]
    fn test_comparable_headers() {
        let a = long_header(false, &["a", "b"]);
        let b = Header::new(vec![
            Field::new("x", DataType::Float64),
            Field::new("y", DataType::Int32),
        ]);
        assert!(check_headers_comparable(&a, &b).is_ok());

        let keyed = long_header(true, &["a", "b"]);
        assert!(check_headers_comparable(&a, &keyed).unwrap_err().is_validation());
        assert!(check_headers_comparable(&a, &long_header(false, &["a"])).is_err());
        assert!(check_headers_comparable(&Header::empty(), &Header::empty()).is_err());

        let text = Header::new(vec![
            Field::new("x", DataType::Binary),
            Field::new("y", DataType::Int64),
        ]);
        assert!(check_headers_comparable(&a, &text).is_err());
    }
}
