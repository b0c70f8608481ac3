//! Value type definitions.
//!
//! This module defines the `Value` enum which represents any value that can be held
//! in a row slot, including the null marker.
//!
//! Two notions of equality exist side by side:
//!
//! - `PartialEq`/`Hash` are strict and typed: `Int64(3) != Float64(3.0)` and
//!   `Null == Null`. They back grouping keys and hash map buckets.
//! - [`Value::compare`] orders numeric types across variants by exact value,
//!   and drives filters, join matching ([`Value::join_eq`]) and set-operation
//!   dedup ([`Value::loose_eq`]).

use crate::types::DataType;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A value stored in a row slot.
#[derive(Clone, Debug)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),
    /// Binary data, hashed and compared by content
    Binary(Vec<u8>),
}

impl Value {
    /// Returns the data type of this value, or None if it's Null.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Int32(_) => Some(DataType::Int32),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float32(_) => Some(DataType::Float32),
            Value::Float64(_) => Some(DataType::Float64),
            Value::Binary(_) => Some(DataType::Binary),
        }
    }

    /// Returns true if this value is Null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for the four numeric variants.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int32(_) | Value::Int64(_) | Value::Float32(_) | Value::Float64(_)
        )
    }

    /// Returns the boolean value if this is a Boolean, None otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the i32 value if this is an Int32, None otherwise.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integral value widened to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns any numeric value widened to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the bytes if this is Binary, None otherwise.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Returns the bytes as UTF-8 text if this is valid UTF-8 Binary.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Widens numeric values to `Float64`; other values are returned as is.
    ///
    /// Negative zero is folded into positive zero and every NaN into the
    /// canonical one, so coerced values hash alike.
    pub fn coerce_to_double(&self) -> Value {
        match self.as_f64() {
            Some(v) if v == 0.0 => Value::Float64(0.0),
            Some(v) if v.is_nan() => Value::Float64(f64::NAN),
            Some(v) => Value::Float64(v),
            None => self.clone(),
        }
    }

    /// Compares two non-null values. Numeric types compare across variants by
    /// exact value, so large integers are never rounded through `f64`.
    ///
    /// Returns None when either side is null or NaN, or the types are incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Binary(a), Value::Binary(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                (Some(x), None) => cmp_int_float(x, b.as_f64()?),
                (None, Some(y)) => cmp_int_float(y, a.as_f64()?).map(Ordering::reverse),
                (None, None) => a.as_f64()?.partial_cmp(&b.as_f64()?),
            },
            _ => None,
        }
    }

    /// Equality for join matching: null never equals anything.
    #[inline]
    pub fn join_eq(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Equality for dedup: null equals null, NaN equals NaN, numeric types
    /// compare across variants.
    #[inline]
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self.is_null(), other.is_null()) {
            (true, true) => true,
            (false, false) => self.join_eq(other) || (self.is_nan() && other.is_nan()),
            _ => false,
        }
    }

    fn is_nan(&self) -> bool {
        match self {
            Value::Float32(v) => v.is_nan(),
            Value::Float64(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Returns a type ordering value for comparing different types.
    fn type_order(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Int32(_) | Value::Int64(_) | Value::Float32(_) | Value::Float64(_) => 2,
            Value::Binary(_) => 3,
        }
    }
}

/// Exact comparison of an integer with a float. None if the float is NaN.
fn cmp_int_float(i: i64, f: f64) -> Option<Ordering> {
    // 2^63, exactly representable
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() {
        return None;
    }
    if f >= BOUND {
        return Some(Ordering::Less);
    }
    if f < -BOUND {
        return Some(Ordering::Greater);
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0f64.partial_cmp(&(f - whole)),
        ord => Some(ord),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => {
                // Handle NaN comparison
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (Value::Float64(a), Value::Float64(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (Value::Binary(a), Value::Binary(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Int32(i) => i.hash(state),
            Value::Int64(i) => i.hash(state),
            Value::Float32(f) => {
                let f = if *f == 0.0 { 0.0f32 } else if f.is_nan() { f32::NAN } else { *f };
                f.to_bits().hash(state)
            }
            Value::Float64(f) => {
                let f = if *f == 0.0 { 0.0f64 } else if f.is_nan() { f64::NAN } else { *f };
                f.to_bits().hash(state)
            }
            Value::Binary(b) => b.hash(state),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    /// Total order used by Sort: nulls first, numeric types compared across
    /// variants, NaN greater than every other number.
    fn cmp(&self, other: &Self) -> Ordering {
        if let Some(ord) = self.compare(other) {
            return ord;
        }
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (a, b) if a.is_numeric() && b.is_numeric() => {
                // compare() only fails here when a NaN is involved
                let a_nan = a.as_f64().is_some_and(f64::is_nan);
                let b_nan = b.as_f64().is_some_and(f64::is_nan);
                a_nan.cmp(&b_nan)
            }
            _ => self.type_order().cmp(&other.type_order()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Binary(v) => f.write_str(&String::from_utf8_lossy(v)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Binary(v.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Binary(v.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(v: &Value) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_value_type_check() {
        assert_eq!(Value::Int64(42).data_type(), Some(DataType::Int64));
        assert_eq!(Value::Null.data_type(), None);
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
        assert_eq!(Value::Int32(42).as_i32(), Some(42));
        assert_eq!(Value::Int32(42).as_i64(), Some(42));
        assert_eq!(Value::Float32(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::from("abc").as_str(), Some("abc"));
        assert_eq!(Value::Binary(vec![1, 2, 3]).as_bytes(), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn test_strict_equality() {
        assert_eq!(Value::Int32(42), Value::Int32(42));
        assert_ne!(Value::Int32(42), Value::Int64(42));
        assert_eq!(Value::Null, Value::Null);
        assert_eq!(Value::from("x"), Value::from("x"));
    }

    #[test]
    fn test_binary_hashed_by_content() {
        let a = Value::Binary(b"hello".to_vec());
        let b = Value::Binary(b"hello".to_vec());
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_coerced_compare() {
        assert_eq!(Value::Int64(3).compare(&Value::Float64(3.0)), Some(Ordering::Equal));
        assert_eq!(Value::Int32(2).compare(&Value::Int64(3)), Some(Ordering::Less));
        assert_eq!(Value::Int64(3).compare(&Value::from("3")), None);
        assert_eq!(Value::Null.compare(&Value::Null), None);
    }

    #[test]
    fn test_join_eq_excludes_null() {
        assert!(Value::Int64(3).join_eq(&Value::Float64(3.0)));
        assert!(!Value::Null.join_eq(&Value::Null));
        assert!(!Value::Int64(1).join_eq(&Value::Null));
    }

    #[test]
    fn test_loose_eq_matches_null() {
        assert!(Value::Null.loose_eq(&Value::Null));
        assert!(!Value::Null.loose_eq(&Value::Int64(0)));
        assert!(Value::Int32(7).loose_eq(&Value::Float32(7.0)));
    }

    #[test]
    fn test_loose_eq_nan() {
        let nan = Value::Float64(f64::NAN);
        assert!(nan.loose_eq(&Value::Float64(f64::NAN)));
        assert!(nan.loose_eq(&Value::Float32(f32::NAN)));
        assert!(!nan.loose_eq(&Value::Float64(1.0)));
        assert!(!nan.join_eq(&nan));
        assert_eq!(
            hash_of(&Value::Float64(-f64::NAN).coerce_to_double()),
            hash_of(&Value::Float32(f32::NAN).coerce_to_double())
        );
    }

    #[test]
    fn test_large_integer_compare_is_exact() {
        let two_53 = 1i64 << 53;
        let float = Value::Float64(two_53 as f64);
        let below = Value::Int64(two_53);
        let above = Value::Int64(two_53 + 1);

        assert_eq!(float.compare(&below), Some(Ordering::Equal));
        assert_eq!(float.compare(&above), Some(Ordering::Less));
        assert_eq!(above.compare(&float), Some(Ordering::Greater));
        assert!(below < above);
        assert!(!float.join_eq(&above));

        assert_eq!(Value::Int64(2).compare(&Value::Float64(2.5)), Some(Ordering::Less));
        assert_eq!(Value::Int64(-2).compare(&Value::Float64(-2.5)), Some(Ordering::Greater));
        assert_eq!(Value::Int64(i64::MAX).compare(&Value::Float64(f64::INFINITY)), Some(Ordering::Less));
        assert_eq!(Value::Int64(i64::MIN).compare(&Value::Float64(-1e19)), Some(Ordering::Greater));
        assert_eq!(Value::Int64(1).compare(&Value::Float64(f64::NAN)), None);
    }

    #[test]
    fn test_total_order_is_transitive_across_variants() {
        let two_53 = 1i64 << 53;
        let mut values = vec![
            Value::Int64(two_53 + 1),
            Value::Float64(two_53 as f64),
            Value::Int64(two_53),
            Value::Float64(f64::NAN),
        ];
        values.sort();
        for w in values.windows(2) {
            assert_ne!(w[0].cmp(&w[1]), Ordering::Greater);
        }
        assert_eq!(values[2], Value::Int64(two_53 + 1));
        assert!(values[3].as_f64().is_some_and(f64::is_nan));
        for a in &values {
            for b in &values {
                for c in &values {
                    if a <= b && b <= c {
                        assert!(a <= c);
                    }
                }
            }
        }
    }

    #[test]
    fn test_coerce_to_double_hash() {
        let a = Value::Int64(3).coerce_to_double();
        let b = Value::Float32(3.0).coerce_to_double();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(
            hash_of(&Value::Float64(-0.0).coerce_to_double()),
            hash_of(&Value::Int64(0).coerce_to_double())
        );
        assert_eq!(Value::from("a").coerce_to_double(), Value::from("a"));
    }

    #[test]
    fn test_total_order() {
        let mut values = vec![
            Value::Float64(f64::NAN),
            Value::Int64(3),
            Value::Null,
            Value::Float64(1.5),
            Value::Int32(2),
        ];
        values.sort();
        assert_eq!(values[0], Value::Null);
        assert_eq!(values[1], Value::Float64(1.5));
        assert_eq!(values[2], Value::Int32(2));
        assert_eq!(values[3], Value::Int64(3));
        assert!(values[4].as_f64().is_some_and(f64::is_nan));
    }

    #[test]
    fn test_value_from_impls() {
        let v: Value = Some(100i64).into();
        assert_eq!(v.as_i64(), Some(100));

        let v: Value = None::<i32>.into();
        assert!(v.is_null());
        assert_eq!(Value::from("hi").to_string(), "hi");
    }
}
