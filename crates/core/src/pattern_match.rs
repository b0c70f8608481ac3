//! Path pattern matching for column selection.
//!
//! Column paths are dotted strings such as `us.d1.s1`. A pattern may contain
//! `*`, which matches any (possibly empty) run of characters, dots included:
//!
//! - `us.d1.s1`  matches exactly that path
//! - `us.*`      matches every path below `us`
//! - `*.s1`      matches every path ending in `.s1`
//! - `*`         matches everything
//!
//! Simple shapes are matched with string operations, anything else is
//! compiled once into an anchored regex.

use crate::error::{Error, Result};
use regex::Regex;

/// Returns true if `path` contains a wildcard.
#[inline]
pub fn is_pattern(path: &str) -> bool {
    path.contains('*')
}

/// A compiled column path pattern.
#[derive(Clone, Debug)]
pub enum PathPattern {
    /// Literal path: `us.d1.s1`
    Exact(String),
    /// Prefix match: `us.*`
    Prefix(String),
    /// Any path: `*`
    Any,
    /// Anything else, compiled to an anchored regex
    Complex(Regex),
}

impl PathPattern {
    /// Compiles a path pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        if !is_pattern(pattern) {
            return Ok(PathPattern::Exact(pattern.to_string()));
        }
        if pattern == "*" {
            return Ok(PathPattern::Any);
        }
        if let Some(prefix) = pattern.strip_suffix('*') {
            if !is_pattern(prefix) {
                return Ok(PathPattern::Prefix(prefix.to_string()));
            }
        }
        let regex = Regex::new(&to_regex(pattern))
            .map_err(|e| Error::invalid_parameter(format!("bad path pattern {pattern}: {e}")))?;
        Ok(PathPattern::Complex(regex))
    }

    /// Tests a column path against the pattern.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => p == path,
            PathPattern::Prefix(p) => path.starts_with(p.as_str()),
            PathPattern::Any => true,
            PathPattern::Complex(re) => re.is_match(path),
        }
    }

    /// Returns true if the pattern can match more than one path.
    pub fn is_wildcard(&self) -> bool {
        !matches!(self, PathPattern::Exact(_))
    }
}

/// Translates a path pattern into an anchored regex, escaping everything but `*`.
fn to_regex(pattern: &str) -> String {
    let parts: Vec<String> = pattern.split('*').map(regex::escape).collect();
    format!("^{}$", parts.join(".*"))
}

/// Compiles a user supplied LIKE regex, anchored so it must match the whole value.
pub fn compile_like(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| Error::invalid_parameter(format!("bad like pattern {pattern}: {e}")))
}

/// Full-match of `value` against a LIKE regex compiled on the spot.
///
/// For patterns known ahead of time, compile once with [`compile_like`].
pub fn regex_full_match(value: &str, pattern: &str) -> Result<bool> {
    Ok(compile_like(pattern)?.is_match(value))
}
