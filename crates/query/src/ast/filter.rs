//! Filter expressions evaluated against rows.

use quarry_core::pattern_match::{compile_like, regex_full_match, PathPattern};
use quarry_core::{Result, Row, Value};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// Regex full-match over binary values.
    Like,
}

impl Op {
    fn accepts(self, ord: Ordering) -> bool {
        match self {
            Op::Eq => ord == Ordering::Equal,
            Op::Ne => ord != Ordering::Equal,
            Op::Gt => ord == Ordering::Greater,
            Op::Ge => ord != Ordering::Less,
            Op::Lt => ord == Ordering::Less,
            Op::Le => ord != Ordering::Greater,
            Op::Like => false,
        }
    }

    /// Applies the operator. A null operand, or operands of incomparable
    /// types, make the comparison false.
    pub fn test(self, left: &Value, right: &Value) -> Result<bool> {
        if left.is_null() || right.is_null() {
            return Ok(false);
        }
        if self == Op::Like {
            return match (left.as_str(), right.as_str()) {
                (Some(value), Some(pattern)) => regex_full_match(value, pattern),
                _ => Ok(false),
            };
        }
        Ok(left.compare(right).is_some_and(|ord| self.accepts(ord)))
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Like => "like",
        };
        f.write_str(s)
    }
}

/// A boolean expression over a row.
#[derive(Clone, Debug)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Bool(bool),
    /// Compares the row key. Unkeyed rows never match.
    Key { op: Op, value: i64 },
    /// Compares a column with a literal. A wildcard path matches if any
    /// matching column does.
    Value { path: String, op: Op, value: Value },
    /// Compares two columns of the same row.
    Path {
        path_a: String,
        op: Op,
        path_b: String,
    },
}

impl Filter {
    pub fn key(op: Op, value: i64) -> Self {
        Filter::Key { op, value }
    }

    pub fn value(path: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Filter::Value {
            path: path.into(),
            op,
            value: value.into(),
        }
    }

    pub fn path(path_a: impl Into<String>, op: Op, path_b: impl Into<String>) -> Self {
        Filter::Path {
            path_a: path_a.into(),
            op,
            path_b: path_b.into(),
        }
    }

    pub fn and(children: Vec<Filter>) -> Self {
        Filter::And(children)
    }

    pub fn or(children: Vec<Filter>) -> Self {
        Filter::Or(children)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Filter) -> Self {
        Filter::Not(Box::new(child))
    }

    /// Compiles path patterns and LIKE literals once, so a malformed pattern
    /// is rejected before any row is read.
    pub fn compile(&self) -> Result<CompiledFilter> {
        self.compile_node().map(CompiledFilter)
    }

    fn compile_node(&self) -> Result<Node> {
        let node = match self {
            Filter::And(children) => Node::And(Self::compile_all(children)?),
            Filter::Or(children) => Node::Or(Self::compile_all(children)?),
            Filter::Not(child) => Node::Not(Box::new(child.compile_node()?)),
            Filter::Bool(b) => Node::Bool(*b),
            Filter::Key { op, value } => Node::Key {
                op: *op,
                value: *value,
            },
            Filter::Value { path, op, value } => Node::Value {
                path: PathPattern::new(path)?,
                literal: Literal::new(*op, value)?,
            },
            Filter::Path { path_a, op, path_b } => Node::Path {
                path_a: path_a.clone(),
                op: *op,
                path_b: path_b.clone(),
            },
        };
        Ok(node)
    }

    fn compile_all(children: &[Filter]) -> Result<Vec<Node>> {
        children.iter().map(Filter::compile_node).collect()
    }

    /// Evaluates the filter against a row, compiling it first.
    pub fn validate(&self, row: &Row) -> Result<bool> {
        self.compile()?.validate(row)
    }

    /// Column pairs compared for equality at the top level or under `And`.
    pub fn equality_paths(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        self.collect_equality_paths(&mut pairs);
        pairs
    }

    fn collect_equality_paths<'a>(&'a self, pairs: &mut Vec<(&'a str, &'a str)>) {
        match self {
            Filter::Path {
                path_a,
                op: Op::Eq,
                path_b,
            } => pairs.push((path_a.as_str(), path_b.as_str())),
            Filter::And(children) => {
                for child in children {
                    child.collect_equality_paths(pairs);
                }
            }
            _ => {}
        }
    }
}

/// The right-hand side of a column-versus-literal comparison.
#[derive(Clone, Debug)]
enum Literal {
    Compare { op: Op, value: Value },
    Like(Regex),
    /// LIKE against a null or non-text literal.
    Never,
}

impl Literal {
    fn new(op: Op, value: &Value) -> Result<Self> {
        if op != Op::Like {
            return Ok(Literal::Compare {
                op,
                value: value.clone(),
            });
        }
        match value.as_str() {
            Some(pattern) => Ok(Literal::Like(compile_like(pattern)?)),
            None => Ok(Literal::Never),
        }
    }

    fn test(&self, left: &Value) -> Result<bool> {
        match self {
            Literal::Compare { op, value } => op.test(left, value),
            Literal::Like(regex) => Ok(left.as_str().is_some_and(|s| regex.is_match(s))),
            Literal::Never => Ok(false),
        }
    }
}

/// A [`Filter`] with its patterns compiled, built by [`Filter::compile`].
#[derive(Clone, Debug)]
pub struct CompiledFilter(Node);

impl CompiledFilter {
    /// Evaluates the filter against a row.
    pub fn validate(&self, row: &Row) -> Result<bool> {
        self.0.validate(row)
    }
}

#[derive(Clone, Debug)]
enum Node {
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
    Bool(bool),
    Key { op: Op, value: i64 },
    Value { path: PathPattern, literal: Literal },
    Path {
        path_a: String,
        op: Op,
        path_b: String,
    },
}

impl Node {
    fn validate(&self, row: &Row) -> Result<bool> {
        match self {
            Node::And(children) => {
                for child in children {
                    if !child.validate(row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Node::Or(children) => {
                for child in children {
                    if child.validate(row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Node::Not(child) => Ok(!child.validate(row)?),
            Node::Bool(b) => Ok(*b),
            Node::Key { op, value } => match row.key() {
                Some(key) => op.test(&Value::Int64(key), &Value::Int64(*value)),
                None => Ok(false),
            },
            Node::Value {
                path: PathPattern::Exact(path),
                literal,
            } => match row.value_of(path) {
                Some(v) => literal.test(&v),
                None => Ok(false),
            },
            Node::Value { path, literal } => {
                for index in row.header().pattern_indices(path) {
                    if literal.test(&row.values()[index])? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Node::Path { path_a, op, path_b } => {
                match (row.value_of(path_a), row.value_of(path_b)) {
                    (Some(a), Some(b)) => op.test(&a, &b),
                    _ => Ok(false),
                }
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, children: &[Filter], sep: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{child}")?;
            }
            f.write_str(")")
        }
        match self {
            Filter::And(children) => join(f, children, " && "),
            Filter::Or(children) => join(f, children, " || "),
            Filter::Not(child) => write!(f, "!{child}"),
            Filter::Bool(b) => write!(f, "{b}"),
            Filter::Key { op, value } => write!(f, "key {op} {value}"),
            Filter::Value { path, op, value } => write!(f, "{path} {op} {value}"),
            Filter::Path { path_a, op, path_b } => write!(f, "{path_a} {op} {path_b}"),
        }
    }
}
