//! Error types for the Quarry stream executor.

use crate::types::DataType;
use thiserror::Error;

/// Result type alias for Quarry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or draining row streams.
///
/// Validation errors surface at stream construction or first header
/// computation, execution errors surface during iteration. Calling
/// `next()` on an exhausted stream is reported as [`Error::StreamExhausted`],
/// which is a contract violation by the caller, not a data error.
#[derive(Debug, Error)]
pub enum Error {
    /// An operator parameter is malformed or inconsistent with its input.
    #[error("invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// A referenced column does not exist in the header.
    #[error("column not found: {column}")]
    ColumnNotFound { column: String },

    /// Two headers cannot be combined by a set operation.
    #[error("incomparable headers: {message}")]
    IncomparableHeaders { message: String },

    /// The requested algorithm does not exist for the operator.
    #[error("unsupported algorithm {algorithm} for {operator}")]
    UnsupportedAlgorithm { operator: String, algorithm: String },

    /// A function call failed while being evaluated.
    #[error("execute function {function} failure: {source}")]
    FunctionFailure {
        function: String,
        #[source]
        source: Box<Error>,
    },

    /// A single join found more than one matching row.
    #[error("cardinality violation: {message}")]
    CardinalityViolation { message: String },

    /// A value did not have the expected type.
    #[error("type mismatch: expected {expected:?}, got {got:?}")]
    TypeMismatch { expected: DataType, got: DataType },

    /// Generic execution failure.
    #[error("execution failure: {message}")]
    Execution { message: String },

    /// `next()` was called after `has_next()` returned false.
    #[error("stream is exhausted")]
    StreamExhausted,

    /// Releasing a stream failed.
    #[error("close failure: {message}")]
    Close { message: String },
}

impl Error {
    /// Creates an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            message: message.into(),
        }
    }

    /// Creates a column not found error.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Error::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Creates an incomparable headers error.
    pub fn incomparable_headers(message: impl Into<String>) -> Self {
        Error::IncomparableHeaders {
            message: message.into(),
        }
    }

    /// Creates an unsupported algorithm error.
    pub fn unsupported_algorithm(operator: impl Into<String>, algorithm: impl Into<String>) -> Self {
        Error::UnsupportedAlgorithm {
            operator: operator.into(),
            algorithm: algorithm.into(),
        }
    }

    /// Wraps a function evaluation error with the function identifier.
    pub fn function_failure(function: impl Into<String>, source: Error) -> Self {
        Error::FunctionFailure {
            function: function.into(),
            source: Box::new(source),
        }
    }

    /// Creates a cardinality violation error.
    pub fn cardinality_violation(message: impl Into<String>) -> Self {
        Error::CardinalityViolation {
            message: message.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: DataType, got: DataType) -> Self {
        Error::TypeMismatch { expected, got }
    }

    /// Creates a generic execution error.
    pub fn execution(message: impl Into<String>) -> Self {
        Error::Execution {
            message: message.into(),
        }
    }

    /// Creates a close failure.
    pub fn close(message: impl Into<String>) -> Self {
        Error::Close {
            message: message.into(),
        }
    }

    /// Returns true for errors raised while validating operator parameters.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidParameter { .. }
                | Error::ColumnNotFound { .. }
                | Error::IncomparableHeaders { .. }
                | Error::UnsupportedAlgorithm { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::type_mismatch(DataType::Int64, DataType::Binary);
        assert_eq!(err.to_string(), "type mismatch: expected Int64, got Binary");

        let err = Error::invalid_parameter("TableA has no path: a.x");
        assert_eq!(err.to_string(), "invalid parameter: TableA has no path: a.x");

        assert_eq!(Error::StreamExhausted.to_string(), "stream is exhausted");
    }

    #[test]
    fn test_function_failure_keeps_identifier() {
        let err = Error::function_failure("avg", Error::execution("division by zero"));
        let msg = err.to_string();
        assert!(msg.contains("avg"));
        assert!(msg.contains("division by zero"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_validation_classification() {
        assert!(Error::invalid_parameter("x").is_validation());
        assert!(Error::column_not_found("a").is_validation());
        assert!(Error::unsupported_algorithm("MarkJoin", "SortedMergeJoin").is_validation());
        assert!(!Error::cardinality_violation("x").is_validation());
        assert!(!Error::StreamExhausted.is_validation());
    }
}
