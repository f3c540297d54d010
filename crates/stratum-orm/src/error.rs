//! Error types for the ORM layer.

use stratum_sql::{BuildError, Value};
use thiserror::Error;

/// A failure reported by a driver implementation.
///
/// Drivers collapse their backend-specific errors into this one kind; the
/// ORM wraps it with the compiled statement so a failure can be reproduced
/// without re-running application code.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DriverError {
    /// The backend's error message.
    pub message: String,
}

impl DriverError {
    /// Creates a driver error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// ORM-level errors.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Statement construction failed (invalid operator, inconsistent batch).
    #[error(transparent)]
    Build(#[from] BuildError),

    /// A relation name with no descriptor on the record type.
    #[error("relation [{relation}] is not defined on record type [{record_type}]")]
    RelationNotFound {
        /// The record type queried.
        record_type: String,
        /// The missing relation name.
        relation: String,
    },

    /// A relation descriptor pointing at an unregistered record type.
    #[error("record type [{0}] is not registered")]
    UnknownRecordType(String),

    /// A polymorphic relation resolved against a parent type that never
    /// registered a morph class value.
    #[error("record type [{record_type}] has no morph class registered")]
    AmbiguousMorphClass {
        /// The parent record type.
        record_type: String,
    },

    /// A statement the driver rejected, with full reproduction context.
    #[error("query failed: {source} (sql: {sql}, bindings: [{}])", inline_bindings(.bindings))]
    QueryExecution {
        /// The compiled SQL text.
        sql: String,
        /// The bindings that were sent with it.
        bindings: Vec<Value>,
        /// The driver's failure.
        source: DriverError,
    },

    /// A single-record lookup that matched nothing.
    #[error("no record found for [{record_type}]")]
    RecordNotFound {
        /// The record type queried.
        record_type: String,
    },
}

fn inline_bindings(bindings: &[Value]) -> String {
    bindings
        .iter()
        .map(Value::to_inline_sql)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for ORM operations.
pub type Result<T> = std::result::Result<T, OrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_execution_keeps_reproduction_context() {
        let err = OrmError::QueryExecution {
            sql: String::from("select * from \"users\" where \"id\" = ?"),
            bindings: vec![Value::Int(7)],
            source: DriverError::new("no such table: users"),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("no such table"));
        assert!(rendered.contains("select * from \"users\""));
        assert!(rendered.contains('7'));
    }
}
