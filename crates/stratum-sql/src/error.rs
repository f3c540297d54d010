//! Build-time error types for the query builder.

use thiserror::Error;

/// Errors raised while a statement is being built.
///
/// These fail fast: a builder call that receives invalid input reports it
/// immediately rather than deferring to compilation or execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A comparison operator string outside the supported surface.
    #[error("unsupported comparison operator [{0}]")]
    InvalidOperator(String),

    /// A batch insert whose rows do not share one column set.
    #[error("batch insert rows must share the same columns (expected [{expected}], found [{found}])")]
    InconsistentBatchColumns {
        /// Column list of the first row.
        expected: String,
        /// Column list of the offending row.
        found: String,
    },
}

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;
