//! Raw SQL expressions.

use std::fmt;

/// An uninterpreted fragment of SQL.
///
/// Expressions are inserted verbatim at their declared position in the
/// compiled statement — the grammar never quotes, escapes, or parameterizes
/// them. They exist for the computed-column cases the structured builder
/// cannot express.
///
/// # Example
///
/// ```
/// use stratum_sql::Expression;
///
/// let expr = Expression::new("count(*) as total");
/// assert_eq!(expr.as_str(), "count(*) as total");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression(String);

impl Expression {
    /// Wraps a raw SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// Returns the wrapped fragment.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Expression {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for Expression {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}

/// A projected or referenced column: either an identifier the grammar will
/// quote segment-by-segment, or a raw expression passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// A (possibly dotted, possibly aliased) identifier.
    Name(String),
    /// A raw expression inserted verbatim.
    Raw(Expression),
}

impl Column {
    /// Shorthand for an identifier column.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Shorthand for a raw expression column.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(Expression::new(sql))
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Self::Name(String::from(name))
    }
}

impl From<String> for Column {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Expression> for Column {
    fn from(expr: Expression) -> Self {
        Self::Raw(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_equality() {
        assert_eq!(Expression::new("1 + 1"), Expression::from("1 + 1"));
        assert_ne!(Expression::new("1 + 1"), Expression::new("2"));
    }

    #[test]
    fn test_column_from_str() {
        assert_eq!(Column::from("users.id"), Column::name("users.id"));
        assert!(matches!(Column::raw("count(*)"), Column::Raw(_)));
    }
}
