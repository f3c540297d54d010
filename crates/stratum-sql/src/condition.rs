//! Condition trees.
//!
//! A condition tree is an ordered sequence of predicate nodes, each tagged
//! with the boolean connector joining it to the node before it. Nested
//! sub-trees express parenthesized groups. Trees are plain data: cloning a
//! tree yields a deep, independent copy.

use std::fmt;

use crate::error::BuildError;
use crate::expression::{Column, Expression};
use crate::plan::QueryPlan;
use crate::value::Value;

/// Boolean connector between a node and its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    /// AND connector.
    #[default]
    And,
    /// OR connector.
    Or,
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
        }
    }
}

/// Comparison operators accepted by the builder.
///
/// The set is closed: operator strings are validated when the predicate is
/// built, so an unsupported operator surfaces as [`BuildError::InvalidOperator`]
/// from the builder call rather than as malformed SQL later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `like`
    Like,
    /// `not like`
    NotLike,
}

impl Operator {
    /// Parses an operator string.
    ///
    /// Accepts the canonical forms plus `<>` for inequality; matching is
    /// case-insensitive for the word operators.
    pub fn parse(op: &str) -> Result<Self, BuildError> {
        match op.trim().to_ascii_lowercase().as_str() {
            "=" => Ok(Self::Eq),
            "!=" | "<>" => Ok(Self::NotEq),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::LtEq),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::GtEq),
            "like" => Ok(Self::Like),
            "not like" => Ok(Self::NotLike),
            other => Err(BuildError::InvalidOperator(String::from(other))),
        }
    }

    /// Returns the SQL spelling of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Like => "like",
            Self::NotLike => "not like",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One predicate node.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column op ?`
    Comparison {
        /// Left-hand column.
        column: Column,
        /// Comparison operator.
        operator: Operator,
        /// Bound right-hand value.
        value: Value,
    },
    /// `first op second` — both sides identifiers, no bindings. Used by
    /// join ON clauses and column-to-column wheres.
    ColumnCompare {
        /// Left-hand column.
        first: Column,
        /// Comparison operator.
        operator: Operator,
        /// Right-hand column.
        second: Column,
    },
    /// `column [not] in (?, ...)`
    In {
        /// Tested column.
        column: Column,
        /// Bound list values.
        values: Vec<Value>,
        /// True for NOT IN.
        negated: bool,
    },
    /// `column [not] between ? and ?`
    Between {
        /// Tested column.
        column: Column,
        /// Lower bound.
        low: Value,
        /// Upper bound.
        high: Value,
        /// True for NOT BETWEEN.
        negated: bool,
    },
    /// `column is [not] null`
    Null {
        /// Tested column.
        column: Column,
        /// True for IS NOT NULL.
        negated: bool,
    },
    /// A parenthesized sub-tree.
    Nested {
        /// The grouped conditions.
        tree: ConditionTree,
    },
    /// `[not] exists (subquery)`
    Exists {
        /// The correlated subquery.
        subquery: Box<QueryPlan>,
        /// True for NOT EXISTS.
        negated: bool,
    },
    /// A raw fragment inserted verbatim, with its own bindings.
    Raw {
        /// The fragment.
        expression: Expression,
        /// Bindings the fragment's placeholders consume.
        bindings: Vec<Value>,
    },
}

/// A predicate node plus its connector to the previous node.
///
/// The connector of the first node in a tree is never emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionNode {
    /// Connector to the preceding node.
    pub connector: Connector,
    /// The predicate itself.
    pub predicate: Predicate,
}

/// An ordered sequence of condition nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionTree {
    nodes: Vec<ConditionNode>,
}

impl ConditionTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the tree holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Appends a predicate with the given connector.
    pub fn push(&mut self, connector: Connector, predicate: Predicate) {
        self.nodes.push(ConditionNode {
            connector,
            predicate,
        });
    }

    /// Iterates the nodes in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, ConditionNode> {
        self.nodes.iter()
    }
}

impl<'a> IntoIterator for &'a ConditionTree {
    type Item = &'a ConditionNode;
    type IntoIter = std::slice::Iter<'a, ConditionNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
