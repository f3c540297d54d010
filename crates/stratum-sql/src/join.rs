//! Join clauses.

use std::fmt;

use crate::condition::{ConditionTree, Connector, Operator, Predicate};
use crate::expression::Column;

/// Join flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// `inner join`
    Inner,
    /// `left join`
    Left,
    /// `right join`
    Right,
    /// `cross join`
    Cross,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => f.write_str("inner join"),
            Self::Left => f.write_str("left join"),
            Self::Right => f.write_str("right join"),
            Self::Cross => f.write_str("cross join"),
        }
    }
}

/// One join clause: flavor, joined table, and an ON condition tree.
///
/// ON conditions are ordinary condition nodes, so a join may mix
/// column-to-column comparisons with bound predicates; any bindings they
/// carry are emitted ahead of the where bindings, matching clause order.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    /// Join flavor.
    pub join_type: JoinType,
    /// The joined table.
    pub table: String,
    /// The ON conditions. Empty for cross joins.
    pub on: ConditionTree,
}

impl JoinClause {
    /// Creates a join clause with an empty ON tree.
    pub fn new(join_type: JoinType, table: impl Into<String>) -> Self {
        Self {
            join_type,
            table: table.into(),
            on: ConditionTree::new(),
        }
    }

    /// Adds an ON condition comparing two columns, AND-connected.
    #[must_use]
    pub fn on(mut self, first: impl Into<Column>, operator: Operator, second: impl Into<Column>) -> Self {
        self.on.push(
            Connector::And,
            Predicate::ColumnCompare {
                first: first.into(),
                operator,
                second: second.into(),
            },
        );
        self
    }

    /// Adds an ON condition comparing two columns, OR-connected.
    #[must_use]
    pub fn or_on(mut self, first: impl Into<Column>, operator: Operator, second: impl Into<Column>) -> Self {
        self.on.push(
            Connector::Or,
            Predicate::ColumnCompare {
                first: first.into(),
                operator,
                second: second.into(),
            },
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_type_display() {
        assert_eq!(JoinType::Inner.to_string(), "inner join");
        assert_eq!(JoinType::Left.to_string(), "left join");
    }

    #[test]
    fn test_join_on_accumulates() {
        let join = JoinClause::new(JoinType::Left, "orders")
            .on("users.id", Operator::Eq, "orders.user_id")
            .or_on("users.alt_id", Operator::Eq, "orders.user_id");
        assert_eq!(join.on.len(), 2);
    }
}
