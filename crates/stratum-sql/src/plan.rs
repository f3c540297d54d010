//! The query plan: a portable, dialect-agnostic statement representation.
//!
//! A [`QueryPlan`] is the accumulated state of the fluent builder API. It is
//! plain data — building mutates it, compiling never does, and `Clone`
//! produces a deep, structural copy, so branching into a nested group or
//! applying scopes can never alias another builder's state.

use crate::condition::{ConditionTree, Connector, Operator, Predicate};
use crate::error::{BuildError, Result};
use crate::expression::{Column, Expression};
use crate::join::{JoinClause, JoinType};
use crate::value::{ToValue, Value};

/// Sort direction for an ORDER BY entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// `asc`
    #[default]
    Asc,
    /// `desc`
    Desc,
}

impl Direction {
    /// Returns the SQL spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One ORDER BY entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// The ordered column (possibly raw).
    pub column: Column,
    /// Sort direction. Ignored for raw columns.
    pub direction: Direction,
}

/// Aggregate functions the compiler knows how to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    /// `count`
    Count,
    /// `min`
    Min,
    /// `max`
    Max,
    /// `sum`
    Sum,
    /// `avg`
    Avg,
}

impl AggregateFunction {
    /// Returns the SQL spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Min => "min",
            Self::Max => "max",
            Self::Sum => "sum",
            Self::Avg => "avg",
        }
    }
}

/// An aggregate projection replacing the plan's column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// The aggregate function.
    pub function: AggregateFunction,
    /// The aggregated column.
    pub column: Column,
}

/// The right-hand side of one UPDATE assignment: a bound value, or a raw
/// expression for computed assignments like `"votes" = "votes" + 1`.
#[derive(Debug, Clone, PartialEq)]
pub enum SetValue {
    /// A bound value, emitted as a placeholder.
    Value(Value),
    /// A raw expression, emitted verbatim with no binding.
    Raw(Expression),
}

impl SetValue {
    /// Shorthand for a bound assignment value.
    pub fn value(value: impl ToValue) -> Self {
        Self::Value(value.to_value())
    }

    /// Shorthand for a raw assignment expression.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(Expression::new(sql.into()))
    }
}

/// The accumulated state of one statement.
///
/// Field order mirrors clause order in the compiled SQL; the compiler
/// traverses these fields left to right, which is what keeps binding order
/// aligned with placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Target table.
    pub table: String,
    /// Projected columns; empty means `*`.
    pub columns: Vec<Column>,
    /// DISTINCT flag.
    pub distinct: bool,
    /// Joins in declaration order.
    pub joins: Vec<JoinClause>,
    /// WHERE tree.
    pub wheres: ConditionTree,
    /// GROUP BY columns.
    pub groups: Vec<Column>,
    /// HAVING tree.
    pub havings: ConditionTree,
    /// ORDER BY entries.
    pub orders: Vec<OrderBy>,
    /// LIMIT value.
    pub limit: Option<u64>,
    /// OFFSET value.
    pub offset: Option<u64>,
    /// Aggregate projection, when set by a terminal like `count`.
    pub aggregate: Option<Aggregate>,
}

impl QueryPlan {
    /// Creates an empty plan targeting the given table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            wheres: ConditionTree::new(),
            groups: Vec::new(),
            havings: ConditionTree::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            aggregate: None,
        }
    }

    // -- projection ---------------------------------------------------------

    /// Replaces the projected column list.
    #[must_use]
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| Column::from(*c)).collect();
        self
    }

    /// Appends one projected column.
    #[must_use]
    pub fn add_select(mut self, column: impl Into<Column>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Appends a raw expression to the projection.
    #[must_use]
    pub fn select_raw(mut self, sql: impl Into<String>) -> Self {
        self.columns.push(Column::Raw(Expression::new(sql.into())));
        self
    }

    /// Marks the query DISTINCT.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    // -- joins --------------------------------------------------------------

    /// Adds an inner join on a single column equality.
    #[must_use]
    pub fn join(self, table: &str, first: &str, operator: Operator, second: &str) -> Self {
        self.join_clause(JoinClause::new(JoinType::Inner, table).on(first, operator, second))
    }

    /// Adds a left join on a single column equality.
    #[must_use]
    pub fn left_join(self, table: &str, first: &str, operator: Operator, second: &str) -> Self {
        self.join_clause(JoinClause::new(JoinType::Left, table).on(first, operator, second))
    }

    /// Adds a right join on a single column equality.
    #[must_use]
    pub fn right_join(self, table: &str, first: &str, operator: Operator, second: &str) -> Self {
        self.join_clause(JoinClause::new(JoinType::Right, table).on(first, operator, second))
    }

    /// Adds a cross join.
    #[must_use]
    pub fn cross_join(self, table: &str) -> Self {
        self.join_clause(JoinClause::new(JoinType::Cross, table))
    }

    /// Adds a fully built join clause.
    #[must_use]
    pub fn join_clause(mut self, join: JoinClause) -> Self {
        self.joins.push(join);
        self
    }

    // -- where family -------------------------------------------------------

    /// Adds an AND-connected comparison. The two-argument convention:
    /// the operator defaults to `=`.
    #[must_use]
    pub fn where_eq(self, column: impl Into<Column>, value: impl ToValue) -> Self {
        self.where_op(column, Operator::Eq, value)
    }

    /// Adds an OR-connected `=` comparison.
    #[must_use]
    pub fn or_where_eq(self, column: impl Into<Column>, value: impl ToValue) -> Self {
        self.or_where_op(column, Operator::Eq, value)
    }

    /// Adds an AND-connected comparison with an explicit operator.
    #[must_use]
    pub fn where_op(mut self, column: impl Into<Column>, operator: Operator, value: impl ToValue) -> Self {
        self.wheres.push(
            Connector::And,
            Predicate::Comparison {
                column: column.into(),
                operator,
                value: value.to_value(),
            },
        );
        self
    }

    /// Adds an OR-connected comparison with an explicit operator.
    #[must_use]
    pub fn or_where_op(mut self, column: impl Into<Column>, operator: Operator, value: impl ToValue) -> Self {
        self.wheres.push(
            Connector::Or,
            Predicate::Comparison {
                column: column.into(),
                operator,
                value: value.to_value(),
            },
        );
        self
    }

    /// Adds an AND-connected comparison, parsing the operator string.
    ///
    /// Fails with [`BuildError::InvalidOperator`] right here — an
    /// unsupported operator never reaches compilation.
    pub fn try_where(self, column: impl Into<Column>, operator: &str, value: impl ToValue) -> Result<Self> {
        let operator = Operator::parse(operator)?;
        Ok(self.where_op(column, operator, value))
    }

    /// Adds an OR-connected comparison, parsing the operator string.
    pub fn try_or_where(self, column: impl Into<Column>, operator: &str, value: impl ToValue) -> Result<Self> {
        let operator = Operator::parse(operator)?;
        Ok(self.or_where_op(column, operator, value))
    }

    /// Adds an AND-connected column-to-column comparison.
    #[must_use]
    pub fn where_column(mut self, first: impl Into<Column>, operator: Operator, second: impl Into<Column>) -> Self {
        self.wheres.push(
            Connector::And,
            Predicate::ColumnCompare {
                first: first.into(),
                operator,
                second: second.into(),
            },
        );
        self
    }

    /// Adds an AND-connected IN predicate.
    #[must_use]
    pub fn where_in<V: ToValue>(mut self, column: impl Into<Column>, values: Vec<V>) -> Self {
        self.wheres.push(
            Connector::And,
            Predicate::In {
                column: column.into(),
                values: values.into_iter().map(ToValue::to_value).collect(),
                negated: false,
            },
        );
        self
    }

    /// Adds an AND-connected NOT IN predicate.
    #[must_use]
    pub fn where_not_in<V: ToValue>(mut self, column: impl Into<Column>, values: Vec<V>) -> Self {
        self.wheres.push(
            Connector::And,
            Predicate::In {
                column: column.into(),
                values: values.into_iter().map(ToValue::to_value).collect(),
                negated: true,
            },
        );
        self
    }

    /// Adds an OR-connected IN predicate.
    #[must_use]
    pub fn or_where_in<V: ToValue>(mut self, column: impl Into<Column>, values: Vec<V>) -> Self {
        self.wheres.push(
            Connector::Or,
            Predicate::In {
                column: column.into(),
                values: values.into_iter().map(ToValue::to_value).collect(),
                negated: false,
            },
        );
        self
    }

    /// Adds an OR-connected NOT IN predicate.
    #[must_use]
    pub fn or_where_not_in<V: ToValue>(mut self, column: impl Into<Column>, values: Vec<V>) -> Self {
        self.wheres.push(
            Connector::Or,
            Predicate::In {
                column: column.into(),
                values: values.into_iter().map(ToValue::to_value).collect(),
                negated: true,
            },
        );
        self
    }

    /// Adds an AND-connected BETWEEN predicate.
    #[must_use]
    pub fn where_between(mut self, column: impl Into<Column>, low: impl ToValue, high: impl ToValue) -> Self {
        self.wheres.push(
            Connector::And,
            Predicate::Between {
                column: column.into(),
                low: low.to_value(),
                high: high.to_value(),
                negated: false,
            },
        );
        self
    }

    /// Adds an AND-connected NOT BETWEEN predicate.
    #[must_use]
    pub fn where_not_between(mut self, column: impl Into<Column>, low: impl ToValue, high: impl ToValue) -> Self {
        self.wheres.push(
            Connector::And,
            Predicate::Between {
                column: column.into(),
                low: low.to_value(),
                high: high.to_value(),
                negated: true,
            },
        );
        self
    }

    /// Adds an OR-connected BETWEEN predicate.
    #[must_use]
    pub fn or_where_between(mut self, column: impl Into<Column>, low: impl ToValue, high: impl ToValue) -> Self {
        self.wheres.push(
            Connector::Or,
            Predicate::Between {
                column: column.into(),
                low: low.to_value(),
                high: high.to_value(),
                negated: false,
            },
        );
        self
    }

    /// Adds an AND-connected IS NULL predicate.
    #[must_use]
    pub fn where_null(mut self, column: impl Into<Column>) -> Self {
        self.wheres.push(
            Connector::And,
            Predicate::Null {
                column: column.into(),
                negated: false,
            },
        );
        self
    }

    /// Adds an AND-connected IS NOT NULL predicate.
    #[must_use]
    pub fn where_not_null(mut self, column: impl Into<Column>) -> Self {
        self.wheres.push(
            Connector::And,
            Predicate::Null {
                column: column.into(),
                negated: true,
            },
        );
        self
    }

    /// Adds an OR-connected IS NULL predicate.
    #[must_use]
    pub fn or_where_null(mut self, column: impl Into<Column>) -> Self {
        self.wheres.push(
            Connector::Or,
            Predicate::Null {
                column: column.into(),
                negated: false,
            },
        );
        self
    }

    /// Adds an OR-connected IS NOT NULL predicate.
    #[must_use]
    pub fn or_where_not_null(mut self, column: impl Into<Column>) -> Self {
        self.wheres.push(
            Connector::Or,
            Predicate::Null {
                column: column.into(),
                negated: true,
            },
        );
        self
    }

    /// Adds an AND-connected raw predicate.
    #[must_use]
    pub fn where_raw(mut self, sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.wheres.push(
            Connector::And,
            Predicate::Raw {
                expression: Expression::new(sql.into()),
                bindings,
            },
        );
        self
    }

    /// Adds an OR-connected raw predicate.
    #[must_use]
    pub fn or_where_raw(mut self, sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.wheres.push(
            Connector::Or,
            Predicate::Raw {
                expression: Expression::new(sql.into()),
                bindings,
            },
        );
        self
    }

    /// Opens a parenthesized group, AND-connected.
    ///
    /// The callback receives a fresh plan bound to the same table; whatever
    /// where tree it accumulates becomes the nested group. An empty group
    /// is dropped.
    #[must_use]
    pub fn where_nested(self, f: impl FnOnce(QueryPlan) -> QueryPlan) -> Self {
        self.nested(Connector::And, f)
    }

    /// Opens a parenthesized group, OR-connected.
    #[must_use]
    pub fn or_where_nested(self, f: impl FnOnce(QueryPlan) -> QueryPlan) -> Self {
        self.nested(Connector::Or, f)
    }

    fn nested(mut self, connector: Connector, f: impl FnOnce(QueryPlan) -> QueryPlan) -> Self {
        let sub = f(QueryPlan::new(self.table.clone()));
        if !sub.wheres.is_empty() {
            self.wheres
                .push(connector, Predicate::Nested { tree: sub.wheres });
        }
        self
    }

    /// Adds an AND-connected EXISTS predicate over a subquery.
    #[must_use]
    pub fn where_exists(mut self, subquery: QueryPlan) -> Self {
        self.wheres.push(
            Connector::And,
            Predicate::Exists {
                subquery: Box::new(subquery),
                negated: false,
            },
        );
        self
    }

    /// Adds an AND-connected NOT EXISTS predicate over a subquery.
    #[must_use]
    pub fn where_not_exists(mut self, subquery: QueryPlan) -> Self {
        self.wheres.push(
            Connector::And,
            Predicate::Exists {
                subquery: Box::new(subquery),
                negated: true,
            },
        );
        self
    }

    // -- grouping and having ------------------------------------------------

    /// Appends GROUP BY columns.
    #[must_use]
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.groups
            .extend(columns.iter().map(|c| Column::from(*c)));
        self
    }

    /// Adds an AND-connected HAVING comparison.
    #[must_use]
    pub fn having(mut self, column: impl Into<Column>, operator: Operator, value: impl ToValue) -> Self {
        self.havings.push(
            Connector::And,
            Predicate::Comparison {
                column: column.into(),
                operator,
                value: value.to_value(),
            },
        );
        self
    }

    /// Adds an OR-connected HAVING comparison.
    #[must_use]
    pub fn or_having(mut self, column: impl Into<Column>, operator: Operator, value: impl ToValue) -> Self {
        self.havings.push(
            Connector::Or,
            Predicate::Comparison {
                column: column.into(),
                operator,
                value: value.to_value(),
            },
        );
        self
    }

    /// Adds an AND-connected raw HAVING predicate.
    #[must_use]
    pub fn having_raw(mut self, sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.havings.push(
            Connector::And,
            Predicate::Raw {
                expression: Expression::new(sql.into()),
                bindings,
            },
        );
        self
    }

    // -- ordering and paging -------------------------------------------------

    /// Appends an ORDER BY entry.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<Column>, direction: Direction) -> Self {
        self.orders.push(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    /// Appends an ascending ORDER BY entry.
    #[must_use]
    pub fn order_by_asc(self, column: impl Into<Column>) -> Self {
        self.order_by(column, Direction::Asc)
    }

    /// Appends a descending ORDER BY entry.
    #[must_use]
    pub fn order_by_desc(self, column: impl Into<Column>) -> Self {
        self.order_by(column, Direction::Desc)
    }

    /// Appends a raw ORDER BY entry.
    #[must_use]
    pub fn order_by_raw(mut self, sql: impl Into<String>) -> Self {
        self.orders.push(OrderBy {
            column: Column::Raw(Expression::new(sql.into())),
            direction: Direction::Asc,
        });
        self
    }

    /// Sets the LIMIT.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Sets the OFFSET.
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Constrains the plan to one page of results.
    #[must_use]
    pub const fn for_page(self, page: u64, per_page: u64) -> Self {
        self.offset((page.saturating_sub(1)) * per_page).limit(per_page)
    }

    // -- aggregates ----------------------------------------------------------

    /// Replaces the projection with an aggregate.
    #[must_use]
    pub fn aggregate(mut self, function: AggregateFunction, column: impl Into<Column>) -> Self {
        self.aggregate = Some(Aggregate {
            function,
            column: column.into(),
        });
        self
    }
}
