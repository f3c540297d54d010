//! Dialect grammars.
//!
//! A [`Grammar`] turns a [`QueryPlan`] into SQL text plus an ordered binding
//! list for one SQL dialect. Compilation is a pure function of the plan:
//! the same plan always compiles to byte-identical output, and no grammar
//! method mutates its input.
//!
//! The shared clause-by-clause compilation lives in the trait's provided
//! methods; dialects override identifier quoting and the sentinel limit used
//! when an offset appears without a limit.

mod mysql;
mod sqlite;

pub use mysql::MySqlGrammar;
pub use sqlite::SqliteGrammar;

use std::collections::BTreeMap;

use crate::condition::{ConditionTree, Predicate};
use crate::error::{BuildError, Result};
use crate::expression::Column;
use crate::plan::{QueryPlan, SetValue};
use crate::value::Value;

/// A compiled statement: SQL text and its positional bindings.
///
/// The bindings appear in exactly the order the `?` placeholders appear in
/// the text.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// The SQL text.
    pub sql: String,
    /// The ordered bindings.
    pub bindings: Vec<Value>,
}

/// Dialect-specific compilation rules.
pub trait Grammar: Send + Sync {
    /// Quotes one identifier segment. Dialect hook.
    fn quote_segment(&self, segment: &str) -> String;

    /// The sentinel limit emitted when an offset is present without a
    /// limit. Dialect hook.
    fn offset_sentinel_limit(&self) -> &'static str;

    /// Quotes a possibly dotted, possibly aliased identifier.
    ///
    /// Each dot-separated segment is quoted individually; a bare or
    /// trailing `*` is never quoted; `expr as alias` quotes both sides.
    fn wrap(&self, identifier: &str) -> String {
        if let Some(pos) = identifier.to_ascii_lowercase().find(" as ") {
            let (target, alias) = identifier.split_at(pos);
            let alias = &alias[4..];
            return format!("{} as {}", self.wrap(target.trim_end()), self.wrap(alias.trim_start()));
        }

        identifier
            .split('.')
            .map(|segment| {
                if segment == "*" {
                    String::from("*")
                } else {
                    self.quote_segment(segment)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quotes a table name.
    fn wrap_table(&self, table: &str) -> String {
        self.wrap(table)
    }

    /// Renders a column: identifiers are wrapped, raw expressions pass
    /// through verbatim.
    fn wrap_column(&self, column: &Column) -> String {
        match column {
            Column::Name(name) => self.wrap(name),
            Column::Raw(expr) => String::from(expr.as_str()),
        }
    }

    /// Compiles a SELECT statement.
    fn compile_select(&self, plan: &QueryPlan) -> CompiledQuery {
        let mut sql = String::from("select ");
        let mut bindings = Vec::new();

        if let Some(aggregate) = &plan.aggregate {
            let column = self.wrap_column(&aggregate.column);
            let column = if plan.distinct && column != "*" {
                format!("distinct {column}")
            } else {
                column
            };
            sql.push_str(&format!(
                "{}({}) as {}",
                aggregate.function.as_str(),
                column,
                self.quote_segment("aggregate")
            ));
        } else {
            if plan.distinct {
                sql.push_str("distinct ");
            }
            if plan.columns.is_empty() {
                sql.push('*');
            } else {
                let projected: Vec<String> =
                    plan.columns.iter().map(|c| self.wrap_column(c)).collect();
                sql.push_str(&projected.join(", "));
            }
        }

        sql.push_str(" from ");
        sql.push_str(&self.wrap_table(&plan.table));

        for join in &plan.joins {
            sql.push(' ');
            sql.push_str(&join.join_type.to_string());
            sql.push(' ');
            sql.push_str(&self.wrap_table(&join.table));
            if !join.on.is_empty() {
                sql.push_str(" on ");
                sql.push_str(&self.compile_condition_tree(&join.on, &mut bindings));
            }
        }

        if !plan.wheres.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&self.compile_condition_tree(&plan.wheres, &mut bindings));
        }

        if !plan.groups.is_empty() {
            let grouped: Vec<String> = plan.groups.iter().map(|c| self.wrap_column(c)).collect();
            sql.push_str(" group by ");
            sql.push_str(&grouped.join(", "));
        }

        if !plan.havings.is_empty() {
            sql.push_str(" having ");
            sql.push_str(&self.compile_condition_tree(&plan.havings, &mut bindings));
        }

        if plan.aggregate.is_none() {
            if !plan.orders.is_empty() {
                let ordered: Vec<String> = plan
                    .orders
                    .iter()
                    .map(|order| match &order.column {
                        Column::Raw(expr) => String::from(expr.as_str()),
                        Column::Name(name) => {
                            format!("{} {}", self.wrap(name), order.direction.as_str())
                        }
                    })
                    .collect();
                sql.push_str(" order by ");
                sql.push_str(&ordered.join(", "));
            }

            if let Some(limit) = plan.limit {
                sql.push_str(&format!(" limit {limit}"));
            } else if plan.offset.is_some() {
                sql.push_str(&format!(" limit {}", self.offset_sentinel_limit()));
            }

            if let Some(offset) = plan.offset {
                sql.push_str(&format!(" offset {offset}"));
            }
        }

        CompiledQuery { sql, bindings }
    }

    /// Compiles an EXISTS probe around the plan's SELECT.
    fn compile_exists(&self, plan: &QueryPlan) -> CompiledQuery {
        let inner = self.compile_select(plan);
        CompiledQuery {
            sql: format!(
                "select exists({}) as {}",
                inner.sql,
                self.quote_segment("exists")
            ),
            bindings: inner.bindings,
        }
    }

    /// Compiles a batch INSERT.
    ///
    /// Every row must carry the same column set; columns are emitted in
    /// sorted order so the batch is stable. An empty batch compiles to an
    /// empty statement — callers treat it as a no-op and issue nothing.
    fn compile_insert(
        &self,
        table: &str,
        rows: &[BTreeMap<String, Value>],
    ) -> Result<CompiledQuery> {
        let Some(first) = rows.first() else {
            return Ok(CompiledQuery {
                sql: String::new(),
                bindings: Vec::new(),
            });
        };

        let columns: Vec<&String> = first.keys().collect();
        for row in &rows[1..] {
            let found: Vec<&String> = row.keys().collect();
            if found != columns {
                return Err(BuildError::InconsistentBatchColumns {
                    expected: columns
                        .iter()
                        .map(|c| c.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                    found: found
                        .iter()
                        .map(|c| c.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
        }

        let wrapped: Vec<String> = columns.iter().map(|c| self.wrap(c)).collect();
        let placeholders = format!(
            "({})",
            columns.iter().map(|_| "?").collect::<Vec<_>>().join(", ")
        );
        let tuples: Vec<&str> = rows.iter().map(|_| placeholders.as_str()).collect();

        let mut bindings = Vec::new();
        for row in rows {
            bindings.extend(row.values().cloned());
        }

        Ok(CompiledQuery {
            sql: format!(
                "insert into {} ({}) values {}",
                self.wrap_table(table),
                wrapped.join(", "),
                tuples.join(", ")
            ),
            bindings,
        })
    }

    /// Compiles an UPDATE.
    ///
    /// Assignment bindings precede where bindings — the one place clause
    /// order and binding order part ways from SELECT.
    fn compile_update(&self, plan: &QueryPlan, assignments: &[(String, SetValue)]) -> CompiledQuery {
        let mut bindings = Vec::new();

        let set_parts: Vec<String> = assignments
            .iter()
            .map(|(column, value)| match value {
                SetValue::Value(v) => {
                    bindings.push(v.clone());
                    format!("{} = ?", self.wrap(column))
                }
                SetValue::Raw(expr) => format!("{} = {}", self.wrap(column), expr.as_str()),
            })
            .collect();

        let mut sql = format!(
            "update {} set {}",
            self.wrap_table(&plan.table),
            set_parts.join(", ")
        );

        if !plan.wheres.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&self.compile_condition_tree(&plan.wheres, &mut bindings));
        }

        CompiledQuery { sql, bindings }
    }

    /// Compiles a DELETE.
    fn compile_delete(&self, plan: &QueryPlan) -> CompiledQuery {
        let mut bindings = Vec::new();
        let mut sql = format!("delete from {}", self.wrap_table(&plan.table));

        if !plan.wheres.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&self.compile_condition_tree(&plan.wheres, &mut bindings));
        }

        CompiledQuery { sql, bindings }
    }

    /// Compiles a condition tree, appending its bindings in emission order.
    ///
    /// The first surviving node never emits its connector keyword; empty
    /// nested groups vanish entirely.
    fn compile_condition_tree(&self, tree: &ConditionTree, bindings: &mut Vec<Value>) -> String {
        let mut parts: Vec<String> = Vec::new();

        for node in tree {
            let Some(fragment) = self.compile_predicate(&node.predicate, bindings) else {
                continue;
            };
            if parts.is_empty() {
                parts.push(fragment);
            } else {
                parts.push(format!("{} {}", node.connector, fragment));
            }
        }

        parts.join(" ")
    }

    /// Compiles one predicate, or `None` for nodes that compile to nothing.
    fn compile_predicate(&self, predicate: &Predicate, bindings: &mut Vec<Value>) -> Option<String> {
        match predicate {
            Predicate::Comparison {
                column,
                operator,
                value,
            } => {
                bindings.push(value.clone());
                Some(format!("{} {} ?", self.wrap_column(column), operator))
            }
            Predicate::ColumnCompare {
                first,
                operator,
                second,
            } => Some(format!(
                "{} {} {}",
                self.wrap_column(first),
                operator,
                self.wrap_column(second)
            )),
            Predicate::In {
                column,
                values,
                negated,
            } => {
                // An empty list degenerates to a constant predicate instead
                // of the invalid `in ()`.
                if values.is_empty() {
                    return Some(String::from(if *negated { "1 = 1" } else { "0 = 1" }));
                }
                let placeholders = values.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
                bindings.extend(values.iter().cloned());
                let keyword = if *negated { "not in" } else { "in" };
                Some(format!(
                    "{} {} ({})",
                    self.wrap_column(column),
                    keyword,
                    placeholders
                ))
            }
            Predicate::Between {
                column,
                low,
                high,
                negated,
            } => {
                bindings.push(low.clone());
                bindings.push(high.clone());
                let keyword = if *negated { "not between" } else { "between" };
                Some(format!(
                    "{} {} ? and ?",
                    self.wrap_column(column),
                    keyword
                ))
            }
            Predicate::Null { column, negated } => {
                let keyword = if *negated { "is not null" } else { "is null" };
                Some(format!("{} {}", self.wrap_column(column), keyword))
            }
            Predicate::Nested { tree } => {
                if tree.is_empty() {
                    return None;
                }
                Some(format!("({})", self.compile_condition_tree(tree, bindings)))
            }
            Predicate::Exists { subquery, negated } => {
                let inner = self.compile_select(subquery);
                bindings.extend(inner.bindings);
                let keyword = if *negated { "not exists" } else { "exists" };
                Some(format!("{} ({})", keyword, inner.sql))
            }
            Predicate::Raw {
                expression,
                bindings: raw,
            } => {
                bindings.extend(raw.iter().cloned());
                Some(String::from(expression.as_str()))
            }
        }
    }
}
