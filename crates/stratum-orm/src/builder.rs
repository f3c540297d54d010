//! The fluent record query builder.
//!
//! A [`RecordQuery`] is bound to one record type and owns its query plan
//! exclusively. Fluent calls consume and return the builder; terminal
//! operations take `&self` and run against a scope-applied clone of the
//! plan, so a builder can serve `count` and then `get` without the two
//! contaminating each other.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use stratum_sql::{
    AggregateFunction, Column, Direction, Grammar, Operator, QueryPlan, SetValue, ToValue, Value,
};

use crate::driver::Driver;
use crate::eager::{eager_load_relations, EagerLoad};
use crate::error::{OrmError, Result};
use crate::record::{Record, RecordType, Registry, Row};

/// One page of results plus the paging envelope.
#[derive(Debug, Clone)]
pub struct Page {
    /// The page's records.
    pub records: Vec<Record>,
    /// Total matching records across all pages.
    pub total: i64,
    /// Page size.
    pub per_page: u64,
    /// The requested page, 1-based.
    pub current_page: u64,
    /// The last page number.
    pub last_page: u64,
}

/// A fluent query bound to one record type.
#[derive(Clone)]
pub struct RecordQuery<'a> {
    registry: &'a Registry,
    driver: &'a dyn Driver,
    grammar: &'a dyn Grammar,
    record_type: Arc<RecordType>,
    plan: QueryPlan,
    eager: EagerLoad,
    removed_scopes: BTreeSet<String>,
    scopeless: bool,
}

impl<'a> RecordQuery<'a> {
    pub(crate) fn new(
        registry: &'a Registry,
        driver: &'a dyn Driver,
        grammar: &'a dyn Grammar,
        record_type: Arc<RecordType>,
    ) -> Self {
        let plan = QueryPlan::new(record_type.table());
        Self {
            registry,
            driver,
            grammar,
            record_type,
            plan,
            eager: EagerLoad::new(),
            removed_scopes: BTreeSet::new(),
            scopeless: false,
        }
    }

    /// The record type this query is bound to.
    #[must_use]
    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    /// The builder's current plan, before scope application.
    #[must_use]
    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    // -- fluent plan delegation ---------------------------------------------

    /// Replaces the projected column list.
    #[must_use]
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.plan = self.plan.select(columns);
        self
    }

    /// Marks the query DISTINCT.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.plan = self.plan.distinct();
        self
    }

    /// Adds an AND-connected `=` comparison (two-argument convention).
    #[must_use]
    pub fn where_eq(mut self, column: impl Into<Column>, value: impl ToValue) -> Self {
        self.plan = self.plan.where_eq(column, value);
        self
    }

    /// Adds an OR-connected `=` comparison.
    #[must_use]
    pub fn or_where_eq(mut self, column: impl Into<Column>, value: impl ToValue) -> Self {
        self.plan = self.plan.or_where_eq(column, value);
        self
    }

    /// Adds an AND-connected comparison with an explicit operator.
    #[must_use]
    pub fn where_op(
        mut self,
        column: impl Into<Column>,
        operator: Operator,
        value: impl ToValue,
    ) -> Self {
        self.plan = self.plan.where_op(column, operator, value);
        self
    }

    /// Adds an OR-connected comparison with an explicit operator.
    #[must_use]
    pub fn or_where_op(
        mut self,
        column: impl Into<Column>,
        operator: Operator,
        value: impl ToValue,
    ) -> Self {
        self.plan = self.plan.or_where_op(column, operator, value);
        self
    }

    /// Adds an AND-connected comparison, parsing the operator string.
    /// Unsupported operators fail here, at build time.
    pub fn try_where(
        mut self,
        column: impl Into<Column>,
        operator: &str,
        value: impl ToValue,
    ) -> Result<Self> {
        self.plan = self.plan.try_where(column, operator, value)?;
        Ok(self)
    }

    /// Adds an AND-connected IN predicate.
    #[must_use]
    pub fn where_in<V: ToValue>(mut self, column: impl Into<Column>, values: Vec<V>) -> Self {
        self.plan = self.plan.where_in(column, values);
        self
    }

    /// Adds an AND-connected NOT IN predicate.
    #[must_use]
    pub fn where_not_in<V: ToValue>(mut self, column: impl Into<Column>, values: Vec<V>) -> Self {
        self.plan = self.plan.where_not_in(column, values);
        self
    }

    /// Adds an AND-connected BETWEEN predicate.
    #[must_use]
    pub fn where_between(
        mut self,
        column: impl Into<Column>,
        low: impl ToValue,
        high: impl ToValue,
    ) -> Self {
        self.plan = self.plan.where_between(column, low, high);
        self
    }

    /// Adds an AND-connected IS NULL predicate.
    #[must_use]
    pub fn where_null(mut self, column: impl Into<Column>) -> Self {
        self.plan = self.plan.where_null(column);
        self
    }

    /// Adds an AND-connected IS NOT NULL predicate.
    #[must_use]
    pub fn where_not_null(mut self, column: impl Into<Column>) -> Self {
        self.plan = self.plan.where_not_null(column);
        self
    }

    /// Adds an AND-connected raw predicate.
    #[must_use]
    pub fn where_raw(mut self, sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.plan = self.plan.where_raw(sql, bindings);
        self
    }

    /// Opens an AND-connected parenthesized group.
    #[must_use]
    pub fn where_nested(mut self, f: impl FnOnce(QueryPlan) -> QueryPlan) -> Self {
        self.plan = self.plan.where_nested(f);
        self
    }

    /// Opens an OR-connected parenthesized group.
    #[must_use]
    pub fn or_where_nested(mut self, f: impl FnOnce(QueryPlan) -> QueryPlan) -> Self {
        self.plan = self.plan.or_where_nested(f);
        self
    }

    /// Adds an inner join.
    #[must_use]
    pub fn join(mut self, table: &str, first: &str, operator: Operator, second: &str) -> Self {
        self.plan = self.plan.join(table, first, operator, second);
        self
    }

    /// Adds a left join.
    #[must_use]
    pub fn left_join(mut self, table: &str, first: &str, operator: Operator, second: &str) -> Self {
        self.plan = self.plan.left_join(table, first, operator, second);
        self
    }

    /// Appends GROUP BY columns.
    #[must_use]
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.plan = self.plan.group_by(columns);
        self
    }

    /// Adds an AND-connected HAVING comparison.
    #[must_use]
    pub fn having(
        mut self,
        column: impl Into<Column>,
        operator: Operator,
        value: impl ToValue,
    ) -> Self {
        self.plan = self.plan.having(column, operator, value);
        self
    }

    /// Appends an ORDER BY entry.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<Column>, direction: Direction) -> Self {
        self.plan = self.plan.order_by(column, direction);
        self
    }

    /// Orders newest-first on the given column.
    #[must_use]
    pub fn latest(self, column: &str) -> Self {
        self.order_by(column, Direction::Desc)
    }

    /// Orders oldest-first on the given column.
    #[must_use]
    pub fn oldest(self, column: &str) -> Self {
        self.order_by(column, Direction::Asc)
    }

    /// Sets the LIMIT.
    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.plan = self.plan.limit(n);
        self
    }

    /// Sets the OFFSET.
    #[must_use]
    pub fn offset(mut self, n: u64) -> Self {
        self.plan = self.plan.offset(n);
        self
    }

    /// Constrains the query to one page.
    #[must_use]
    pub fn for_page(mut self, page: u64, per_page: u64) -> Self {
        self.plan = self.plan.for_page(page, per_page);
        self
    }

    // -- eager loading -------------------------------------------------------

    /// Requests eager loading for the given relation paths.
    #[must_use]
    pub fn with(mut self, paths: &[&str]) -> Self {
        for path in paths {
            self.eager = self.eager.with(*path);
        }
        self
    }

    /// Requests eager loading for one path with a constraint closure.
    #[must_use]
    pub fn with_constraint<F>(mut self, path: &str, constraint: F) -> Self
    where
        F: Fn(QueryPlan) -> QueryPlan + Send + Sync + 'static,
    {
        self.eager = self.eager.with_constraint(path, constraint);
        self
    }

    // -- global scopes -------------------------------------------------------

    /// Removes one registered global scope from this query.
    #[must_use]
    pub fn without_global_scope(mut self, id: impl Into<String>) -> Self {
        self.removed_scopes.insert(id.into());
        self
    }

    /// Removes every registered global scope from this query.
    #[must_use]
    pub fn without_global_scopes(mut self) -> Self {
        self.scopeless = true;
        self
    }

    /// Applies the type's global scopes to a clone of the plan.
    ///
    /// The builder's own plan is never touched, so repeated terminals see
    /// the same scoped view.
    #[must_use]
    pub fn apply_scopes(&self) -> QueryPlan {
        let mut plan = self.plan.clone();
        if self.scopeless {
            return plan;
        }
        for global in self.record_type.global_scopes() {
            if self.removed_scopes.contains(&global.id) {
                continue;
            }
            plan = global.scope.apply(plan, &self.record_type);
        }
        plan
    }

    // -- terminals -----------------------------------------------------------

    /// Runs the query and returns hydrated records, eager loading any
    /// requested relations.
    pub async fn get(&self) -> Result<Vec<Record>> {
        let plan = self.apply_scopes();
        let rows = self.run_select(&plan).await?;
        let mut records = self.record_type.hydrate(rows);

        if !records.is_empty() && !self.eager.is_empty() {
            records = eager_load_relations(
                self.registry,
                self.driver,
                self.grammar,
                &self.record_type,
                records,
                &self.eager,
            )
            .await?;
        }

        Ok(records)
    }

    /// Returns the first matching record.
    pub async fn first(&self) -> Result<Option<Record>> {
        let records = self.clone().limit(1).get().await?;
        Ok(records.into_iter().next())
    }

    /// Returns the first matching record or [`OrmError::RecordNotFound`].
    pub async fn first_or_fail(&self) -> Result<Record> {
        self.first().await?.ok_or_else(|| OrmError::RecordNotFound {
            record_type: String::from(self.record_type.name()),
        })
    }

    /// Finds one record by primary key.
    pub async fn find(&self, id: impl ToValue) -> Result<Option<Record>> {
        let pk = String::from(self.record_type.primary_key_column());
        self.clone().where_eq(pk, id).first().await
    }

    /// Finds records for a set of primary keys. An empty set returns empty
    /// without querying.
    pub async fn find_many(&self, ids: Vec<Value>) -> Result<Vec<Record>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let pk = String::from(self.record_type.primary_key_column());
        self.clone().where_in(pk, ids).get().await
    }

    /// Finds one record by primary key or fails with
    /// [`OrmError::RecordNotFound`].
    pub async fn find_or_fail(&self, id: impl ToValue) -> Result<Record> {
        self.find(id).await?.ok_or_else(|| OrmError::RecordNotFound {
            record_type: String::from(self.record_type.name()),
        })
    }

    /// Returns a single column from the first matching record.
    pub async fn value(&self, column: &str) -> Result<Option<Value>> {
        let record = self.clone().select(&[column]).first().await?;
        Ok(record.and_then(|r| r.get(column).cloned()))
    }

    /// Returns one column across all matching records.
    pub async fn pluck(&self, column: &str) -> Result<Vec<Value>> {
        let records = self.clone().select(&[column]).get().await?;
        Ok(records
            .into_iter()
            .map(|r| r.get(column).cloned().unwrap_or(Value::Null))
            .collect())
    }

    /// Counts matching records.
    pub async fn count(&self) -> Result<i64> {
        let value = self
            .run_aggregate(AggregateFunction::Count, Column::raw("*"))
            .await?;
        Ok(match value {
            Some(Value::Int(n)) => n,
            _ => 0,
        })
    }

    /// Minimum of a column.
    pub async fn min(&self, column: &str) -> Result<Option<Value>> {
        self.run_aggregate(AggregateFunction::Min, Column::name(column))
            .await
    }

    /// Maximum of a column.
    pub async fn max(&self, column: &str) -> Result<Option<Value>> {
        self.run_aggregate(AggregateFunction::Max, Column::name(column))
            .await
    }

    /// Sum of a column.
    pub async fn sum(&self, column: &str) -> Result<Option<Value>> {
        self.run_aggregate(AggregateFunction::Sum, Column::name(column))
            .await
    }

    /// Average of a column.
    pub async fn avg(&self, column: &str) -> Result<Option<Value>> {
        self.run_aggregate(AggregateFunction::Avg, Column::name(column))
            .await
    }

    /// Whether any record matches.
    pub async fn exists(&self) -> Result<bool> {
        let plan = self.apply_scopes();
        let compiled = self.grammar.compile_exists(&plan);
        let rows = self.run_compiled(compiled).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("exists"))
            .is_some_and(|v| matches!(v, Value::Int(n) if *n != 0) || matches!(v, Value::Bool(true))))
    }

    /// Whether no record matches.
    pub async fn doesnt_exist(&self) -> Result<bool> {
        Ok(!self.exists().await?)
    }

    /// Runs a count plus a page query and returns the page envelope.
    pub async fn paginate(&self, page: u64, per_page: u64) -> Result<Page> {
        let page = page.max(1);
        let total = self.count().await?;

        let records = if total > 0 {
            self.clone().for_page(page, per_page).get().await?
        } else {
            Vec::new()
        };

        let last_page = if per_page == 0 {
            0
        } else {
            (total as u64).div_ceil(per_page)
        };

        Ok(Page {
            records,
            total,
            per_page,
            current_page: page,
            last_page,
        })
    }

    /// Inserts a batch of rows.
    ///
    /// An empty batch succeeds without issuing a statement. Rows must share
    /// one column set; a mismatch is a build-time error. Types that use
    /// timestamps get `created_at`/`updated_at` stamped unless the row
    /// already carries them.
    pub async fn insert(&self, rows: Vec<Row>) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let rows = self.stamp_insert_rows(rows);
        let compiled = self
            .grammar
            .compile_insert(self.record_type.table(), &rows)?;
        self.run_execute(compiled).await
    }

    /// Inserts one row and returns the generated id.
    pub async fn insert_get_id(&self, row: Row) -> Result<Value> {
        let rows = self.stamp_insert_rows(vec![row]);
        let compiled = self
            .grammar
            .compile_insert(self.record_type.table(), &rows)?;
        let sql = compiled.sql.clone();
        let bindings = compiled.bindings.clone();
        self.run_execute(compiled).await?;

        match self.driver.last_insert_id().await {
            Ok(id) => Ok(id),
            Err(source) => Err(OrmError::QueryExecution {
                sql,
                bindings,
                source,
            }),
        }
    }

    /// Updates matching records. Assignment bindings precede where
    /// bindings. Types that use timestamps get `updated_at` stamped unless
    /// the caller assigned it explicitly.
    pub async fn update(&self, assignments: Vec<(String, SetValue)>) -> Result<u64> {
        let mut assignments = assignments;
        if self.record_type.uses_timestamps()
            && !assignments.iter().any(|(column, _)| column == "updated_at")
        {
            assignments.insert(
                0,
                (
                    String::from("updated_at"),
                    SetValue::Value(fresh_timestamp()),
                ),
            );
        }

        let plan = self.apply_scopes();
        let compiled = self.grammar.compile_update(&plan, &assignments);
        self.run_execute(compiled).await
    }

    /// Increments a column by the given amount.
    pub async fn increment(&self, column: &str, amount: i64) -> Result<u64> {
        let wrapped = self.grammar.wrap(column);
        self.update(vec![(
            String::from(column),
            SetValue::raw(format!("{wrapped} + {amount}")),
        )])
        .await
    }

    /// Decrements a column by the given amount.
    pub async fn decrement(&self, column: &str, amount: i64) -> Result<u64> {
        let wrapped = self.grammar.wrap(column);
        self.update(vec![(
            String::from(column),
            SetValue::raw(format!("{wrapped} - {amount}")),
        )])
        .await
    }

    /// Deletes matching records.
    pub async fn delete(&self) -> Result<u64> {
        let plan = self.apply_scopes();
        let compiled = self.grammar.compile_delete(&plan);
        self.run_execute(compiled).await
    }

    // -- internals -----------------------------------------------------------

    async fn run_aggregate(
        &self,
        function: AggregateFunction,
        column: Column,
    ) -> Result<Option<Value>> {
        let plan = self.apply_scopes().aggregate(function, column);
        let rows = self.run_select(&plan).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.get("aggregate").cloned())
            .filter(|v| !v.is_null()))
    }

    async fn run_select(&self, plan: &QueryPlan) -> Result<Vec<Row>> {
        let compiled = self.grammar.compile_select(plan);
        self.run_compiled(compiled).await
    }

    async fn run_compiled(&self, compiled: stratum_sql::CompiledQuery) -> Result<Vec<Row>> {
        tracing::debug!(
            record_type = self.record_type.name(),
            sql = %compiled.sql,
            bindings = compiled.bindings.len(),
            "executing select"
        );
        match self.driver.select(&compiled.sql, &compiled.bindings).await {
            Ok(rows) => Ok(rows),
            Err(source) => Err(OrmError::QueryExecution {
                sql: compiled.sql,
                bindings: compiled.bindings,
                source,
            }),
        }
    }

    async fn run_execute(&self, compiled: stratum_sql::CompiledQuery) -> Result<u64> {
        tracing::debug!(
            record_type = self.record_type.name(),
            sql = %compiled.sql,
            bindings = compiled.bindings.len(),
            "executing statement"
        );
        match self.driver.execute(&compiled.sql, &compiled.bindings).await {
            Ok(affected) => Ok(affected),
            Err(source) => Err(OrmError::QueryExecution {
                sql: compiled.sql,
                bindings: compiled.bindings,
                source,
            }),
        }
    }

    fn stamp_insert_rows(&self, mut rows: Vec<Row>) -> Vec<Row> {
        if !self.record_type.uses_timestamps() {
            return rows;
        }
        let now = fresh_timestamp();
        for row in &mut rows {
            row.entry(String::from("created_at")).or_insert_with(|| now.clone());
            row.entry(String::from("updated_at")).or_insert_with(|| now.clone());
        }
        rows
    }
}

fn fresh_timestamp() -> Value {
    Value::DateTime(Utc::now())
}
