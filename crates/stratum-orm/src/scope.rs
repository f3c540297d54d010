//! Global scopes.
//!
//! A global scope injects predicates into every query for a record type
//! unless the builder explicitly removes it. Scopes are registered with a
//! string identifier at type-registration time and applied in registration
//! order to a clone of the query plan, so applying them is repeatable:
//! `count` then `get` on one builder see the same scoped plan.

use std::sync::Arc;

use stratum_sql::QueryPlan;

use crate::record::RecordType;

/// A capability object that rewrites a query plan.
pub trait Scope: Send + Sync {
    /// Applies the scope to the plan.
    fn apply(&self, plan: QueryPlan, record_type: &RecordType) -> QueryPlan;
}

/// A scope backed by a plain closure over the plan.
pub struct ClosureScope<F>(F);

impl<F> ClosureScope<F>
where
    F: Fn(QueryPlan) -> QueryPlan + Send + Sync,
{
    /// Wraps the closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Scope for ClosureScope<F>
where
    F: Fn(QueryPlan) -> QueryPlan + Send + Sync,
{
    fn apply(&self, plan: QueryPlan, _record_type: &RecordType) -> QueryPlan {
        (self.0)(plan)
    }
}

/// A registered scope: identifier plus implementation.
#[derive(Clone)]
pub struct GlobalScope {
    /// Removal identifier.
    pub id: String,
    /// The scope itself.
    pub scope: Arc<dyn Scope>,
}

impl GlobalScope {
    /// Creates a registered scope.
    pub fn new(id: impl Into<String>, scope: Arc<dyn Scope>) -> Self {
        Self {
            id: id.into(),
            scope,
        }
    }
}

impl std::fmt::Debug for GlobalScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalScope").field("id", &self.id).finish()
    }
}
