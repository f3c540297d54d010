//! # stratum-sql
//!
//! Dialect-agnostic query AST and dialect grammars.
//!
//! This crate provides:
//! - [`QueryPlan`] — the portable in-memory representation of one statement,
//!   built through a fluent API
//! - [`ConditionTree`] — ordered, nestable predicate sequences with AND/OR
//!   connectors
//! - [`Grammar`] implementations for the MySQL and SQLite dialect families,
//!   compiling a plan into SQL text plus positional bindings
//! - [`Expression`] — raw fragments inserted verbatim
//! - [`Value`] — the binding payload type shared with the driver boundary
//!
//! ## Quick start
//!
//! ```
//! use stratum_sql::{Grammar, Operator, QueryPlan, SqliteGrammar};
//!
//! let plan = QueryPlan::new("users")
//!     .where_eq("name", "John Doe")
//!     .or_where_op("age", Operator::Gt, 28_i64);
//!
//! let compiled = SqliteGrammar::new().compile_select(&plan);
//! assert_eq!(
//!     compiled.sql,
//!     "select * from \"users\" where \"name\" = ? or \"age\" > ?"
//! );
//! assert_eq!(compiled.bindings.len(), 2);
//! ```
//!
//! Compilation is pure: plans are plain data, cloning them is deep and
//! structural, and compiling the same plan twice yields identical output.

mod condition;
mod error;
mod expression;
pub mod grammar;
mod join;
mod plan;
pub mod value;

pub use condition::{ConditionNode, ConditionTree, Connector, Operator, Predicate};
pub use error::{BuildError, Result};
pub use expression::{Column, Expression};
pub use grammar::{CompiledQuery, Grammar, MySqlGrammar, SqliteGrammar};
pub use join::{JoinClause, JoinType};
pub use plan::{
    Aggregate, AggregateFunction, Direction, OrderBy, QueryPlan, SetValue,
};
pub use value::{ToValue, Value};
