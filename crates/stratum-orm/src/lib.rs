//! # stratum-orm
//!
//! Record mapping and relation resolution over `stratum-sql`.
//!
//! This crate provides:
//! - [`RecordType`] / [`Registry`] — per-type metadata registered once:
//!   table, primary key, relations, global scopes, morph class
//! - [`RecordQuery`] — the fluent builder bound to one record type, with
//!   hydration, aggregates, pagination, and mutations
//! - [`EagerLoad`] — batch relation loading: one query per relation per
//!   nesting level, dot paths for nested graphs, per-relation constraints
//! - [`Scope`] — global scopes applied to a cloned plan, removable per
//!   query
//! - [`Driver`] — the boundary behind which connections, pooling, and
//!   transport live
//!
//! ## Quick start
//!
//! ```ignore
//! use stratum_orm::{Database, RecordType};
//! use stratum_sql::SqliteGrammar;
//!
//! let mut db = Database::new(driver, SqliteGrammar::new());
//! db.register(RecordType::new("User", "users").has_many("posts", "Post", "user_id"));
//! db.register(RecordType::new("Post", "posts").belongs_to("user", "User", "user_id"));
//!
//! let users = db
//!     .query("User")?
//!     .where_eq("active", true)
//!     .with(&["posts.comments"])
//!     .get()
//!     .await?;
//! ```

mod builder;
mod database;
mod driver;
mod eager;
mod error;
mod record;
mod relation;
mod scope;

pub use builder::{Page, RecordQuery};
pub use database::Database;
pub use driver::Driver;
pub use eager::{eager_load_relations, Constraint, EagerLoad};
pub use error::{DriverError, OrmError, Result};
pub use record::{Hydrator, Record, RecordType, Registry, Related, Row};
pub use relation::{RelationDescriptor, RelationKind};
pub use scope::{ClosureScope, GlobalScope, Scope};

// Re-export the query-plan surface callers touch through constraints and
// scopes.
pub use stratum_sql::{
    Column, Direction, Expression, Operator, QueryPlan, SetValue, ToValue, Value,
};
