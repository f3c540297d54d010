//! The driver boundary.
//!
//! Everything below statement execution — connections, pooling, transport,
//! timeouts — lives behind this trait. The ORM hands a driver compiled SQL
//! plus ordered bindings and gets rows or an affected-row count back.
//!
//! Methods return boxed futures so the trait stays object-safe and the
//! eager-load resolver can recurse over `&dyn Driver`.

use futures::future::BoxFuture;

use crate::error::DriverError;
use crate::record::Row;
use stratum_sql::Value;

/// An executor of compiled statements.
pub trait Driver: Send + Sync {
    /// Runs a SELECT and returns its rows in result order.
    fn select<'a>(
        &'a self,
        sql: &'a str,
        bindings: &'a [Value],
    ) -> BoxFuture<'a, Result<Vec<Row>, DriverError>>;

    /// Runs an INSERT/UPDATE/DELETE and returns the affected row count.
    fn execute<'a>(
        &'a self,
        sql: &'a str,
        bindings: &'a [Value],
    ) -> BoxFuture<'a, Result<u64, DriverError>>;

    /// Returns the row id generated by the last insert on this connection.
    fn last_insert_id(&self) -> BoxFuture<'_, Result<Value, DriverError>>;
}
