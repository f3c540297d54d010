//! # stratum-sqlite
//!
//! The reference [`Driver`] implementation over a sqlx SQLite pool.
//!
//! Bindings are forwarded positionally; result rows come back as dynamic
//! column-keyed maps decoded from the row's declared value types.

use futures::future::BoxFuture;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as _, Row as _, TypeInfo, ValueRef};
use stratum_orm::{Driver, DriverError, Row};
use stratum_sql::Value;

/// A [`Driver`] backed by a sqlx SQLite connection pool.
pub struct SqliteDriver {
    pool: SqlitePool,
}

impl SqliteDriver {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to a SQLite database URL (`sqlite::memory:`,
    /// `sqlite://path/to.db`).
    ///
    /// In-memory databases get a single-connection pool so every statement
    /// sees the same memory.
    pub async fn connect(url: &str) -> Result<Self, DriverError> {
        let options = if url.contains(":memory:") {
            SqlitePoolOptions::new().max_connections(1)
        } else {
            SqlitePoolOptions::new()
        };
        let pool = options
            .connect(url)
            .await
            .map_err(|e| DriverError::new(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_value<'q>(query: SqliteQuery<'q>, value: &'q Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(Option::<i64>::None),
        Value::Bool(b) => query.bind(*b),
        Value::Int(n) => query.bind(*n),
        Value::Float(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.as_str()),
        Value::Blob(b) => query.bind(b.as_slice()),
        Value::DateTime(dt) => query.bind(*dt),
    }
}

fn decode_row(row: &SqliteRow) -> Result<Row, DriverError> {
    let mut out = Row::new();

    for (i, column) in row.columns().iter().enumerate() {
        let raw = row
            .try_get_raw(i)
            .map_err(|e| DriverError::new(e.to_string()))?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" => Value::Int(
                    row.try_get::<i64, _>(i)
                        .map_err(|e| DriverError::new(e.to_string()))?,
                ),
                "REAL" => Value::Float(
                    row.try_get::<f64, _>(i)
                        .map_err(|e| DriverError::new(e.to_string()))?,
                ),
                "BLOB" => Value::Blob(
                    row.try_get::<Vec<u8>, _>(i)
                        .map_err(|e| DriverError::new(e.to_string()))?,
                ),
                _ => Value::Text(
                    row.try_get::<String, _>(i)
                        .map_err(|e| DriverError::new(e.to_string()))?,
                ),
            }
        };
        out.insert(String::from(column.name()), value);
    }

    Ok(out)
}

impl Driver for SqliteDriver {
    fn select<'a>(
        &'a self,
        sql: &'a str,
        bindings: &'a [Value],
    ) -> BoxFuture<'a, Result<Vec<Row>, DriverError>> {
        Box::pin(async move {
            tracing::debug!(%sql, bindings = bindings.len(), "sqlite select");
            let mut query = sqlx::query(sql);
            for value in bindings {
                query = bind_value(query, value);
            }
            let rows = query
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DriverError::new(e.to_string()))?;
            rows.iter().map(decode_row).collect()
        })
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        bindings: &'a [Value],
    ) -> BoxFuture<'a, Result<u64, DriverError>> {
        Box::pin(async move {
            tracing::debug!(%sql, bindings = bindings.len(), "sqlite execute");
            let mut query = sqlx::query(sql);
            for value in bindings {
                query = bind_value(query, value);
            }
            let result = query
                .execute(&self.pool)
                .await
                .map_err(|e| DriverError::new(e.to_string()))?;
            Ok(result.rows_affected())
        })
    }

    fn last_insert_id(&self) -> BoxFuture<'_, Result<Value, DriverError>> {
        Box::pin(async move {
            let row = sqlx::query("select last_insert_rowid()")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DriverError::new(e.to_string()))?;
            let id: i64 = row
                .try_get(0)
                .map_err(|e| DriverError::new(e.to_string()))?;
            Ok(Value::Int(id))
        })
    }
}
