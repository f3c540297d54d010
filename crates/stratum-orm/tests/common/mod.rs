//! Scripted driver for exercising the query pipeline without a database.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::future::{self, BoxFuture, FutureExt};
use stratum_orm::{Driver, DriverError, Row};
use stratum_sql::Value;

struct State {
    log: Vec<(String, Vec<Value>)>,
    results: VecDeque<Vec<Row>>,
    affected: u64,
    last_insert_id: Value,
    fail_next: Option<String>,
}

/// A driver that replays queued result sets and records every statement it
/// was handed.
#[derive(Clone)]
pub struct FakeDriver {
    state: Arc<Mutex<State>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                log: Vec::new(),
                results: VecDeque::new(),
                affected: 0,
                last_insert_id: Value::Null,
                fail_next: None,
            })),
        }
    }

    /// Queues the rows the next select will return.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.state.lock().unwrap().results.push_back(rows);
    }

    /// Sets the affected-row count returned by executes.
    pub fn set_affected(&self, affected: u64) {
        self.state.lock().unwrap().affected = affected;
    }

    /// Sets the id returned by `last_insert_id`.
    pub fn set_last_insert_id(&self, id: Value) {
        self.state.lock().unwrap().last_insert_id = id;
    }

    /// Makes the next statement fail with the given message.
    pub fn fail_next(&self, message: &str) {
        self.state.lock().unwrap().fail_next = Some(String::from(message));
    }

    /// Every statement issued so far, in order.
    pub fn log(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().unwrap().log.clone()
    }
}

impl Driver for FakeDriver {
    fn select<'a>(
        &'a self,
        sql: &'a str,
        bindings: &'a [Value],
    ) -> BoxFuture<'a, Result<Vec<Row>, DriverError>> {
        let mut state = self.state.lock().unwrap();
        state.log.push((String::from(sql), bindings.to_vec()));
        if let Some(message) = state.fail_next.take() {
            return future::ready(Err(DriverError::new(message))).boxed();
        }
        let rows = state.results.pop_front().unwrap_or_default();
        future::ready(Ok(rows)).boxed()
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        bindings: &'a [Value],
    ) -> BoxFuture<'a, Result<u64, DriverError>> {
        let mut state = self.state.lock().unwrap();
        state.log.push((String::from(sql), bindings.to_vec()));
        if let Some(message) = state.fail_next.take() {
            return future::ready(Err(DriverError::new(message))).boxed();
        }
        future::ready(Ok(state.affected)).boxed()
    }

    fn last_insert_id(&self) -> BoxFuture<'_, Result<Value, DriverError>> {
        let state = self.state.lock().unwrap();
        future::ready(Ok(state.last_insert_id.clone())).boxed()
    }
}

/// Builds a row from column/value pairs.
pub fn row(pairs: &[(&str, Value)]) -> Row {
    let mut row = Row::new();
    for (column, value) in pairs {
        row.insert(String::from(*column), value.clone());
    }
    row
}
