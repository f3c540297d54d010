//! The database facade.
//!
//! Owns the three collaborators a query needs — a driver, a grammar, and
//! the record-type registry — and hands out [`RecordQuery`] builders bound
//! to registered types.

use std::sync::Arc;

use stratum_sql::Grammar;

use crate::builder::RecordQuery;
use crate::driver::Driver;
use crate::error::Result;
use crate::record::{RecordType, Registry};

/// A configured database: driver + grammar + registry.
pub struct Database {
    driver: Box<dyn Driver>,
    grammar: Box<dyn Grammar>,
    registry: Registry,
}

impl Database {
    /// Creates a database over a driver and a dialect grammar.
    pub fn new(driver: impl Driver + 'static, grammar: impl Grammar + 'static) -> Self {
        Self {
            driver: Box::new(driver),
            grammar: Box::new(grammar),
            registry: Registry::new(),
        }
    }

    /// Registers a record type.
    pub fn register(&mut self, record_type: RecordType) {
        self.registry.register(record_type);
    }

    /// The record-type registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The driver boundary.
    #[must_use]
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// The dialect grammar.
    #[must_use]
    pub fn grammar(&self) -> &dyn Grammar {
        self.grammar.as_ref()
    }

    /// Builds a query for a registered record type.
    ///
    /// Fails with [`crate::OrmError::UnknownRecordType`] when the name was
    /// never registered.
    pub fn query(&self, record_type: &str) -> Result<RecordQuery<'_>> {
        let record_type = Arc::clone(self.registry.expect(record_type)?);
        Ok(RecordQuery::new(
            &self.registry,
            self.driver.as_ref(),
            self.grammar.as_ref(),
            record_type,
        ))
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("registry", &self.registry)
            .finish()
    }
}
