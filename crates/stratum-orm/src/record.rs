//! Records, record types, and the type registry.
//!
//! Records are dynamically shaped: a hydrated row is a column-keyed
//! attribute map plus the relation results that eager loading attached.
//! The per-type metadata — table, primary key, relations, scopes, morph
//! class — lives in a [`RecordType`] registered once and shared through a
//! [`Registry`]. This keeps relation resolution a configuration-time lookup
//! instead of runtime introspection.

use std::collections::BTreeMap;
use std::sync::Arc;

use stratum_sql::Value;

use crate::error::{OrmError, Result};
use crate::relation::{RelationDescriptor, RelationKind};
use crate::scope::{ClosureScope, GlobalScope, Scope};
use stratum_sql::QueryPlan;

/// One result row: column name to value.
pub type Row = BTreeMap<String, Value>;

/// The result of a loaded relation on one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// To-one result. `None` when no related row matched.
    One(Option<Box<Record>>),
    /// To-many result. Empty when no related rows matched — a parent with
    /// zero matches still gets an entry.
    Many(Vec<Record>),
}

/// A hydrated record: attributes plus loaded relations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    attributes: Row,
    relations: BTreeMap<String, Related>,
}

impl Record {
    /// Wraps a raw row.
    #[must_use]
    pub fn from_row(attributes: Row) -> Self {
        Self {
            attributes,
            relations: BTreeMap::new(),
        }
    }

    /// Returns one attribute.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.attributes.get(column)
    }

    /// Sets one attribute.
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.attributes.insert(column.into(), value);
    }

    /// Returns the attribute map.
    #[must_use]
    pub fn attributes(&self) -> &Row {
        &self.attributes
    }

    /// Returns a loaded relation result, if that relation was loaded.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    /// Stores a relation result.
    pub fn set_relation(&mut self, name: impl Into<String>, related: Related) {
        self.relations.insert(name.into(), related);
    }

    /// Returns a loaded to-many relation as a slice.
    #[must_use]
    pub fn related_many(&self, name: &str) -> Option<&[Record]> {
        match self.relations.get(name) {
            Some(Related::Many(records)) => Some(records),
            _ => None,
        }
    }

    /// Returns a loaded to-one relation.
    #[must_use]
    pub fn related_one(&self, name: &str) -> Option<Option<&Record>> {
        match self.relations.get(name) {
            Some(Related::One(record)) => Some(record.as_deref()),
            _ => None,
        }
    }
}

/// The hydration hook: maps a raw row to a record. The casting extension
/// point for callers that want typed attributes.
pub type Hydrator = Arc<dyn Fn(Row) -> Record + Send + Sync>;

/// Metadata for one record type, registered once.
#[derive(Clone)]
pub struct RecordType {
    name: String,
    table: String,
    primary_key: String,
    morph_class: Option<String>,
    timestamps: bool,
    relations: BTreeMap<String, RelationDescriptor>,
    scopes: Vec<GlobalScope>,
    hydrator: Option<Hydrator>,
}

impl std::fmt::Debug for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("morph_class", &self.morph_class)
            .field("timestamps", &self.timestamps)
            .field("relations", &self.relations.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RecordType {
    /// Creates a record type. The primary key defaults to `id`.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: String::from("id"),
            morph_class: None,
            timestamps: false,
            relations: BTreeMap::new(),
            scopes: Vec::new(),
            hydrator: None,
        }
    }

    /// Overrides the primary key column.
    #[must_use]
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Registers the morph class value this type is identified by in
    /// polymorphic relations.
    #[must_use]
    pub fn morph_class(mut self, class: impl Into<String>) -> Self {
        self.morph_class = Some(class.into());
        self
    }

    /// Opts the type into `created_at` / `updated_at` maintenance.
    #[must_use]
    pub const fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    /// Declares a relation with a fully built descriptor.
    #[must_use]
    pub fn relation(mut self, name: impl Into<String>, descriptor: RelationDescriptor) -> Self {
        self.relations.insert(name.into(), descriptor);
        self
    }

    /// Declares a has-one relation keyed by this type's primary key.
    #[must_use]
    pub fn has_one(self, name: &str, related: &str, foreign_key: &str) -> Self {
        let local_key = self.primary_key.clone();
        self.relation(
            name,
            RelationDescriptor::new(
                related,
                RelationKind::HasOne {
                    foreign_key: String::from(foreign_key),
                    local_key,
                },
            ),
        )
    }

    /// Declares a has-many relation keyed by this type's primary key.
    #[must_use]
    pub fn has_many(self, name: &str, related: &str, foreign_key: &str) -> Self {
        let local_key = self.primary_key.clone();
        self.relation(
            name,
            RelationDescriptor::new(
                related,
                RelationKind::HasMany {
                    foreign_key: String::from(foreign_key),
                    local_key,
                },
            ),
        )
    }

    /// Declares a belongs-to relation against the related type's `id`.
    #[must_use]
    pub fn belongs_to(self, name: &str, related: &str, foreign_key: &str) -> Self {
        self.relation(
            name,
            RelationDescriptor::new(
                related,
                RelationKind::BelongsTo {
                    foreign_key: String::from(foreign_key),
                    owner_key: String::from("id"),
                },
            ),
        )
    }

    /// Declares a many-to-many relation through a pivot table.
    #[must_use]
    pub fn belongs_to_many(
        self,
        name: &str,
        related: &str,
        pivot_table: &str,
        pivot_foreign_key: &str,
        pivot_related_key: &str,
    ) -> Self {
        let local_key = self.primary_key.clone();
        self.relation(
            name,
            RelationDescriptor::new(
                related,
                RelationKind::BelongsToMany {
                    pivot_table: String::from(pivot_table),
                    pivot_foreign_key: String::from(pivot_foreign_key),
                    pivot_related_key: String::from(pivot_related_key),
                    local_key,
                    related_key: String::from("id"),
                },
            ),
        )
    }

    /// Declares a polymorphic has-one relation.
    #[must_use]
    pub fn morph_one(self, name: &str, related: &str, morph_type: &str, foreign_key: &str) -> Self {
        let local_key = self.primary_key.clone();
        self.relation(
            name,
            RelationDescriptor::new(
                related,
                RelationKind::MorphOne {
                    morph_type: String::from(morph_type),
                    foreign_key: String::from(foreign_key),
                    local_key,
                },
            ),
        )
    }

    /// Declares a polymorphic has-many relation.
    #[must_use]
    pub fn morph_many(self, name: &str, related: &str, morph_type: &str, foreign_key: &str) -> Self {
        let local_key = self.primary_key.clone();
        self.relation(
            name,
            RelationDescriptor::new(
                related,
                RelationKind::MorphMany {
                    morph_type: String::from(morph_type),
                    foreign_key: String::from(foreign_key),
                    local_key,
                },
            ),
        )
    }

    /// Registers a global scope object.
    #[must_use]
    pub fn with_global_scope(mut self, id: impl Into<String>, scope: Arc<dyn Scope>) -> Self {
        self.scopes.push(GlobalScope::new(id, scope));
        self
    }

    /// Registers a closure as a global scope.
    #[must_use]
    pub fn with_scope_fn<F>(self, id: impl Into<String>, f: F) -> Self
    where
        F: Fn(QueryPlan) -> QueryPlan + Send + Sync + 'static,
    {
        self.with_global_scope(id, Arc::new(ClosureScope::new(f)))
    }

    /// Installs the hydration hook.
    #[must_use]
    pub fn with_hydrator<F>(mut self, f: F) -> Self
    where
        F: Fn(Row) -> Record + Send + Sync + 'static,
    {
        self.hydrator = Some(Arc::new(f));
        self
    }

    /// The registry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backing table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The primary key column.
    #[must_use]
    pub fn primary_key_column(&self) -> &str {
        &self.primary_key
    }

    /// The registered morph class, if any.
    #[must_use]
    pub fn morph_class_value(&self) -> Option<&str> {
        self.morph_class.as_deref()
    }

    /// Whether the type maintains timestamp columns.
    #[must_use]
    pub const fn uses_timestamps(&self) -> bool {
        self.timestamps
    }

    /// Looks up a relation descriptor.
    #[must_use]
    pub fn relation_descriptor(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.get(name)
    }

    /// The registered global scopes, in registration order.
    #[must_use]
    pub fn global_scopes(&self) -> &[GlobalScope] {
        &self.scopes
    }

    /// Hydrates one row through the hook, or the default wrapping.
    #[must_use]
    pub fn hydrate_row(&self, row: Row) -> Record {
        match &self.hydrator {
            Some(hydrator) => hydrator(row),
            None => Record::from_row(row),
        }
    }

    /// Hydrates a batch of rows, preserving order.
    #[must_use]
    pub fn hydrate(&self, rows: Vec<Row>) -> Vec<Record> {
        rows.into_iter().map(|row| self.hydrate_row(row)).collect()
    }
}

/// The record-type registry: name to shared metadata.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: BTreeMap<String, Arc<RecordType>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record type under its name.
    pub fn register(&mut self, record_type: RecordType) {
        self.types
            .insert(String::from(record_type.name()), Arc::new(record_type));
    }

    /// Looks up a record type.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<RecordType>> {
        self.types.get(name)
    }

    /// Looks up a record type, failing with [`OrmError::UnknownRecordType`].
    pub fn expect(&self, name: &str) -> Result<&Arc<RecordType>> {
        self.get(name)
            .ok_or_else(|| OrmError::UnknownRecordType(String::from(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_attributes() {
        let mut row = Row::new();
        row.insert(String::from("id"), Value::Int(1));
        let mut record = Record::from_row(row);
        assert_eq!(record.get("id"), Some(&Value::Int(1)));

        record.set("name", Value::Text(String::from("Ada")));
        assert_eq!(record.get("name"), Some(&Value::Text(String::from("Ada"))));
    }

    #[test]
    fn test_relation_storage() {
        let mut record = Record::default();
        record.set_relation("posts", Related::Many(Vec::new()));
        assert_eq!(record.related_many("posts").map(<[Record]>::len), Some(0));
        assert!(record.related_one("posts").is_none());
    }

    #[test]
    fn test_record_type_relations() {
        let user = RecordType::new("User", "users")
            .has_many("posts", "Post", "user_id")
            .belongs_to("team", "Team", "team_id");

        assert!(user.relation_descriptor("posts").is_some());
        assert!(user.relation_descriptor("missing").is_none());
        assert!(user
            .relation_descriptor("posts")
            .unwrap()
            .kind
            .is_to_many());
    }

    #[test]
    fn test_custom_primary_key_feeds_relation_defaults() {
        let user = RecordType::new("User", "users")
            .primary_key("uid")
            .has_many("posts", "Post", "user_id");

        match &user.relation_descriptor("posts").unwrap().kind {
            RelationKind::HasMany { local_key, .. } => assert_eq!(local_key, "uid"),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_hydrator_hook() {
        let user = RecordType::new("User", "users").with_hydrator(|mut row| {
            row.insert(String::from("hydrated"), Value::Bool(true));
            Record::from_row(row)
        });

        let records = user.hydrate(vec![Row::new()]);
        assert_eq!(records[0].get("hydrated"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = Registry::new();
        registry.register(RecordType::new("User", "users"));

        assert!(registry.get("User").is_some());
        assert!(matches!(
            registry.expect("Ghost"),
            Err(OrmError::UnknownRecordType(_))
        ));
    }
}
