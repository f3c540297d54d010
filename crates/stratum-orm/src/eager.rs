//! Eager loading.
//!
//! Resolves declared relationships for a whole batch of parent records with
//! one additional query per relation per nesting level — never one per
//! parent row. Requests are dot paths (`"posts.comments"`) with optional
//! per-relation constraint closures; every prefix of a requested path is
//! guaranteed an entry before anything is queried, and a nested path is
//! never queried until its parent relation's results exist.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use stratum_sql::{Grammar, Operator, QueryPlan, Value};

use crate::driver::Driver;
use crate::error::{OrmError, Result};
use crate::record::{Record, RecordType, Registry, Related, Row};
use crate::relation::RelationKind;

/// A per-relation constraint applied to the relation's query plan after the
/// eager key constraint.
pub type Constraint = Arc<dyn Fn(QueryPlan) -> QueryPlan + Send + Sync>;

#[derive(Clone)]
struct EagerEntry {
    path: String,
    constraint: Option<Constraint>,
}

/// An eager-load request: ordered dot-path entries with optional
/// constraints.
#[derive(Clone, Default)]
pub struct EagerLoad {
    entries: Vec<EagerEntry>,
}

impl std::fmt::Debug for EagerLoad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &e.path))
            .finish()
    }
}

impl EagerLoad {
    /// Creates an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an unconstrained relation path.
    #[must_use]
    pub fn with(mut self, path: impl Into<String>) -> Self {
        self.entries.push(EagerEntry {
            path: path.into(),
            constraint: None,
        });
        self
    }

    /// Adds a relation path with a constraint closure.
    ///
    /// An empty (identity) constraint is a no-op filter: it does not reset
    /// any ordering or other state already on the relation's plan.
    #[must_use]
    pub fn with_constraint<F>(mut self, path: impl Into<String>, constraint: F) -> Self
    where
        F: Fn(QueryPlan) -> QueryPlan + Send + Sync + 'static,
    {
        self.entries.push(EagerEntry {
            path: path.into(),
            constraint: Some(Arc::new(constraint)),
        });
        self
    }

    /// True when nothing was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The requested paths, in order.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.path.as_str()).collect()
    }

    /// Expands the request so every prefix of every path has its own entry.
    ///
    /// Auto-inserted prefixes are unconstrained; an explicit entry for a
    /// path keeps (or later overrides) its constraint.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut entries: Vec<EagerEntry> = Vec::new();

        for entry in &self.entries {
            let segments: Vec<&str> = entry.path.split('.').collect();
            let mut progress = String::new();

            for (i, segment) in segments.iter().enumerate() {
                if !progress.is_empty() {
                    progress.push('.');
                }
                progress.push_str(segment);
                let is_full_path = i == segments.len() - 1;

                if let Some(existing) = entries.iter_mut().find(|e| e.path == progress) {
                    if is_full_path {
                        existing.constraint = entry.constraint.clone();
                    }
                } else {
                    entries.push(EagerEntry {
                        path: progress.clone(),
                        constraint: if is_full_path {
                            entry.constraint.clone()
                        } else {
                            None
                        },
                    });
                }
            }
        }

        Self { entries }
    }

    /// Extracts the nested request under one top-level relation: entries
    /// `"name.rest"` become `"rest"`.
    #[must_use]
    pub fn nested_under(&self, name: &str) -> Self {
        let prefix = format!("{name}.");
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| e.path.starts_with(&prefix))
                .map(|e| EagerEntry {
                    path: String::from(&e.path[prefix.len()..]),
                    constraint: e.constraint.clone(),
                })
                .collect(),
        }
    }
}

/// Resolves an eager-load request against a parent set.
///
/// One query per top-level relation; nested requests recurse with the
/// related records as the new parent set before those records are matched
/// back onto their parents.
pub fn eager_load_relations<'a>(
    registry: &'a Registry,
    driver: &'a dyn Driver,
    grammar: &'a dyn Grammar,
    parent_type: &'a RecordType,
    parents: Vec<Record>,
    eager: &'a EagerLoad,
) -> BoxFuture<'a, Result<Vec<Record>>> {
    Box::pin(async move {
        let normalized = eager.normalized();
        let mut parents = parents;

        for entry in &normalized.entries {
            // Nested paths are resolved inside their top-level relation's
            // descent, not against this parent set.
            if entry.path.contains('.') {
                continue;
            }
            let nested = normalized.nested_under(&entry.path);
            parents = load_relation(
                registry,
                driver,
                grammar,
                parent_type,
                parents,
                &entry.path,
                entry.constraint.as_ref(),
                &nested,
            )
            .await?;
        }

        Ok(parents)
    })
}

/// How a related row is keyed back to its parent.
enum MatchKey {
    /// Key lives in a named attribute of the related row.
    Attribute(String),
    /// Key lives in an aliased pivot projection, stripped before hydration.
    PivotAlias(String),
}

#[allow(clippy::too_many_arguments)]
async fn load_relation(
    registry: &Registry,
    driver: &dyn Driver,
    grammar: &dyn Grammar,
    parent_type: &RecordType,
    parents: Vec<Record>,
    name: &str,
    constraint: Option<&Constraint>,
    nested: &EagerLoad,
) -> Result<Vec<Record>> {
    let descriptor =
        parent_type
            .relation_descriptor(name)
            .ok_or_else(|| OrmError::RelationNotFound {
                record_type: String::from(parent_type.name()),
                relation: String::from(name),
            })?;
    let related_type = Arc::clone(registry.expect(&descriptor.related)?);
    let related_table = related_type.table();
    let to_many = descriptor.kind.is_to_many();

    // Build the relation query: the eager key constraint first, then any
    // caller constraint on top.
    let (plan, parent_key, match_key) = match &descriptor.kind {
        RelationKind::HasOne {
            foreign_key,
            local_key,
        }
        | RelationKind::HasMany {
            foreign_key,
            local_key,
        } => {
            let keys = collect_keys(&parents, local_key);
            (
                QueryPlan::new(related_table).where_in(foreign_key.as_str(), keys),
                local_key.clone(),
                MatchKey::Attribute(foreign_key.clone()),
            )
        }
        RelationKind::BelongsTo {
            foreign_key,
            owner_key,
        } => {
            let keys = collect_keys(&parents, foreign_key);
            (
                QueryPlan::new(related_table).where_in(owner_key.as_str(), keys),
                foreign_key.clone(),
                MatchKey::Attribute(owner_key.clone()),
            )
        }
        RelationKind::MorphOne {
            morph_type,
            foreign_key,
            local_key,
        }
        | RelationKind::MorphMany {
            morph_type,
            foreign_key,
            local_key,
        } => {
            let morph_class =
                parent_type
                    .morph_class_value()
                    .ok_or_else(|| OrmError::AmbiguousMorphClass {
                        record_type: String::from(parent_type.name()),
                    })?;
            let keys = collect_keys(&parents, local_key);
            (
                QueryPlan::new(related_table)
                    .where_in(foreign_key.as_str(), keys)
                    .where_eq(morph_type.as_str(), morph_class),
                local_key.clone(),
                MatchKey::Attribute(foreign_key.clone()),
            )
        }
        RelationKind::BelongsToMany {
            pivot_table,
            pivot_foreign_key,
            pivot_related_key,
            local_key,
            related_key,
        } => {
            let keys = collect_keys(&parents, local_key);
            let alias = format!("pivot_{pivot_foreign_key}");
            let star = format!("{related_table}.*");
            let plan = QueryPlan::new(related_table)
                .select(&[star.as_str()])
                .add_select(format!(
                    "{pivot_table}.{pivot_foreign_key} as {alias}"
                ))
                .join(
                    pivot_table,
                    &format!("{related_table}.{related_key}"),
                    Operator::Eq,
                    &format!("{pivot_table}.{pivot_related_key}"),
                )
                .where_in(format!("{pivot_table}.{pivot_foreign_key}"), keys);
            (plan, local_key.clone(), MatchKey::PivotAlias(alias))
        }
    };

    let plan = match constraint {
        Some(constraint) => (constraint.as_ref())(plan),
        None => plan,
    };

    let compiled = grammar.compile_select(&plan);
    tracing::debug!(
        relation = name,
        sql = %compiled.sql,
        bindings = compiled.bindings.len(),
        "eager loading relation"
    );
    let mut rows = match driver.select(&compiled.sql, &compiled.bindings).await {
        Ok(rows) => rows,
        Err(source) => {
            return Err(OrmError::QueryExecution {
                sql: compiled.sql,
                bindings: compiled.bindings,
                source,
            })
        }
    };

    // Pull each row's match key before hydration so the hydration hook
    // cannot disturb matching; pivot aliases are stripped from the row.
    let match_keys: Vec<Option<Value>> = rows
        .iter_mut()
        .map(|row| match &match_key {
            MatchKey::Attribute(column) => row.get(column).cloned(),
            MatchKey::PivotAlias(alias) => row.remove(alias),
        })
        .collect();

    let mut related = related_type.hydrate(rows);

    // Child relations attach to the related records before those records
    // are distributed onto their parents.
    if !nested.is_empty() {
        related =
            eager_load_relations(registry, driver, grammar, &related_type, related, nested)
                .await?;
    }

    Ok(distribute(
        parents,
        &parent_key,
        name,
        to_many,
        &match_keys,
        &related,
    ))
}

/// Collects the distinct, non-null key values of a parent set, first-seen
/// order.
fn collect_keys(parents: &[Record], column: &str) -> Vec<Value> {
    let mut keys: Vec<Value> = Vec::new();
    for parent in parents {
        let Some(value) = parent.get(column) else {
            continue;
        };
        if value.is_null() || keys.contains(value) {
            continue;
        }
        keys.push(value.clone());
    }
    keys
}

/// Canonical dictionary key for a join value. Matching follows the loose
/// key equality of SQL results: integer 1 and the text "1" coming back from
/// different drivers land on the same key.
fn dictionary_key(value: &Value) -> String {
    match value {
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Bool(b) => String::from(if *b { "1" } else { "0" }),
        other => other.to_inline_sql(),
    }
}

/// Distributes related records onto their parents.
///
/// Collections preserve the related query's result order; parents with no
/// match get an empty collection (to-many) or `None` (to-one), never a
/// missing entry.
fn distribute(
    parents: Vec<Record>,
    parent_key: &str,
    name: &str,
    to_many: bool,
    match_keys: &[Option<Value>],
    related: &[Record],
) -> Vec<Record> {
    let mut dictionary: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, key) in match_keys.iter().enumerate() {
        if let Some(key) = key {
            if key.is_null() {
                continue;
            }
            dictionary.entry(dictionary_key(key)).or_default().push(i);
        }
    }

    parents
        .into_iter()
        .map(|mut parent| {
            let matches: Vec<Record> = parent
                .get(parent_key)
                .filter(|v| !v.is_null())
                .and_then(|v| dictionary.get(&dictionary_key(v)))
                .map(|indices| indices.iter().map(|&i| related[i].clone()).collect())
                .unwrap_or_default();

            if to_many {
                parent.set_relation(name, Related::Many(matches));
            } else {
                parent.set_relation(name, Related::One(matches.into_iter().next().map(Box::new)));
            }
            parent
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> Record {
        let mut row = Row::new();
        for (k, v) in pairs {
            row.insert(String::from(*k), v.clone());
        }
        Record::from_row(row)
    }

    #[test]
    fn test_normalized_inserts_prefixes_first() {
        let eager = EagerLoad::new().with("posts.comments");
        let normalized = eager.normalized();
        assert_eq!(normalized.paths(), vec!["posts", "posts.comments"]);
    }

    #[test]
    fn test_normalized_keeps_explicit_prefix_constraint() {
        let eager = EagerLoad::new()
            .with_constraint("posts", |q| q.where_eq("published", true))
            .with("posts.comments");
        let normalized = eager.normalized();

        assert_eq!(normalized.paths(), vec!["posts", "posts.comments"]);
        assert!(normalized.entries[0].constraint.is_some());
    }

    #[test]
    fn test_normalized_deep_path() {
        let eager = EagerLoad::new().with("a.b.c");
        assert_eq!(eager.normalized().paths(), vec!["a", "a.b", "a.b.c"]);
    }

    #[test]
    fn test_nested_under_strips_prefix() {
        let eager = EagerLoad::new()
            .with("posts")
            .with("posts.comments")
            .with("posts.comments.author")
            .with("profile");
        let nested = eager.nested_under("posts");
        assert_eq!(nested.paths(), vec!["comments", "comments.author"]);
    }

    #[test]
    fn test_collect_keys_dedupes_and_skips_null() {
        let parents = vec![
            record(&[("id", Value::Int(1))]),
            record(&[("id", Value::Int(2))]),
            record(&[("id", Value::Int(1))]),
            record(&[("id", Value::Null)]),
        ];
        assert_eq!(
            collect_keys(&parents, "id"),
            vec![Value::Int(1), Value::Int(2)]
        );
    }

    #[test]
    fn test_distribute_to_many_preserves_result_order() {
        let parents = vec![
            record(&[("id", Value::Int(1))]),
            record(&[("id", Value::Int(2))]),
        ];
        let related = vec![
            record(&[("id", Value::Int(10)), ("user_id", Value::Int(2))]),
            record(&[("id", Value::Int(11)), ("user_id", Value::Int(1))]),
            record(&[("id", Value::Int(12)), ("user_id", Value::Int(2))]),
        ];
        let match_keys: Vec<Option<Value>> = related
            .iter()
            .map(|r| r.get("user_id").cloned())
            .collect();

        let parents = distribute(parents, "id", "posts", true, &match_keys, &related);

        let first = parents[0].related_many("posts").unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].get("id"), Some(&Value::Int(11)));

        let second = parents[1].related_many("posts").unwrap();
        let ids: Vec<&Value> = second.iter().filter_map(|r| r.get("id")).collect();
        assert_eq!(ids, vec![&Value::Int(10), &Value::Int(12)]);
    }

    #[test]
    fn test_distribute_unmatched_parent_gets_empty_collection() {
        let parents = vec![record(&[("id", Value::Int(9))])];
        let parents = distribute(parents, "id", "posts", true, &[], &[]);
        assert_eq!(parents[0].related_many("posts").map(<[Record]>::len), Some(0));
    }

    #[test]
    fn test_distribute_to_one_takes_first_match() {
        let parents = vec![record(&[("id", Value::Int(1))])];
        let related = vec![
            record(&[("id", Value::Int(5)), ("user_id", Value::Int(1))]),
            record(&[("id", Value::Int(6)), ("user_id", Value::Int(1))]),
        ];
        let match_keys: Vec<Option<Value>> = related
            .iter()
            .map(|r| r.get("user_id").cloned())
            .collect();

        let parents = distribute(parents, "id", "profile", false, &match_keys, &related);
        let profile = parents[0].related_one("profile").unwrap().unwrap();
        assert_eq!(profile.get("id"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_dictionary_key_is_loose_across_int_and_text() {
        assert_eq!(
            dictionary_key(&Value::Int(7)),
            dictionary_key(&Value::Text(String::from("7")))
        );
    }
}
