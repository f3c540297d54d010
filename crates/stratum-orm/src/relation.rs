//! Relation descriptors.
//!
//! A descriptor is declarative metadata for one relationship between two
//! record types: which kind it is and which keys tie the two tables
//! together. Descriptors are built once at type-registration time and are
//! immutable afterwards; every query for a relation name reuses the same
//! descriptor.

/// The relationship kind, carrying the keys that kind requires.
///
/// Polymorphic kinds carry their morph-type column explicitly; the parent
/// side's identifying string comes from the parent type's registered morph
/// class at resolve time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// One related row on the related table pointing back at the parent.
    HasOne {
        /// Foreign key column on the related table.
        foreign_key: String,
        /// Key column on the parent table.
        local_key: String,
    },
    /// Many related rows on the related table pointing back at the parent.
    HasMany {
        /// Foreign key column on the related table.
        foreign_key: String,
        /// Key column on the parent table.
        local_key: String,
    },
    /// The parent holds the foreign key pointing at the related table.
    BelongsTo {
        /// Foreign key column on the parent table.
        foreign_key: String,
        /// Key column on the related table.
        owner_key: String,
    },
    /// Many-to-many through a pivot table.
    BelongsToMany {
        /// The pivot table.
        pivot_table: String,
        /// Pivot column pointing at the parent.
        pivot_foreign_key: String,
        /// Pivot column pointing at the related table.
        pivot_related_key: String,
        /// Key column on the parent table.
        local_key: String,
        /// Key column on the related table.
        related_key: String,
    },
    /// Polymorphic has-one: the related table stores both a foreign key and
    /// the owning type's morph class.
    MorphOne {
        /// Column on the related table holding the owner's morph class.
        morph_type: String,
        /// Foreign key column on the related table.
        foreign_key: String,
        /// Key column on the parent table.
        local_key: String,
    },
    /// Polymorphic has-many.
    MorphMany {
        /// Column on the related table holding the owner's morph class.
        morph_type: String,
        /// Foreign key column on the related table.
        foreign_key: String,
        /// Key column on the parent table.
        local_key: String,
    },
}

impl RelationKind {
    /// Whether the relation yields a collection (true) or a single optional
    /// record (false).
    #[must_use]
    pub const fn is_to_many(&self) -> bool {
        matches!(
            self,
            Self::HasMany { .. } | Self::BelongsToMany { .. } | Self::MorphMany { .. }
        )
    }
}

/// One declared relationship: the related record type's registry name plus
/// the kind with its keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    /// Registry name of the related record type.
    pub related: String,
    /// The relationship kind and its keys.
    pub kind: RelationKind,
}

impl RelationDescriptor {
    /// Creates a descriptor.
    pub fn new(related: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            related: related.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_many_classification() {
        let has_many = RelationKind::HasMany {
            foreign_key: String::from("user_id"),
            local_key: String::from("id"),
        };
        let belongs_to = RelationKind::BelongsTo {
            foreign_key: String::from("user_id"),
            owner_key: String::from("id"),
        };
        assert!(has_many.is_to_many());
        assert!(!belongs_to.is_to_many());
    }
}
