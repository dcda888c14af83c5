//! Check constraint names and listings.

use relmodel_core::identifiers;
use relmodel_core::{AnnotationName, CheckConstraint, EntityTypeRef};

use crate::entity_type::RelationalEntityType;
use crate::facet::{Annotatable, annotation_facets};

/// A check constraint seen from the entity type declaring it.
#[derive(Debug, Clone, Copy)]
pub struct CheckConstraintRef<'a> {
    entity_type: EntityTypeRef<'a>,
    constraint: &'a CheckConstraint,
}

impl<'a> CheckConstraintRef<'a> {
    /// Find a constraint by model name on `entity_type` or a base type.
    #[must_use]
    pub fn find(entity_type: EntityTypeRef<'a>, model_name: &str) -> Option<Self> {
        entity_type.base_chain().find_map(|et| {
            et.declared_check_constraints()
                .find(|c| c.model_name() == model_name)
                .map(|constraint| Self {
                    entity_type: et,
                    constraint,
                })
        })
    }

    /// Constraints declared on `entity_type` itself.
    #[must_use]
    pub fn declared_on(entity_type: EntityTypeRef<'a>) -> Vec<Self> {
        entity_type
            .declared_check_constraints()
            .map(|constraint| Self {
                entity_type,
                constraint,
            })
            .collect()
    }

    /// Constraints declared on `entity_type` and inherited from its bases,
    /// root first.
    #[must_use]
    pub fn all_on(entity_type: EntityTypeRef<'a>) -> Vec<Self> {
        let mut chain: Vec<EntityTypeRef<'a>> = entity_type.base_chain().collect();
        chain.reverse();
        chain.into_iter().flat_map(Self::declared_on).collect()
    }

    /// Entity type the constraint is declared on.
    #[must_use]
    pub const fn entity_type(self) -> EntityTypeRef<'a> {
        self.entity_type
    }

    #[must_use]
    pub fn model_name(self) -> &'a str {
        self.constraint.model_name()
    }

    #[must_use]
    pub fn sql(self) -> &'a str {
        self.constraint.sql()
    }

    /// Database name: the configured name, else the truncated model name.
    /// `None` when the entity type has no table.
    #[must_use]
    pub fn name(self) -> Option<String> {
        self.entity_type.table_name()?;
        match self.constraint.annotations().get_text(AnnotationName::Name) {
            Some(name) => Some(name.to_string()),
            None => self.default_name(),
        }
    }

    #[must_use]
    pub fn default_name(self) -> Option<String> {
        self.entity_type.table_name()?;
        Some(identifiers::truncate(
            self.model_name(),
            self.entity_type.model().max_identifier_length(),
        ))
    }
}

/// Relational writes on a check constraint.
pub trait CheckConstraintMut: Annotatable {
    annotation_facets! {
        /// Database name of the constraint.
        name: &str => AnnotationName::Name,
            set_name, try_set_name, can_set_name, name_configuration_source;
    }
}

impl CheckConstraintMut for CheckConstraint {}
