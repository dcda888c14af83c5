//! Trigger names and the table they fire on.

use relmodel_core::identifiers;
use relmodel_core::{AnnotationName, EntityTypeRef, Trigger};

use crate::entity_type::RelationalEntityType;
use crate::facet::{Annotatable, annotation_facets};

/// A trigger seen from the entity type declaring it.
#[derive(Debug, Clone, Copy)]
pub struct TriggerRef<'a> {
    entity_type: EntityTypeRef<'a>,
    trigger: &'a Trigger,
}

impl<'a> TriggerRef<'a> {
    #[must_use]
    pub fn find(entity_type: EntityTypeRef<'a>, model_name: &str) -> Option<Self> {
        entity_type
            .find_declared_trigger(model_name)
            .map(|trigger| Self {
                entity_type,
                trigger,
            })
    }

    #[must_use]
    pub fn declared_on(entity_type: EntityTypeRef<'a>) -> Vec<Self> {
        entity_type
            .declared_triggers()
            .map(|trigger| Self {
                entity_type,
                trigger,
            })
            .collect()
    }

    #[must_use]
    pub fn model_name(self) -> &'a str {
        self.trigger.model_name()
    }

    /// Database name, or `None` when the entity type has no table.
    #[must_use]
    pub fn name(self) -> Option<String> {
        self.entity_type.table_name()?;
        Some(
            self.trigger
                .annotations()
                .get_text(AnnotationName::Name)
                .map_or_else(
                    || {
                        identifiers::truncate(
                            self.model_name(),
                            self.entity_type.model().max_identifier_length(),
                        )
                    },
                    str::to_string,
                ),
        )
    }

    /// Table the trigger fires on, defaulting to the entity type's table.
    #[must_use]
    pub fn table_name(self) -> Option<String> {
        match self.trigger.annotations().get_text(AnnotationName::TableName) {
            Some(table) => Some(table.to_string()),
            None => self.entity_type.table_name(),
        }
    }

    #[must_use]
    pub fn table_schema(self) -> Option<String> {
        match self.trigger.annotations().get_text(AnnotationName::Schema) {
            Some(schema) => Some(schema.to_string()),
            None => self.entity_type.schema(),
        }
    }
}

/// Relational writes on a trigger.
pub trait TriggerMut: Annotatable {
    annotation_facets! {
        name: &str => AnnotationName::Name,
            set_name, try_set_name, can_set_name, name_configuration_source;
        table: &str => AnnotationName::TableName,
            set_table_name, try_set_table_name, can_set_table_name,
            table_name_configuration_source;
        schema: &str => AnnotationName::Schema,
            set_table_schema, try_set_table_schema, can_set_table_schema,
            table_schema_configuration_source;
    }
}

impl TriggerMut for Trigger {}
