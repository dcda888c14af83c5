//! Stored procedure mappings: names, schemas, parameter and result column
//! names.

use relmodel_core::identifiers;
use relmodel_core::{
    AnnotationName, EntityTypeRef, StoreObjectIdentifier, StoreObjectType, StoredProcedure,
    StoredProcedureParameter, StoredProcedureResultColumn,
};

use crate::entity_type::RelationalEntityType;
use crate::facet::{Annotatable, annotation_facets};
use crate::property::RelationalProperty;

/// Name of the rows-affected parameter or result column when none is set.
pub const ROWS_AFFECTED_NAME: &str = "RowsAffected";

/// Suffix appended to parameters carrying an original value.
pub const ORIGINAL_VALUE_SUFFIX: &str = "_Original";

/// Store object of the `kind` stored procedure mapped for `entity_type`.
pub(crate) fn store_object(
    entity_type: EntityTypeRef<'_>,
    kind: StoreObjectType,
) -> Option<StoreObjectIdentifier> {
    StoredProcedureRef::find(entity_type, kind).and_then(StoredProcedureRef::store_object)
}

/// A stored procedure seen from the entity type it saves.
#[derive(Debug, Clone, Copy)]
pub struct StoredProcedureRef<'a> {
    entity_type: EntityTypeRef<'a>,
    procedure: &'a StoredProcedure,
}

impl<'a> StoredProcedureRef<'a> {
    /// The `kind` stored procedure of `entity_type`. TPH-derived types use
    /// the root's procedures unless they configure their own.
    #[must_use]
    pub fn find(entity_type: EntityTypeRef<'a>, kind: StoreObjectType) -> Option<Self> {
        if let Some(procedure) = entity_type.stored_procedure(kind) {
            return Some(Self {
                entity_type,
                procedure,
            });
        }
        if entity_type.is_tph_derived() {
            return Self::find(entity_type.root_type(), kind).map(|root| Self {
                entity_type,
                procedure: root.procedure,
            });
        }
        None
    }

    #[must_use]
    pub const fn entity_type(self) -> EntityTypeRef<'a> {
        self.entity_type
    }

    #[must_use]
    pub const fn procedure(self) -> &'a StoredProcedure {
        self.procedure
    }

    #[must_use]
    pub const fn kind(self) -> StoreObjectType {
        self.procedure.kind()
    }

    /// Configured name, else `{Table}_{Insert|Update|Delete}`.
    #[must_use]
    pub fn name(self) -> Option<String> {
        match self.procedure.annotations().get_text(AnnotationName::Name) {
            Some(name) => Some(name.to_string()),
            None => self.default_name(),
        }
    }

    #[must_use]
    pub fn default_name(self) -> Option<String> {
        let table = self
            .entity_type
            .table_name()
            .or_else(|| self.entity_type.default_table_name())?;
        let operation = self.kind().operation_name()?;
        Some(identifiers::truncate(
            &format!("{table}_{operation}"),
            self.entity_type.model().max_identifier_length(),
        ))
    }

    /// Configured schema, else the entity type's table schema.
    #[must_use]
    pub fn schema(self) -> Option<String> {
        match self.procedure.annotations().get_text(AnnotationName::Schema) {
            Some(schema) => Some(schema.to_string()),
            None => self.entity_type.schema(),
        }
    }

    #[must_use]
    pub fn store_object(self) -> Option<StoreObjectIdentifier> {
        self.name()
            .map(|name| StoreObjectIdentifier::new(self.kind(), name, self.schema()))
    }

    /// True if a parameter or result column is bound to `property_name`.
    #[must_use]
    pub fn binds_property(self, property_name: &str) -> bool {
        self.procedure.find_parameter(property_name).is_some()
            || self
                .procedure
                .find_original_value_parameter(property_name)
                .is_some()
            || self.procedure.find_result_column(property_name).is_some()
    }

    fn column_name(self, property_name: &str) -> String {
        self.entity_type
            .find_property(property_name)
            .and_then(|p| p.column_name())
            .unwrap_or_else(|| property_name.to_string())
    }

    fn parameter_base_name(self, parameter: &StoredProcedureParameter) -> String {
        if let Some(name) = parameter.annotations().get_text(AnnotationName::Name) {
            return name.to_string();
        }
        match parameter.property_name() {
            Some(property) if parameter.is_for_original_value() => {
                format!("{}{ORIGINAL_VALUE_SUFFIX}", self.column_name(property))
            }
            Some(property) => self.column_name(property),
            None => ROWS_AFFECTED_NAME.to_string(),
        }
    }

    /// Parameter names in declaration order, made unique within the procedure.
    #[must_use]
    pub fn parameter_names(self) -> Vec<String> {
        let max_length = self.entity_type.model().max_identifier_length();
        let mut names: Vec<String> = Vec::with_capacity(self.procedure.parameters().len());
        for parameter in self.procedure.parameters() {
            let base = self.parameter_base_name(parameter);
            let name = identifiers::uniquify(&base, max_length, |candidate| {
                names.iter().any(|n| n == candidate)
            });
            names.push(name);
        }
        names
    }

    /// Result column names in declaration order.
    #[must_use]
    pub fn result_column_names(self) -> Vec<String> {
        self.procedure
            .result_columns()
            .iter()
            .map(|column| {
                if let Some(name) = column.annotations().get_text(AnnotationName::Name) {
                    return name.to_string();
                }
                column
                    .property_name()
                    .map_or_else(|| ROWS_AFFECTED_NAME.to_string(), |p| self.column_name(p))
            })
            .collect()
    }
}

/// Relational writes on a stored procedure.
pub trait StoredProcedureMut: Annotatable {
    annotation_facets! {
        name: &str => AnnotationName::Name,
            set_name, try_set_name, can_set_name, name_configuration_source;
        schema: &str => AnnotationName::Schema,
            set_schema, try_set_schema, can_set_schema, schema_configuration_source;
    }
}

impl StoredProcedureMut for StoredProcedure {}

/// Relational writes on a stored procedure parameter or result column.
pub trait StoredProcedureBindingMut: Annotatable {
    annotation_facets! {
        /// Database name of the parameter or result column.
        name: &str => AnnotationName::Name,
            set_name, try_set_name, can_set_name, name_configuration_source;
    }
}

impl StoredProcedureBindingMut for StoredProcedureParameter {}
impl StoredProcedureBindingMut for StoredProcedureResultColumn {}
