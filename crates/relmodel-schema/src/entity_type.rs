//! Relational mapping of entity types: table, view, function and SQL query
//! names, schemas, inheritance strategy and table sharing.

use relmodel_core::identifiers;
use relmodel_core::{
    AnnotationName, EntityTypeMut, EntityTypeRef, ForeignKeyRef, PropertyId,
    StoreObjectIdentifier, StoreObjectType,
};

use crate::facet::{Annotatable, annotation_facets};
use crate::mapping::{MappingKind, MappingStrategy};
use crate::stored_procedure;

/// Suffix of the default name given to a SQL query mapping.
pub const SQL_QUERY_NAME_SUFFIX: &str = "MappedSqlQuery";

/// Relational reads on an entity type.
pub trait RelationalEntityType<'a> {
    /// Table the entity type is mapped to, or `None` if it is not mapped to
    /// a table.
    fn table_name(self) -> Option<String>;

    /// Table name used when none is configured.
    fn default_table_name(self) -> Option<String>;

    /// Schema of the table.
    fn schema(self) -> Option<String>;

    /// Schema used when none is configured.
    fn default_schema(self) -> Option<String>;

    fn view_name(self) -> Option<String>;

    fn default_view_name(self) -> Option<String>;

    fn view_schema(self) -> Option<String>;

    /// Name of the database function the entity type is read from.
    fn function_name(self) -> Option<&'a str>;

    /// Raw SQL the entity type is read from.
    fn sql_query(self) -> Option<&'a str>;

    /// Identifier of the SQL query store object: `{ShortName}.MappedSqlQuery`.
    fn default_sql_query_name(self) -> String;

    /// Strategy configured for the hierarchy, looked up on the root.
    fn mapping_strategy(self) -> Option<MappingStrategy>;

    /// True for derived types sharing the root's table (TPH, the default).
    fn is_tph_derived(self) -> bool;

    fn mapping_kind(self) -> MappingKind;

    /// The store object of `kind` this entity type maps to.
    fn store_object(self, kind: StoreObjectType) -> Option<StoreObjectIdentifier>;

    /// True if the entity type maps to `store_object` directly or through an
    /// entity-splitting fragment.
    fn is_mapped_to(self, store_object: &StoreObjectIdentifier) -> bool;

    /// One-to-one foreign keys on the primary key that link this type to a
    /// principal stored in the same `store_object` (table splitting).
    fn find_row_internal_foreign_keys(
        self,
        store_object: &StoreObjectIdentifier,
    ) -> Vec<ForeignKeyRef<'a>>;

    /// True if another entity type shares `store_object` through a
    /// row-internal foreign key in either direction.
    fn is_table_sharing(self, store_object: &StoreObjectIdentifier) -> bool;

    fn is_table_excluded_from_migrations(self) -> bool;

    /// Exclusion flag for one table, honouring entity-splitting fragments.
    fn is_table_excluded_from_migrations_in(self, store_object: &StoreObjectIdentifier) -> bool;

    fn comment(self) -> Option<&'a str>;

    /// JSON column holding this owned type, inherited from a JSON-mapped owner.
    fn container_column_name(self) -> Option<&'a str>;

    fn is_mapped_to_json(self) -> bool;

    /// Key of this owned type inside the owner's JSON document.
    fn json_property_name(self) -> Option<&'a str>;
}

fn unique_ownership_owner(entity_type: EntityTypeRef<'_>) -> Option<EntityTypeRef<'_>> {
    entity_type
        .find_ownership()
        .filter(|fk| fk.is_unique())
        .map(|fk| fk.principal_entity_type())
}

fn annotation_text<'a>(entity_type: EntityTypeRef<'a>, name: AnnotationName) -> Option<&'a str> {
    entity_type.annotations().get_text(name)
}

impl<'a> RelationalEntityType<'a> for EntityTypeRef<'a> {
    fn table_name(self) -> Option<String> {
        if let Some(name) = annotation_text(self, AnnotationName::TableName) {
            return Some(name.to_string());
        }
        if self.is_tph_derived() {
            return self.root_type().table_name();
        }

        let annotations = self.annotations();
        if annotations.contains(AnnotationName::ViewName)
            || self.function_name().is_some()
            || self.sql_query().is_some()
        {
            return None;
        }
        if self.is_abstract() && self.mapping_strategy() == Some(MappingStrategy::Tpc) {
            return None;
        }
        self.default_table_name()
    }

    fn default_table_name(self) -> Option<String> {
        let ownership = self.find_ownership();
        if let Some(ownership) = ownership {
            if ownership.is_unique() || self.is_mapped_to_json() {
                return ownership.principal_entity_type().table_name();
            }
        }

        let short_name = self.short_name();
        let name = match ownership {
            Some(ownership) if self.has_shared_clr_type() => {
                let navigation = ownership.principal_to_dependent().unwrap_or(short_name);
                match ownership.principal_entity_type().table_name() {
                    Some(owner_table) => format!("{owner_table}_{navigation}"),
                    None => format!("{navigation}_{short_name}"),
                }
            }
            _ => short_name.to_string(),
        };
        Some(identifiers::truncate(
            &name,
            self.model().max_identifier_length(),
        ))
    }

    fn schema(self) -> Option<String> {
        if let Some(schema) = annotation_text(self, AnnotationName::Schema) {
            return Some(schema.to_string());
        }
        if self.is_tph_derived() {
            return self.root_type().schema();
        }
        self.default_schema()
    }

    fn default_schema(self) -> Option<String> {
        if let Some(owner) = unique_ownership_owner(self) {
            if owner.table_name() == self.table_name() {
                return owner.schema();
            }
        }
        self.model().default_schema().map(str::to_string)
    }

    fn view_name(self) -> Option<String> {
        if let Some(name) = annotation_text(self, AnnotationName::ViewName) {
            return Some(name.to_string());
        }
        if self.is_tph_derived() {
            return self.root_type().view_name();
        }
        if self.function_name().is_some() || self.sql_query().is_some() {
            return None;
        }
        self.default_view_name()
    }

    fn default_view_name(self) -> Option<String> {
        unique_ownership_owner(self).and_then(|owner| owner.view_name())
    }

    fn view_schema(self) -> Option<String> {
        if let Some(schema) = annotation_text(self, AnnotationName::ViewSchema) {
            return Some(schema.to_string());
        }
        if self.is_tph_derived() {
            return self.root_type().view_schema();
        }
        let view_name = self.view_name();
        if let Some(owner) = unique_ownership_owner(self) {
            if view_name.is_some() && owner.view_name() == view_name {
                return owner.view_schema();
            }
        }
        view_name.and_then(|_| self.model().default_schema().map(str::to_string))
    }

    fn function_name(self) -> Option<&'a str> {
        annotation_text(self, AnnotationName::FunctionName).or_else(|| {
            if self.is_tph_derived() {
                self.root_type().function_name()
            } else {
                None
            }
        })
    }

    fn sql_query(self) -> Option<&'a str> {
        annotation_text(self, AnnotationName::SqlQuery).or_else(|| {
            if self.is_tph_derived() {
                self.root_type().sql_query()
            } else {
                None
            }
        })
    }

    fn default_sql_query_name(self) -> String {
        format!("{}.{}", self.short_name(), SQL_QUERY_NAME_SUFFIX)
    }

    fn mapping_strategy(self) -> Option<MappingStrategy> {
        self.base_chain().find_map(|et| {
            annotation_text(et, AnnotationName::MappingStrategy)
                .and_then(|s| s.parse::<MappingStrategy>().ok())
        })
    }

    fn is_tph_derived(self) -> bool {
        self.base_type().is_some()
            && self.mapping_strategy().unwrap_or(MappingStrategy::Tph) == MappingStrategy::Tph
    }

    fn mapping_kind(self) -> MappingKind {
        if self.function_name().is_some() {
            return MappingKind::Function;
        }
        if self.sql_query().is_some() {
            return MappingKind::SqlQuery;
        }
        match (self.table_name().is_some(), self.view_name().is_some()) {
            (true, true) => MappingKind::TableAndView,
            (false, true) => MappingKind::View,
            (true, false) => MappingKind::Table,
            (false, false) => MappingKind::Unmapped,
        }
    }

    fn store_object(self, kind: StoreObjectType) -> Option<StoreObjectIdentifier> {
        match kind {
            StoreObjectType::Table => self
                .table_name()
                .map(|name| StoreObjectIdentifier::table(name, self.schema())),
            StoreObjectType::View => self
                .view_name()
                .map(|name| StoreObjectIdentifier::view(name, self.view_schema())),
            StoreObjectType::Function => self.function_name().map(StoreObjectIdentifier::db_function),
            StoreObjectType::SqlQuery => self
                .sql_query()
                .map(|_| StoreObjectIdentifier::sql_query(self.default_sql_query_name())),
            StoreObjectType::InsertStoredProcedure
            | StoreObjectType::UpdateStoredProcedure
            | StoreObjectType::DeleteStoredProcedure => {
                stored_procedure::store_object(self, kind)
            }
        }
    }

    fn is_mapped_to(self, store_object: &StoreObjectIdentifier) -> bool {
        self.store_object(store_object.kind()).as_ref() == Some(store_object)
            || self.find_mapping_fragment(store_object).is_some()
    }

    fn find_row_internal_foreign_keys(
        self,
        store_object: &StoreObjectIdentifier,
    ) -> Vec<ForeignKeyRef<'a>> {
        let Some(primary_key) = self.primary_key() else {
            return Vec::new();
        };
        let key_ids: Vec<PropertyId> = primary_key.iter().map(|p| p.id()).collect();

        self.foreign_keys()
            .into_iter()
            .filter(|fk| {
                let principal = fk.principal_entity_type();
                let fk_ids: Vec<PropertyId> = fk.properties().iter().map(|p| p.id()).collect();
                fk_ids == key_ids
                    && fk.principal_key_is_primary()
                    && !principal.is_assignable_from(fk.declaring_entity_type())
                    && principal.is_mapped_to(store_object)
            })
            .collect()
    }

    fn is_table_sharing(self, store_object: &StoreObjectIdentifier) -> bool {
        if !self.find_row_internal_foreign_keys(store_object).is_empty() {
            return true;
        }
        self.model().entity_types().any(|other| {
            other != self
                && other
                    .find_row_internal_foreign_keys(store_object)
                    .iter()
                    .any(|fk| fk.principal_entity_type().is_assignable_from(self))
        })
    }

    fn is_table_excluded_from_migrations(self) -> bool {
        if let Some(excluded) = self
            .annotations()
            .get_bool(AnnotationName::IsTableExcludedFromMigrations)
        {
            return excluded;
        }
        if self.is_tph_derived() {
            return self.root_type().is_table_excluded_from_migrations();
        }
        match unique_ownership_owner(self) {
            Some(owner) if owner.table_name() == self.table_name() => {
                owner.is_table_excluded_from_migrations()
            }
            _ => false,
        }
    }

    fn is_table_excluded_from_migrations_in(self, store_object: &StoreObjectIdentifier) -> bool {
        if let Some(excluded) = self.find_mapping_fragment(store_object).and_then(|f| {
            f.annotations()
                .get_bool(AnnotationName::IsTableExcludedFromMigrations)
        }) {
            return excluded;
        }
        self.store_object(store_object.kind()).as_ref() == Some(store_object)
            && self.is_table_excluded_from_migrations()
    }

    fn comment(self) -> Option<&'a str> {
        annotation_text(self, AnnotationName::Comment)
    }

    fn container_column_name(self) -> Option<&'a str> {
        annotation_text(self, AnnotationName::ContainerColumnName).or_else(|| {
            self.find_ownership()
                .and_then(|fk| fk.principal_entity_type().container_column_name())
        })
    }

    fn is_mapped_to_json(self) -> bool {
        self.container_column_name().is_some()
    }

    fn json_property_name(self) -> Option<&'a str> {
        if let Some(name) = annotation_text(self, AnnotationName::JsonPropertyName) {
            return Some(name);
        }
        if !self.is_mapped_to_json() {
            return None;
        }
        self.find_ownership().and_then(|fk| fk.principal_to_dependent())
    }
}

/// Relational writes on an entity type.
pub trait RelationalEntityTypeMut: Annotatable {
    annotation_facets! {
        /// Map to a table, or clear the configured name with `None`.
        name: &str => AnnotationName::TableName,
            set_table_name, try_set_table_name, can_set_table_name, table_name_configuration_source;
        schema: &str => AnnotationName::Schema,
            set_schema, try_set_schema, can_set_schema, schema_configuration_source;
        /// Map to a view.
        name: &str => AnnotationName::ViewName,
            set_view_name, try_set_view_name, can_set_view_name, view_name_configuration_source;
        schema: &str => AnnotationName::ViewSchema,
            set_view_schema, try_set_view_schema, can_set_view_schema, view_schema_configuration_source;
        /// Map to a table-valued database function.
        name: &str => AnnotationName::FunctionName,
            set_function_name, try_set_function_name, can_set_function_name,
            function_name_configuration_source;
        /// Map to a raw SQL query.
        sql: &str => AnnotationName::SqlQuery,
            set_sql_query, try_set_sql_query, can_set_sql_query, sql_query_configuration_source;
        strategy: MappingStrategy => AnnotationName::MappingStrategy,
            set_mapping_strategy, try_set_mapping_strategy, can_set_mapping_strategy,
            mapping_strategy_configuration_source;
        excluded: bool => AnnotationName::IsTableExcludedFromMigrations,
            set_is_table_excluded_from_migrations, try_set_is_table_excluded_from_migrations,
            can_set_is_table_excluded_from_migrations,
            is_table_excluded_from_migrations_configuration_source;
        comment: &str => AnnotationName::Comment,
            set_comment, try_set_comment, can_set_comment, comment_configuration_source;
        /// Store this owned type as JSON in the named column of the owner's table.
        name: &str => AnnotationName::ContainerColumnName,
            set_container_column_name, try_set_container_column_name,
            can_set_container_column_name, container_column_name_configuration_source;
        name: &str => AnnotationName::JsonPropertyName,
            set_json_property_name, try_set_json_property_name, can_set_json_property_name,
            json_property_name_configuration_source;
    }

}

impl RelationalEntityTypeMut for EntityTypeMut<'_> {}
