//! Model-wide relational settings and store object lookups.

use relmodel_core::{
    AnnotationName, EntityTypeRef, Model, StoreObjectIdentifier, StoreObjectType,
};

use crate::entity_type::RelationalEntityType;
use crate::facet::annotation_facets;

/// Relational reads on a model.
pub trait RelationalModel {
    /// Entity types with rows in `store_object`, in declaration order.
    fn entity_types_mapped_to(&self, store_object: &StoreObjectIdentifier)
    -> Vec<EntityTypeRef<'_>>;

    /// Every distinct table the model maps to, ordered by schema and name.
    fn tables(&self) -> Vec<StoreObjectIdentifier>;
}

impl RelationalModel for Model {
    fn entity_types_mapped_to(
        &self,
        store_object: &StoreObjectIdentifier,
    ) -> Vec<EntityTypeRef<'_>> {
        self.entity_types()
            .filter(|et| et.is_mapped_to(store_object))
            .collect()
    }

    fn tables(&self) -> Vec<StoreObjectIdentifier> {
        let mut tables: Vec<StoreObjectIdentifier> = self
            .entity_types()
            .flat_map(|et| {
                et.store_object(StoreObjectType::Table)
                    .into_iter()
                    .chain(
                        et.mapping_fragments()
                            .map(|f| f.store_object().clone())
                            .filter(|so| so.kind() == StoreObjectType::Table),
                    )
            })
            .collect();
        tables.sort_by(|a, b| (a.schema(), a.name()).cmp(&(b.schema(), b.name())));
        tables.dedup();
        tables
    }
}

/// Relational writes on a model.
pub trait RelationalModelMut: crate::facet::Annotatable {
    annotation_facets! {
        /// Schema for tables and views that don't name one.
        schema: &str => AnnotationName::DefaultSchema,
            set_default_schema, try_set_default_schema, can_set_default_schema,
            default_schema_configuration_source;
        /// Longest identifier generated names may use.
        length: usize => AnnotationName::MaxIdentifierLength,
            set_max_identifier_length, try_set_max_identifier_length,
            can_set_max_identifier_length, max_identifier_length_configuration_source;
    }
}

impl RelationalModelMut for Model {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_type::RelationalEntityTypeMut;
    use relmodel_core::{ConfigurationSource, RelationalOptions};

    #[test]
    fn test_options_are_conventions() {
        let mut model = Model::with_options(&RelationalOptions::new().default_schema("sales"));
        assert_eq!(
            model.default_schema_configuration_source(),
            Some(ConfigurationSource::Convention)
        );
        model.set_default_schema(Some("dbo")).unwrap();
        assert_eq!(model.default_schema(), Some("dbo"));
        assert!(!model.can_set_default_schema(Some("sales"), true));

        model.set_max_identifier_length(Some(30)).unwrap();
        assert_eq!(model.max_identifier_length(), 30);
    }

    #[test]
    fn test_tables_and_mapped_types() {
        let mut model = Model::new();
        let order = model.add_entity_type("Order").unwrap();
        let details = model.add_entity_type("OrderDetails").unwrap();
        let report = model.add_entity_type("Report").unwrap();
        model.entity_type_mut(details).unwrap().set_table_name(Some("Order")).unwrap();
        model.entity_type_mut(report).unwrap().set_view_name(Some("Reports")).unwrap();
        model
            .entity_type_mut(order)
            .unwrap()
            .mapping_fragment_mut(&StoreObjectIdentifier::table("OrderExtra", None), ConfigurationSource::Explicit);

        assert_eq!(
            model.tables(),
            vec![
                StoreObjectIdentifier::table("Order", None),
                StoreObjectIdentifier::table("OrderExtra", None),
            ]
        );
        let mapped: Vec<&str> = model
            .entity_types_mapped_to(&StoreObjectIdentifier::table("Order", None))
            .into_iter()
            .map(|et| et.name())
            .collect();
        assert_eq!(mapped, vec!["Order", "OrderDetails"]);
    }
}
