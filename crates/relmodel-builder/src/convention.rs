//! Convention-stage builders.
//!
//! Every mutator writes at convention (or data-annotation) precedence and
//! returns `Ok(None)` when a higher-precedence value is already in place,
//! leaving the caller to decide whether to carry on. Invalid arguments are
//! still errors.

use relmodel_core::{
    AnnotationName, AnnotationValue, Annotations, CheckConstraint, ConfigurationSource,
    EntityTypeId, EntityTypeMut, Error, Model, PropertyId, PropertyMut, Result, SetOutcome,
    StoreObjectIdentifier,
};
use relmodel_schema::facet::can_set_facet;
use relmodel_schema::{
    CheckConstraintMut, MappingStrategy, RelationalEntityTypeMut, RelationalPropertyMut,
};

/// Declare `method(value) -> Result<Option<&mut Self>>` around a `try_set_*`
/// facet of `$target` and `can_method(value) -> bool` checking the same
/// annotation in `$annotations`.
macro_rules! convention_setters {
    ($target:ident, $annotations:ident; $(
        $(#[$doc:meta])*
        $method:ident, $can:ident ($ty:ty) => $try_set:ident, $name:expr;
    )*) => {
        $(
            $(#[$doc])*
            pub fn $method(&mut self, value: Option<$ty>) -> Result<Option<&mut Self>> {
                let from_data_annotation = self.from_data_annotation;
                let outcome = self.$target()?.$try_set(value, from_data_annotation)?;
                Ok(applied(outcome, self))
            }

            #[must_use]
            pub fn $can(&self, value: Option<$ty>) -> bool {
                can_set_facet(self.$annotations(), $name, value, self.from_data_annotation)
            }
        )*
    };
}

fn applied<T>(outcome: SetOutcome, builder: &mut T) -> Option<&mut T> {
    outcome.is_applied().then_some(builder)
}

/// Convention-stage view of an entity type.
#[derive(Debug)]
pub struct ConventionEntityTypeBuilder<'a> {
    model: &'a mut Model,
    id: EntityTypeId,
    from_data_annotation: bool,
}

impl<'a> ConventionEntityTypeBuilder<'a> {
    pub(crate) fn new(model: &'a mut Model, id: EntityTypeId, from_data_annotation: bool) -> Self {
        Self {
            model,
            id,
            from_data_annotation,
        }
    }

    fn entity_type(&mut self) -> Result<EntityTypeMut<'_>> {
        self.model.entity_type_mut(self.id)
    }

    fn annotations(&self) -> &Annotations {
        self.model.entity_type(self.id).annotations()
    }

    convention_setters! { entity_type, annotations;
        to_table, can_set_table_name(&str) => try_set_table_name, AnnotationName::TableName;
        to_schema, can_set_schema(&str) => try_set_schema, AnnotationName::Schema;
        to_view, can_set_view_name(&str) => try_set_view_name, AnnotationName::ViewName;
        to_view_schema, can_set_view_schema(&str) => try_set_view_schema, AnnotationName::ViewSchema;
        to_function, can_set_function_name(&str)
            => try_set_function_name, AnnotationName::FunctionName;
        to_sql_query, can_set_sql_query(&str) => try_set_sql_query, AnnotationName::SqlQuery;
        use_mapping_strategy, can_set_mapping_strategy(MappingStrategy)
            => try_set_mapping_strategy, AnnotationName::MappingStrategy;
        has_comment, can_set_comment(&str) => try_set_comment, AnnotationName::Comment;
        exclude_from_migrations, can_exclude_from_migrations(bool)
            => try_set_is_table_excluded_from_migrations,
            AnnotationName::IsTableExcludedFromMigrations;
    }

    /// Whether [`Self::has_check_constraint`] would apply.
    #[must_use]
    pub fn can_have_check_constraint(&self, name: &str, sql: Option<&str>) -> bool {
        let source = ConfigurationSource::from_data_annotation(self.from_data_annotation);
        match self.model.entity_type(self.id).find_check_constraint(name) {
            None => true,
            Some(existing) if Some(existing.sql()) == sql => true,
            Some(existing) => source.overrides(Some(existing.configuration_source())),
        }
    }

    /// Add or update a check constraint, or remove it with `None`. A
    /// higher-precedence definition with different SQL is left alone.
    pub fn has_check_constraint(
        &mut self,
        name: &str,
        sql: Option<&str>,
    ) -> Result<Option<ConventionCheckConstraintBuilder<'_>>> {
        if !self.can_have_check_constraint(name, sql) {
            return Ok(None);
        }
        let source = ConfigurationSource::from_data_annotation(self.from_data_annotation);
        let declared_here = self
            .model
            .entity_type(self.id)
            .declared_check_constraints()
            .any(|ck| ck.model_name() == name);
        let mut entity_type = self.model.entity_type_mut(self.id)?;

        let Some(sql) = sql else {
            if declared_here {
                entity_type.remove_check_constraint(name);
            }
            return Ok(None);
        };
        if declared_here {
            if let Some(existing) = entity_type.find_declared_check_constraint_mut(name) {
                existing.set_sql(sql, source);
            }
        } else {
            entity_type.add_check_constraint(name, sql, source)?;
        }

        Ok(Some(ConventionCheckConstraintBuilder {
            model: &mut *self.model,
            entity: self.id,
            model_name: name.to_string(),
            from_data_annotation: self.from_data_annotation,
        }))
    }

    /// Convention-stage view of an existing property.
    pub fn property(&mut self, name: &str) -> Result<ConventionPropertyBuilder<'_>> {
        let id = self.model.entity_type(self.id).require_property(name)?.id();
        Ok(ConventionPropertyBuilder {
            model: &mut *self.model,
            id,
            from_data_annotation: self.from_data_annotation,
        })
    }
}

/// Convention-stage view of a property.
#[derive(Debug)]
pub struct ConventionPropertyBuilder<'a> {
    model: &'a mut Model,
    id: PropertyId,
    from_data_annotation: bool,
}

impl ConventionPropertyBuilder<'_> {
    fn property(&mut self) -> Result<PropertyMut<'_>> {
        self.model.property_mut(self.id)
    }

    fn annotations(&self) -> &Annotations {
        self.model.property(self.id).annotations()
    }

    convention_setters! { property, annotations;
        has_column_name, can_set_column_name(&str) => try_set_column_name, AnnotationName::ColumnName;
        has_column_order, can_set_column_order(i32)
            => try_set_column_order, AnnotationName::ColumnOrder;
        has_column_type, can_set_column_type(&str) => try_set_column_type, AnnotationName::ColumnType;
        is_fixed_length, can_set_is_fixed_length(bool)
            => try_set_is_fixed_length, AnnotationName::IsFixedLength;
        has_default_value, can_set_default_value(AnnotationValue)
            => try_set_default_value, AnnotationName::DefaultValue;
        has_default_value_sql, can_set_default_value_sql(&str)
            => try_set_default_value_sql, AnnotationName::DefaultValueSql;
        has_computed_column_sql, can_set_computed_column_sql(&str)
            => try_set_computed_column_sql, AnnotationName::ComputedColumnSql;
        is_stored, can_set_is_stored(bool) => try_set_is_stored, AnnotationName::IsStored;
        has_comment, can_set_comment(&str) => try_set_comment, AnnotationName::Comment;
        use_collation, can_set_collation(&str) => try_set_collation, AnnotationName::Collation;
        has_json_property_name, can_set_json_property_name(&str)
            => try_set_json_property_name, AnnotationName::JsonPropertyName;
        has_max_length, can_set_max_length(usize) => try_set_max_length, AnnotationName::MaxLength;
        has_precision, can_set_precision(usize) => try_set_precision, AnnotationName::Precision;
        has_scale, can_set_scale(usize) => try_set_scale, AnnotationName::Scale;
        is_unicode, can_set_is_unicode(bool) => try_set_is_unicode, AnnotationName::IsUnicode;
    }

    /// Column name in one store object.
    pub fn has_column_name_in(
        &mut self,
        store_object: &StoreObjectIdentifier,
        name: Option<&str>,
    ) -> Result<Option<&mut Self>> {
        let from_data_annotation = self.from_data_annotation;
        let outcome = self
            .property()?
            .try_set_column_name_in(store_object, name, from_data_annotation)?;
        Ok(applied(outcome, self))
    }

    #[must_use]
    pub fn can_set_column_name_in(
        &self,
        store_object: &StoreObjectIdentifier,
        name: Option<&str>,
    ) -> bool {
        let empty = Annotations::new();
        let annotations = self
            .model
            .property(self.id)
            .find_overrides(store_object)
            .map_or(&empty, |o| o.annotations());
        can_set_facet(
            annotations,
            AnnotationName::ColumnName,
            name,
            self.from_data_annotation,
        )
    }

    /// Store type in one store object.
    pub fn has_column_type_in(
        &mut self,
        store_object: &StoreObjectIdentifier,
        column_type: Option<&str>,
    ) -> Result<Option<&mut Self>> {
        let from_data_annotation = self.from_data_annotation;
        let outcome = self
            .property()?
            .try_set_column_type_in(store_object, column_type, from_data_annotation)?;
        Ok(applied(outcome, self))
    }
}

/// Convention-stage view of a check constraint.
#[derive(Debug)]
pub struct ConventionCheckConstraintBuilder<'a> {
    model: &'a mut Model,
    entity: EntityTypeId,
    model_name: String,
    from_data_annotation: bool,
}

impl ConventionCheckConstraintBuilder<'_> {
    fn with_constraint<R>(
        &mut self,
        f: impl FnOnce(&mut CheckConstraint) -> Result<R>,
    ) -> Result<R> {
        let mut entity_type = self.model.entity_type_mut(self.entity)?;
        let constraint = entity_type
            .find_declared_check_constraint_mut(&self.model_name)
            .ok_or_else(|| {
                Error::invalid_argument(
                    "check_constraint",
                    format!("'{}' was removed", self.model_name),
                )
            })?;
        f(constraint)
    }

    /// Database name of the constraint.
    pub fn has_name(&mut self, name: Option<&str>) -> Result<Option<&mut Self>> {
        let from_data_annotation = self.from_data_annotation;
        let outcome = self.with_constraint(|ck| ck.try_set_name(name, from_data_annotation))?;
        Ok(applied(outcome, self))
    }

    #[must_use]
    pub fn can_set_name(&self, name: Option<&str>) -> bool {
        self.model
            .entity_type(self.entity)
            .find_check_constraint(&self.model_name)
            .is_some_and(|ck| {
                can_set_facet(
                    ck.annotations(),
                    AnnotationName::Name,
                    name,
                    self.from_data_annotation,
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::{EntityTypeMapping, ModelBuilder};
    use relmodel_core::{ConfigurationSource, StoreObjectIdentifier};
    use relmodel_schema::{
        CheckConstraintRef, MappingStrategy, RelationalEntityType, RelationalProperty,
    };

    fn builder() -> ModelBuilder {
        let mut builder = ModelBuilder::new();
        let mut order = builder.entity("Order").unwrap();
        order.has_key(&["Id"]).unwrap();
        order.property("Total").unwrap();
        builder
    }

    #[test]
    fn test_convention_yields_to_explicit() {
        let mut builder = builder();
        builder.entity("Order").unwrap().to_table("Orders").unwrap();

        let mut convention = builder.convention_entity("Order", false).unwrap();
        assert!(!convention.can_set_table_name(Some("order_table")));
        assert!(convention.to_table(Some("order_table")).unwrap().is_none());
        assert!(convention.can_set_table_name(Some("Orders")));
        assert!(convention.to_schema(Some("sales")).unwrap().is_some());
        assert!(convention.to_schema(Some("")).is_err());

        let model = builder.finish();
        let order = model.require_entity_type("Order").unwrap();
        assert_eq!(order.table_name().as_deref(), Some("Orders"));
        assert_eq!(order.schema().as_deref(), Some("sales"));
    }

    #[test]
    fn test_data_annotation_beats_convention() {
        let mut builder = builder();
        builder
            .convention_entity("Order", true)
            .unwrap()
            .has_comment(Some("from attribute"))
            .unwrap();
        let mut convention = builder.convention_entity("Order", false).unwrap();
        assert!(convention.has_comment(Some("from convention")).unwrap().is_none());
        assert!(
            convention
                .use_mapping_strategy(Some(MappingStrategy::Tpt))
                .unwrap()
                .and_then(|b| b.exclude_from_migrations(Some(true)).unwrap())
                .is_some()
        );

        let model = builder.finish();
        let order = model.require_entity_type("Order").unwrap();
        assert_eq!(order.comment(), Some("from attribute"));
        assert_eq!(order.mapping_strategy(), Some(MappingStrategy::Tpt));
        assert!(order.is_table_excluded_from_migrations());
    }

    #[test]
    fn test_property_setters() {
        let mut builder = builder();
        builder
            .entity("Order")
            .unwrap()
            .property("Total")
            .unwrap()
            .has_column_type(Some("decimal(18,2)"))
            .unwrap();

        let orders = StoreObjectIdentifier::table("Order", None);
        let mut convention = builder.convention_entity("Order", false).unwrap();
        let mut total = convention.property("Total").unwrap();
        assert!(total.has_column_type(Some("money")).unwrap().is_none());
        assert!(total.has_column_name(Some("total")).unwrap().is_some());
        assert!(total.can_set_column_name_in(&orders, Some("order_total")));
        assert!(
            total
                .has_column_name_in(&orders, Some("order_total"))
                .unwrap()
                .is_some()
        );
        assert!(convention.property("Missing").is_err());

        let model = builder.finish();
        let total = model
            .require_entity_type("Order")
            .unwrap()
            .require_property("Total")
            .unwrap();
        assert_eq!(total.column_type(), Some("decimal(18,2)"));
        assert_eq!(total.column_name().as_deref(), Some("total"));
        assert_eq!(total.column_name_in(&orders).as_deref(), Some("order_total"));
    }

    #[test]
    fn test_check_constraint_precedence() {
        let mut builder = builder();
        builder
            .entity("Order")
            .unwrap()
            .has_check_constraint("CK_Total", Some("Total > 0"))
            .unwrap();

        let mut convention = builder.convention_entity("Order", false).unwrap();
        assert!(!convention.can_have_check_constraint("CK_Total", Some("Total >= 0")));
        assert!(
            convention
                .has_check_constraint("CK_Total", Some("Total >= 0"))
                .unwrap()
                .is_none()
        );
        assert!(convention.has_check_constraint("CK_Total", None).unwrap().is_none());

        let mut added = convention
            .has_check_constraint("CK_Id", Some("Id > 0"))
            .unwrap()
            .unwrap();
        assert!(added.can_set_name(Some("CK_Order_Id")));
        assert!(added.has_name(Some("CK_Order_Id")).unwrap().is_some());

        let model = builder.finish();
        let order = model.require_entity_type("Order").unwrap();
        let total = CheckConstraintRef::find(order, "CK_Total").unwrap();
        assert_eq!(total.sql(), "Total > 0");
        let id = CheckConstraintRef::find(order, "CK_Id").unwrap();
        assert_eq!(id.name().as_deref(), Some("CK_Order_Id"));
        assert_eq!(
            order.find_check_constraint("CK_Id").unwrap().configuration_source(),
            ConfigurationSource::Convention
        );
    }
}
