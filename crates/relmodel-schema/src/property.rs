//! Relational mapping of properties: column names, column facets and
//! nullability, globally and per store object.
//!
//! Store-object-scoped reads look at the property's overrides for that
//! store object first, then at the property itself, and finally at the
//! shared root property when the column is shared through table splitting.

use relmodel_core::identifiers;
use relmodel_core::{
    AnnotationName, AnnotationValue, Annotations, ConfigurationSource, PropertyMut, PropertyRef,
    Result, SetOutcome, StoreObjectIdentifier, StoreObjectType,
};

use crate::entity_type::RelationalEntityType;
use crate::facet::{self, Annotatable, annotation_facets};
use crate::mapping::MappingStrategy;
use crate::sharing::{
    find_shared_object_root_primary_key_property, find_shared_store_object_root_property,
    is_optional_sharing_dependent,
};
use crate::stored_procedure::StoredProcedureRef;

/// Relational reads on a property.
pub trait RelationalProperty<'a> {
    /// Column name independent of any table, or `None` for properties stored
    /// inside a JSON document.
    fn column_name(self) -> Option<String>;

    fn default_column_name(self) -> Option<String>;

    /// Column name in `store_object`, or `None` if the property has no column
    /// there.
    fn column_name_in(self, store_object: &StoreObjectIdentifier) -> Option<String>;

    fn default_column_name_in(self, store_object: &StoreObjectIdentifier) -> Option<String>;

    /// True if the property has a column (or stored procedure binding) in
    /// `store_object`.
    fn is_mapped_to(self, store_object: &StoreObjectIdentifier) -> bool;

    fn column_order(self) -> Option<i32>;
    fn column_order_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<i32>>;

    fn column_type(self) -> Option<&'a str>;
    fn column_type_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<&'a str>>;

    fn is_fixed_length(self) -> Option<bool>;
    fn is_fixed_length_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<bool>>;

    fn default_value(self) -> Option<&'a AnnotationValue>;
    fn default_value_in(
        self,
        store_object: &StoreObjectIdentifier,
    ) -> Result<Option<&'a AnnotationValue>>;

    fn default_value_sql(self) -> Option<&'a str>;
    fn default_value_sql_in(self, store_object: &StoreObjectIdentifier)
    -> Result<Option<&'a str>>;

    fn computed_column_sql(self) -> Option<&'a str>;
    fn computed_column_sql_in(
        self,
        store_object: &StoreObjectIdentifier,
    ) -> Result<Option<&'a str>>;

    /// Whether a computed column is persisted.
    fn is_stored(self) -> Option<bool>;
    fn is_stored_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<bool>>;

    fn comment(self) -> Option<&'a str>;
    fn comment_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<&'a str>>;

    fn collation(self) -> Option<&'a str>;
    fn collation_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<&'a str>>;

    fn max_length(self) -> Option<usize>;
    fn max_length_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<usize>>;

    fn precision(self) -> Option<usize>;
    fn precision_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<usize>>;

    fn scale(self) -> Option<usize>;
    fn scale_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<usize>>;

    fn is_unicode(self) -> Option<bool>;
    fn is_unicode_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<bool>>;

    /// Key of the property inside its owner's JSON document.
    fn json_property_name(self) -> Option<&'a str>;

    /// Column nullability across every table the property is mapped to.
    fn is_column_nullable(self) -> bool;

    /// Column nullability in `store_object`; shared columns take the root's.
    fn is_column_nullable_in(self, store_object: &StoreObjectIdentifier) -> Result<bool>;
}

fn is_stored_in_json(property: PropertyRef<'_>) -> bool {
    property.declaring_entity_type().is_mapped_to_json()
}

/// Column name from the ownership chain, while owners share the table.
fn prefixed_column_name(
    property: PropertyRef<'_>,
    mut shares_table: impl FnMut(relmodel_core::EntityTypeRef<'_>) -> bool,
) -> String {
    let mut prefix: Vec<&str> = Vec::new();
    let mut entity_type = property.declaring_entity_type();
    while let Some(ownership) = entity_type.find_ownership() {
        let owner = ownership.principal_entity_type();
        if !shares_table(owner) {
            break;
        }
        let Some(navigation) = ownership.principal_to_dependent() else {
            break;
        };
        prefix.push(navigation);
        entity_type = owner;
    }

    let name = if prefix.is_empty() {
        property.name().to_string()
    } else {
        prefix.reverse();
        format!("{}_{}", prefix.join("_"), property.name())
    };
    identifiers::truncate(&name, property.model().max_identifier_length())
}

/// Column name of a shared root, without following its own root again.
fn root_column_name(root: PropertyRef<'_>, store_object: &StoreObjectIdentifier) -> String {
    root.find_overrides(store_object)
        .and_then(|o| o.annotations().get_text(AnnotationName::ColumnName))
        .or_else(|| root.annotations().get_text(AnnotationName::ColumnName))
        .map_or_else(
            || {
                prefixed_column_name(root, |owner| owner.is_mapped_to(store_object))
            },
            str::to_string,
        )
}

fn value_in<'a>(
    property: PropertyRef<'a>,
    store_object: &StoreObjectIdentifier,
    name: AnnotationName,
) -> Result<Option<&'a AnnotationValue>> {
    let direct = |p: PropertyRef<'a>| {
        p.find_overrides(store_object)
            .and_then(|o| o.annotations().value(name))
            .or_else(|| p.annotations().value(name))
    };
    if let Some(value) = direct(property) {
        return Ok(Some(value));
    }
    Ok(find_shared_store_object_root_property(property, store_object)?.and_then(direct))
}

fn text_in<'a>(
    property: PropertyRef<'a>,
    store_object: &StoreObjectIdentifier,
    name: AnnotationName,
) -> Result<Option<&'a str>> {
    Ok(value_in(property, store_object, name)?.and_then(AnnotationValue::as_text))
}

fn bool_in(
    property: PropertyRef<'_>,
    store_object: &StoreObjectIdentifier,
    name: AnnotationName,
) -> Result<Option<bool>> {
    Ok(value_in(property, store_object, name)?.and_then(AnnotationValue::as_bool))
}

fn int_in<T: TryFrom<i64>>(
    property: PropertyRef<'_>,
    store_object: &StoreObjectIdentifier,
    name: AnnotationName,
) -> Result<Option<T>> {
    Ok(value_in(property, store_object, name)?
        .and_then(AnnotationValue::as_int)
        .and_then(|v| T::try_from(v).ok()))
}

fn int<T: TryFrom<i64>>(property: PropertyRef<'_>, name: AnnotationName) -> Option<T> {
    property
        .annotations()
        .get_int(name)
        .and_then(|v| T::try_from(v).ok())
}

/// Nullability ignoring column sharing.
fn is_nullable_ignoring_roots(property: PropertyRef<'_>, store_object: &StoreObjectIdentifier) -> bool {
    let entity_type = property.declaring_entity_type();
    property.is_nullable()
        || entity_type.is_tph_derived()
        || is_optional_sharing_dependent(entity_type, store_object)
}

impl<'a> RelationalProperty<'a> for PropertyRef<'a> {
    fn column_name(self) -> Option<String> {
        if let Some(name) = self.annotations().get_text(AnnotationName::ColumnName) {
            return Some(name.to_string());
        }
        self.default_column_name()
    }

    fn default_column_name(self) -> Option<String> {
        let entity_type = self.declaring_entity_type();
        if is_stored_in_json(self) {
            return None;
        }

        if let Some(ownership) = entity_type.find_ownership() {
            let owner = ownership.principal_entity_type();
            if ownership.is_unique()
                && self.is_primary_key()
                && owner.table_name() == entity_type.table_name()
            {
                let principal = ownership
                    .properties()
                    .iter()
                    .position(|p| *p == self)
                    .and_then(|index| ownership.principal_key().get(index).copied());
                if let Some(principal) = principal {
                    return principal.column_name();
                }
            }
        }

        let table = entity_type.table_name();
        Some(prefixed_column_name(self, |owner| owner.table_name() == table))
    }

    fn column_name_in(self, store_object: &StoreObjectIdentifier) -> Option<String> {
        if let Some(name) = self
            .find_overrides(store_object)
            .and_then(|o| o.annotations().get_text(AnnotationName::ColumnName))
        {
            return Some(name.to_string());
        }
        if !self.is_mapped_to(store_object) {
            return None;
        }
        if let Some(name) = self.annotations().get_text(AnnotationName::ColumnName) {
            return Some(name.to_string());
        }
        self.default_column_name_in(store_object)
    }

    fn default_column_name_in(self, store_object: &StoreObjectIdentifier) -> Option<String> {
        if is_stored_in_json(self) && !self.is_primary_key() {
            return None;
        }
        if let Some(root) = find_shared_object_root_primary_key_property(self, store_object) {
            return Some(root_column_name(root, store_object));
        }
        Some(prefixed_column_name(self, |owner| owner.is_mapped_to(store_object)))
    }

    fn is_mapped_to(self, store_object: &StoreObjectIdentifier) -> bool {
        if self.find_overrides(store_object).is_some() {
            return true;
        }

        let entity_type = self.declaring_entity_type();
        let kind = store_object.kind();
        if kind.is_stored_procedure() {
            return std::iter::once(entity_type)
                .chain(entity_type.all_derived_types())
                .filter_map(|et| StoredProcedureRef::find(et, kind))
                .any(|sproc| {
                    sproc.store_object().as_ref() == Some(store_object)
                        && sproc.binds_property(self.name())
                });
        }

        if self.is_primary_key() {
            return std::iter::once(entity_type)
                .chain(entity_type.all_derived_types())
                .any(|et| et.is_mapped_to(store_object));
        }

        if entity_type.is_mapped_to_json() {
            return false;
        }

        let has_fragments = entity_type
            .mapping_fragments()
            .any(|f| f.store_object().kind() == kind);
        if has_fragments {
            if entity_type.find_mapping_fragment(store_object).is_some() {
                return false;
            }
            if entity_type.store_object(kind).as_ref() == Some(store_object) {
                return !self
                    .overrides()
                    .any(|o| entity_type.find_mapping_fragment(o.store_object()).is_some());
            }
        }

        if entity_type.store_object(kind).as_ref() == Some(store_object) {
            return true;
        }

        matches!(
            entity_type.mapping_strategy(),
            Some(MappingStrategy::Tpc)
        ) && entity_type
            .all_derived_types()
            .any(|derived| derived.store_object(kind).as_ref() == Some(store_object))
    }

    fn column_order(self) -> Option<i32> {
        int(self, AnnotationName::ColumnOrder)
    }

    fn column_order_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<i32>> {
        int_in(self, store_object, AnnotationName::ColumnOrder)
    }

    fn column_type(self) -> Option<&'a str> {
        self.annotations().get_text(AnnotationName::ColumnType)
    }

    fn column_type_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<&'a str>> {
        text_in(self, store_object, AnnotationName::ColumnType)
    }

    fn is_fixed_length(self) -> Option<bool> {
        self.annotations().get_bool(AnnotationName::IsFixedLength)
    }

    fn is_fixed_length_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<bool>> {
        bool_in(self, store_object, AnnotationName::IsFixedLength)
    }

    fn default_value(self) -> Option<&'a AnnotationValue> {
        self.annotations().value(AnnotationName::DefaultValue)
    }

    fn default_value_in(
        self,
        store_object: &StoreObjectIdentifier,
    ) -> Result<Option<&'a AnnotationValue>> {
        value_in(self, store_object, AnnotationName::DefaultValue)
    }

    fn default_value_sql(self) -> Option<&'a str> {
        self.annotations().get_text(AnnotationName::DefaultValueSql)
    }

    fn default_value_sql_in(
        self,
        store_object: &StoreObjectIdentifier,
    ) -> Result<Option<&'a str>> {
        text_in(self, store_object, AnnotationName::DefaultValueSql)
    }

    fn computed_column_sql(self) -> Option<&'a str> {
        self.annotations().get_text(AnnotationName::ComputedColumnSql)
    }

    fn computed_column_sql_in(
        self,
        store_object: &StoreObjectIdentifier,
    ) -> Result<Option<&'a str>> {
        text_in(self, store_object, AnnotationName::ComputedColumnSql)
    }

    fn is_stored(self) -> Option<bool> {
        self.annotations().get_bool(AnnotationName::IsStored)
    }

    fn is_stored_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<bool>> {
        bool_in(self, store_object, AnnotationName::IsStored)
    }

    fn comment(self) -> Option<&'a str> {
        self.annotations().get_text(AnnotationName::Comment)
    }

    fn comment_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<&'a str>> {
        text_in(self, store_object, AnnotationName::Comment)
    }

    fn collation(self) -> Option<&'a str> {
        self.annotations().get_text(AnnotationName::Collation)
    }

    fn collation_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<&'a str>> {
        text_in(self, store_object, AnnotationName::Collation)
    }

    fn max_length(self) -> Option<usize> {
        int(self, AnnotationName::MaxLength)
    }

    fn max_length_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<usize>> {
        int_in(self, store_object, AnnotationName::MaxLength)
    }

    fn precision(self) -> Option<usize> {
        int(self, AnnotationName::Precision)
    }

    fn precision_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<usize>> {
        int_in(self, store_object, AnnotationName::Precision)
    }

    fn scale(self) -> Option<usize> {
        int(self, AnnotationName::Scale)
    }

    fn scale_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<usize>> {
        int_in(self, store_object, AnnotationName::Scale)
    }

    fn is_unicode(self) -> Option<bool> {
        self.annotations().get_bool(AnnotationName::IsUnicode)
    }

    fn is_unicode_in(self, store_object: &StoreObjectIdentifier) -> Result<Option<bool>> {
        bool_in(self, store_object, AnnotationName::IsUnicode)
    }

    fn json_property_name(self) -> Option<&'a str> {
        if let Some(name) = self.annotations().get_text(AnnotationName::JsonPropertyName) {
            return Some(name);
        }
        (is_stored_in_json(self) && !self.is_primary_key()).then(|| self.name())
    }

    fn is_column_nullable(self) -> bool {
        if self.is_primary_key() {
            return false;
        }
        let entity_type = self.declaring_entity_type();
        if self.is_nullable() || entity_type.is_tph_derived() {
            return true;
        }
        entity_type
            .store_object(StoreObjectType::Table)
            .is_some_and(|table| is_optional_sharing_dependent(entity_type, &table))
    }

    fn is_column_nullable_in(self, store_object: &StoreObjectIdentifier) -> Result<bool> {
        if self.is_primary_key() {
            return Ok(false);
        }
        if matches!(
            store_object.kind(),
            StoreObjectType::Function | StoreObjectType::SqlQuery
        ) {
            return Ok(self.is_nullable());
        }
        let target = find_shared_store_object_root_property(self, store_object)?.unwrap_or(self);
        Ok(is_nullable_ignoring_roots(target, store_object))
    }
}

/// Access to a property's per-store-object override bags.
pub trait OverridableProperty {
    fn find_overrides_annotations(&self, store_object: &StoreObjectIdentifier)
    -> Option<&Annotations>;

    /// Override bag for `store_object`, created empty on first use.
    fn overrides_annotations_mut(
        &mut self,
        store_object: &StoreObjectIdentifier,
    ) -> Result<&mut Annotations>;

    /// Drop the overrides for `store_object` once nothing is left in them.
    fn remove_overrides_if_empty(&mut self, store_object: &StoreObjectIdentifier);
}

impl OverridableProperty for PropertyMut<'_> {
    fn find_overrides_annotations(
        &self,
        store_object: &StoreObjectIdentifier,
    ) -> Option<&Annotations> {
        self.as_ref()
            .find_overrides(store_object)
            .map(relmodel_core::PropertyOverrides::annotations)
    }

    fn overrides_annotations_mut(
        &mut self,
        store_object: &StoreObjectIdentifier,
    ) -> Result<&mut Annotations> {
        Ok(self.overrides_mut(store_object).annotations_mut())
    }

    fn remove_overrides_if_empty(&mut self, store_object: &StoreObjectIdentifier) {
        let empty = self
            .find_overrides_mut(store_object)
            .is_some_and(|o| o.annotations().is_empty());
        if empty {
            self.remove_overrides(store_object);
        }
    }
}

/// Declare store-object-scoped facet setters writing into the overrides.
macro_rules! store_object_facets {
    ($(
        $(#[$doc:meta])*
        $argument:ident : $ty:ty => $name:expr,
            $set:ident, $try_set:ident, $can_set:ident, $source:ident;
    )*) => {
        $(
            $(#[$doc])*
            fn $set(
                &mut self,
                store_object: &StoreObjectIdentifier,
                value: Option<$ty>,
            ) -> Result<()> {
                let result = facet::set_facet(
                    self.overrides_annotations_mut(store_object)?,
                    $name,
                    value,
                    stringify!($argument),
                );
                self.remove_overrides_if_empty(store_object);
                result
            }

            fn $try_set(
                &mut self,
                store_object: &StoreObjectIdentifier,
                value: Option<$ty>,
                from_data_annotation: bool,
            ) -> Result<SetOutcome> {
                let result = facet::try_set_facet(
                    self.overrides_annotations_mut(store_object)?,
                    $name,
                    value,
                    from_data_annotation,
                    stringify!($argument),
                );
                self.remove_overrides_if_empty(store_object);
                result
            }

            #[must_use]
            fn $can_set(
                &self,
                store_object: &StoreObjectIdentifier,
                value: Option<$ty>,
                from_data_annotation: bool,
            ) -> bool {
                match self.find_overrides_annotations(store_object) {
                    Some(annotations) => {
                        facet::can_set_facet(annotations, $name, value, from_data_annotation)
                    }
                    None => facet::can_set_facet(
                        &Annotations::new(),
                        $name,
                        value,
                        from_data_annotation,
                    ),
                }
            }

            #[must_use]
            fn $source(&self, store_object: &StoreObjectIdentifier) -> Option<ConfigurationSource> {
                self.find_overrides_annotations(store_object)
                    .and_then(|a| a.configuration_source($name))
            }
        )*
    };
}

/// Relational writes on a property.
pub trait RelationalPropertyMut: Annotatable + OverridableProperty {
    annotation_facets! {
        /// Column name used in every table, unless overridden per table.
        name: &str => AnnotationName::ColumnName,
            set_column_name, try_set_column_name, can_set_column_name,
            column_name_configuration_source;
        order: i32 => AnnotationName::ColumnOrder,
            set_column_order, try_set_column_order, can_set_column_order,
            column_order_configuration_source;
        /// Store type, e.g. `decimal(18,2)`.
        column_type: &str => AnnotationName::ColumnType,
            set_column_type, try_set_column_type, can_set_column_type,
            column_type_configuration_source;
        fixed_length: bool => AnnotationName::IsFixedLength,
            set_is_fixed_length, try_set_is_fixed_length, can_set_is_fixed_length,
            is_fixed_length_configuration_source;
        value: AnnotationValue => AnnotationName::DefaultValue,
            set_default_value, try_set_default_value, can_set_default_value,
            default_value_configuration_source;
        sql: &str => AnnotationName::DefaultValueSql,
            set_default_value_sql, try_set_default_value_sql, can_set_default_value_sql,
            default_value_sql_configuration_source;
        sql: &str => AnnotationName::ComputedColumnSql,
            set_computed_column_sql, try_set_computed_column_sql, can_set_computed_column_sql,
            computed_column_sql_configuration_source;
        stored: bool => AnnotationName::IsStored,
            set_is_stored, try_set_is_stored, can_set_is_stored, is_stored_configuration_source;
        comment: &str => AnnotationName::Comment,
            set_comment, try_set_comment, can_set_comment, comment_configuration_source;
        collation: &str => AnnotationName::Collation,
            set_collation, try_set_collation, can_set_collation, collation_configuration_source;
        name: &str => AnnotationName::JsonPropertyName,
            set_json_property_name, try_set_json_property_name, can_set_json_property_name,
            json_property_name_configuration_source;
        max_length: usize => AnnotationName::MaxLength,
            set_max_length, try_set_max_length, can_set_max_length,
            max_length_configuration_source;
        precision: usize => AnnotationName::Precision,
            set_precision, try_set_precision, can_set_precision, precision_configuration_source;
        scale: usize => AnnotationName::Scale,
            set_scale, try_set_scale, can_set_scale, scale_configuration_source;
        unicode: bool => AnnotationName::IsUnicode,
            set_is_unicode, try_set_is_unicode, can_set_is_unicode,
            is_unicode_configuration_source;
    }

    store_object_facets! {
        /// Column name in one table, view or function.
        name: &str => AnnotationName::ColumnName,
            set_column_name_in, try_set_column_name_in, can_set_column_name_in,
            column_name_configuration_source_in;
        column_type: &str => AnnotationName::ColumnType,
            set_column_type_in, try_set_column_type_in, can_set_column_type_in,
            column_type_configuration_source_in;
        fixed_length: bool => AnnotationName::IsFixedLength,
            set_is_fixed_length_in, try_set_is_fixed_length_in, can_set_is_fixed_length_in,
            is_fixed_length_configuration_source_in;
        value: AnnotationValue => AnnotationName::DefaultValue,
            set_default_value_in, try_set_default_value_in, can_set_default_value_in,
            default_value_configuration_source_in;
        sql: &str => AnnotationName::DefaultValueSql,
            set_default_value_sql_in, try_set_default_value_sql_in, can_set_default_value_sql_in,
            default_value_sql_configuration_source_in;
        sql: &str => AnnotationName::ComputedColumnSql,
            set_computed_column_sql_in, try_set_computed_column_sql_in,
            can_set_computed_column_sql_in, computed_column_sql_configuration_source_in;
        stored: bool => AnnotationName::IsStored,
            set_is_stored_in, try_set_is_stored_in, can_set_is_stored_in,
            is_stored_configuration_source_in;
        comment: &str => AnnotationName::Comment,
            set_comment_in, try_set_comment_in, can_set_comment_in, comment_configuration_source_in;
        collation: &str => AnnotationName::Collation,
            set_collation_in, try_set_collation_in, can_set_collation_in,
            collation_configuration_source_in;
    }
}

impl RelationalPropertyMut for PropertyMut<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_type::RelationalEntityTypeMut;
    use crate::sharing::MAX_ENTITY_TYPES_SHARING_TABLE;
    use relmodel_core::{EntityTypeId, Error, ForeignKeySpec, Model, PropertyId};

    fn keyed(model: &mut Model, name: &str) -> (EntityTypeId, PropertyId) {
        let et = model.add_entity_type(name).unwrap();
        let id = model.add_property(et, "Id", false).unwrap();
        model.set_primary_key(et, &[id]).unwrap();
        (et, id)
    }

    fn table(name: &str) -> StoreObjectIdentifier {
        StoreObjectIdentifier::table(name, None)
    }

    #[test]
    fn test_column_name_defaults_and_overrides() {
        let mut model = Model::new();
        let (order, _) = keyed(&mut model, "Order");
        let price = model.add_property(order, "Price", false).unwrap();
        let orders = table("Order");

        assert_eq!(model.property(price).column_name().as_deref(), Some("Price"));
        assert_eq!(model.property(price).column_name_in(&orders).as_deref(), Some("Price"));
        assert_eq!(model.property(price).column_name_in(&table("Other")), None);

        let mut prop = model.property_mut(price).unwrap();
        prop.set_column_name(Some("price")).unwrap();
        prop.set_column_name_in(&orders, Some("unit_price")).unwrap();

        let prop = model.property(price);
        assert_eq!(prop.column_name().as_deref(), Some("price"));
        assert_eq!(prop.column_name_in(&orders).as_deref(), Some("unit_price"));
        assert_eq!(prop.default_column_name().as_deref(), Some("Price"));
    }

    #[test]
    fn test_clearing_last_override_removes_overrides() {
        let mut model = Model::new();
        let (order, _) = keyed(&mut model, "Order");
        let price = model.add_property(order, "Price", false).unwrap();
        let orders = table("Order");

        let mut prop = model.property_mut(price).unwrap();
        prop.set_comment_in(&orders, Some("net")).unwrap();
        assert_eq!(
            prop.comment_configuration_source_in(&orders),
            Some(ConfigurationSource::Explicit)
        );
        assert!(prop.set_comment_in(&orders, Some("")).is_err());
        prop.set_comment_in(&orders, None).unwrap();
        assert!(model.property(price).find_overrides(&orders).is_none());
    }

    #[test]
    fn test_override_precedence() {
        let mut model = Model::new();
        let (order, _) = keyed(&mut model, "Order");
        let price = model.add_property(order, "Price", false).unwrap();
        let orders = table("Order");

        let mut prop = model.property_mut(price).unwrap();
        assert!(prop.can_set_column_name_in(&orders, Some("p"), false));
        prop.set_column_name_in(&orders, Some("p")).unwrap();
        assert!(!prop.can_set_column_name_in(&orders, Some("q"), true));
        assert_eq!(
            prop.try_set_column_name_in(&orders, Some("q"), true).unwrap(),
            SetOutcome::Rejected
        );
        assert_eq!(model.property(price).column_name_in(&orders).as_deref(), Some("p"));
    }

    #[test]
    fn test_facets_fall_back_to_property() {
        let mut model = Model::new();
        let (order, _) = keyed(&mut model, "Order");
        let price = model.add_property(order, "Price", false).unwrap();
        let orders = table("Order");

        let mut prop = model.property_mut(price).unwrap();
        prop.set_column_type(Some("decimal(18,2)")).unwrap();
        prop.set_max_length(Some(64)).unwrap();
        prop.set_default_value(Some(AnnotationValue::Int(0))).unwrap();
        prop.set_column_type_in(&orders, Some("money")).unwrap();

        let prop = model.property(price);
        assert_eq!(prop.column_type(), Some("decimal(18,2)"));
        assert_eq!(prop.column_type_in(&orders).unwrap(), Some("money"));
        assert_eq!(prop.max_length_in(&orders).unwrap(), Some(64));
        assert_eq!(prop.default_value_in(&orders).unwrap(), Some(&AnnotationValue::Int(0)));
        assert_eq!(prop.collation_in(&orders).unwrap(), None);
    }

    #[test]
    fn test_owned_columns_are_prefixed() {
        let mut model = Model::new();
        let (order, _) = keyed(&mut model, "Order");
        let address = model
            .add_shared_type_entity_type("Order.ShippingAddress#Address")
            .unwrap();
        let owner_id = model.add_property(address, "OrderId", false).unwrap();
        let street = model.add_property(address, "Street", true).unwrap();
        model.set_primary_key(address, &[owner_id]).unwrap();
        model
            .add_foreign_key(
                ForeignKeySpec::new(address, vec![owner_id], order)
                    .unique(true)
                    .ownership("ShippingAddress"),
            )
            .unwrap();

        let orders = table("Order");
        let street = model.property(street);
        assert_eq!(street.column_name().as_deref(), Some("ShippingAddress_Street"));
        assert_eq!(
            street.column_name_in(&orders).as_deref(),
            Some("ShippingAddress_Street")
        );
        assert_eq!(model.property(owner_id).column_name().as_deref(), Some("Id"));
        assert_eq!(model.property(owner_id).column_name_in(&orders).as_deref(), Some("Id"));
        assert!(street.is_column_nullable_in(&orders).unwrap());
    }

    #[test]
    fn test_shared_column_takes_root_facets() {
        let mut model = Model::new();
        let (order, order_id) = keyed(&mut model, "Order");
        let (details, details_id) = keyed(&mut model, "OrderDetails");
        let status = model.add_property(order, "Status", false).unwrap();
        let details_status = model.add_property(details, "Status", true).unwrap();
        let note = model.add_property(details, "Note", false).unwrap();
        model
            .add_foreign_key(
                ForeignKeySpec::new(details, vec![details_id], order)
                    .unique(true)
                    .required(true),
            )
            .unwrap();
        for et in [order, details] {
            model.entity_type_mut(et).unwrap().set_table_name(Some("Orders")).unwrap();
        }
        model
            .property_mut(status)
            .unwrap()
            .set_collation(Some("NOCASE"))
            .unwrap();
        model
            .property_mut(order_id)
            .unwrap()
            .set_column_name(Some("order_id"))
            .unwrap();

        let orders = table("Orders");
        let details_status = model.property(details_status);
        assert_eq!(details_status.collation_in(&orders).unwrap(), Some("NOCASE"));
        assert!(!details_status.is_column_nullable_in(&orders).unwrap());
        assert_eq!(
            model.property(details_id).column_name_in(&orders).as_deref(),
            Some("order_id")
        );
        // Optional dependent: its own columns must accept NULL.
        assert!(model.property(note).is_column_nullable_in(&orders).unwrap());
        assert!(!model.property(details_id).is_column_nullable_in(&orders).unwrap());
    }

    #[test]
    fn test_unmapped_store_object_errors() {
        let mut model = Model::new();
        let (order, _) = keyed(&mut model, "Order");
        let price = model.add_property(order, "Price", false).unwrap();
        let err = model
            .property(price)
            .is_column_nullable_in(&table("Elsewhere"))
            .unwrap_err();
        assert!(matches!(err, Error::PropertyNotMappedToTable { .. }));
    }

    #[test]
    fn test_long_sharing_chain_terminates() {
        let mut model = Model::new();
        let mut previous: Option<EntityTypeId> = None;
        let mut last_value = None;
        for i in 0..=MAX_ENTITY_TYPES_SHARING_TABLE + 2 {
            let (et, id) = keyed(&mut model, &format!("Part{i}"));
            let value = model.add_property(et, "Value", false).unwrap();
            model.entity_type_mut(et).unwrap().set_table_name(Some("Parts")).unwrap();
            if let Some(principal) = previous {
                model
                    .add_foreign_key(
                        ForeignKeySpec::new(et, vec![id], principal)
                            .unique(true)
                            .required(true)
                            .required_dependent(true),
                    )
                    .unwrap();
            }
            previous = Some(et);
            last_value = Some(value);
        }

        let parts = table("Parts");
        let value = model.property(last_value.unwrap());
        let root = find_shared_store_object_root_property(value, &parts).unwrap().unwrap();
        assert_ne!(root.declaring_entity_type().name(), "Part0");
        assert!(value.is_column_nullable_in(&parts).is_ok());
    }

    #[test]
    fn test_tph_derived_columns_are_nullable() {
        let mut model = Model::new();
        let (animal, _) = keyed(&mut model, "Animal");
        let cat = model.add_entity_type("Cat").unwrap();
        model.set_base_type(cat, Some(animal)).unwrap();
        let lives = model.add_property(cat, "Lives", false).unwrap();

        assert!(model.property(lives).is_column_nullable());
        assert!(model.property(lives).is_column_nullable_in(&table("Animal")).unwrap());
    }

    #[test]
    fn test_entity_splitting_moves_columns() {
        let mut model = Model::new();
        let (customer, id) = keyed(&mut model, "Customer");
        let name = model.add_property(customer, "Name", false).unwrap();
        let bio = model.add_property(customer, "Bio", true).unwrap();
        let details = table("CustomerDetails");
        model
            .entity_type_mut(customer)
            .unwrap()
            .mapping_fragment_mut(&details, ConfigurationSource::Explicit);
        model
            .property_mut(bio)
            .unwrap()
            .set_column_name_in(&details, Some("bio"))
            .unwrap();

        let main = table("Customer");
        assert!(model.property(name).is_mapped_to(&main));
        assert!(!model.property(name).is_mapped_to(&details));
        assert!(model.property(bio).is_mapped_to(&details));
        assert!(!model.property(bio).is_mapped_to(&main));
        assert!(model.property(id).is_mapped_to(&details));
        assert_eq!(model.property(bio).column_name_in(&details).as_deref(), Some("bio"));
    }

    #[test]
    fn test_json_properties_have_no_columns() {
        let mut model = Model::new();
        let (order, _) = keyed(&mut model, "Order");
        let address = model
            .add_shared_type_entity_type("Order.ShippingAddress#Address")
            .unwrap();
        let owner_id = model.add_property(address, "OrderId", false).unwrap();
        let street = model.add_property(address, "Street", false).unwrap();
        model.set_primary_key(address, &[owner_id]).unwrap();
        model
            .add_foreign_key(
                ForeignKeySpec::new(address, vec![owner_id], order)
                    .unique(true)
                    .ownership("ShippingAddress"),
            )
            .unwrap();
        model
            .entity_type_mut(address)
            .unwrap()
            .set_container_column_name(Some("shipping"))
            .unwrap();

        let street = model.property(street);
        assert_eq!(street.column_name(), None);
        assert_eq!(street.json_property_name(), Some("Street"));
        assert!(!street.is_mapped_to(&table("Order")));
    }
}
