//! The model: owner of every metadata element.

use serde_json::{Map, Value as JsonValue, json};

use super::entity_type::{EntityTypeData, EntityTypeMut, EntityTypeRef};
use super::foreign_key::{ForeignKeyData, ForeignKeyRef, ForeignKeySpec};
use super::property::{PropertyData, PropertyMut, PropertyRef};
use super::{EntityTypeId, ForeignKeyId, PropertyId};
use crate::annotations::{AnnotationName, Annotations, ConfigurationSource};
use crate::error::{Error, Result};
use crate::identifiers::{self, DEFAULT_MAX_IDENTIFIER_LENGTH};
use crate::options::RelationalOptions;

/// A mutable metadata model that becomes read-only once finalized.
#[derive(Debug, Clone, Default)]
pub struct Model {
    annotations: Annotations,
    pub(crate) entity_types: Vec<EntityTypeData>,
    pub(crate) properties: Vec<PropertyData>,
    pub(crate) foreign_keys: Vec<ForeignKeyData>,
    read_only: bool,
}

impl Model {
    /// Create an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty model seeded with provider options.
    ///
    /// Options are recorded at convention precedence so explicit model
    /// configuration still wins.
    #[must_use]
    pub fn with_options(options: &RelationalOptions) -> Self {
        let mut model = Self::new();
        let length = i64::try_from(options.max_identifier_length).unwrap_or(i64::MAX);
        model.annotations.set(
            AnnotationName::MaxIdentifierLength,
            Some(length.into()),
            ConfigurationSource::Convention,
        );
        if let Some(schema) = &options.default_schema {
            model.annotations.set(
                AnnotationName::DefaultSchema,
                Some(schema.clone().into()),
                ConfigurationSource::Convention,
            );
        }
        model
    }

    /// True once [`Model::finalize`] has been called.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Freeze the model. Every later mutation fails with
    /// [`Error::ModelReadOnly`].
    pub fn finalize(&mut self) {
        if self.read_only {
            return;
        }
        self.read_only = true;
        tracing::info!(
            entity_types = self.entity_types.len(),
            properties = self.properties.len(),
            foreign_keys = self.foreign_keys.len(),
            "Model finalized"
        );
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.read_only {
            return Err(Error::ModelReadOnly);
        }
        Ok(())
    }

    /// Model-level annotations.
    #[must_use]
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Mutable model-level annotations.
    pub fn annotations_mut(&mut self) -> Result<&mut Annotations> {
        self.ensure_mutable()?;
        Ok(&mut self.annotations)
    }

    /// Longest identifier generated names may use.
    #[must_use]
    pub fn max_identifier_length(&self) -> usize {
        self.annotations
            .get_int(AnnotationName::MaxIdentifierLength)
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or(DEFAULT_MAX_IDENTIFIER_LENGTH)
    }

    /// Schema used when neither the entity type nor its owner names one.
    #[must_use]
    pub fn default_schema(&self) -> Option<&str> {
        self.annotations.get_text(AnnotationName::DefaultSchema)
    }

    // ========================================================================
    // Entity types
    // ========================================================================

    /// Add an entity type backed by its own (non-shared) type.
    pub fn add_entity_type(&mut self, name: &str) -> Result<EntityTypeId> {
        self.insert_entity_type(name, false)
    }

    /// Add an entity type for the Rust type `T`, named by its full type path.
    pub fn add_entity_type_for<T: ?Sized>(&mut self) -> Result<EntityTypeId> {
        self.insert_entity_type(std::any::type_name::<T>(), false)
    }

    /// Add an entity type that shares its underlying type with others
    /// (owned types reached through different navigations, property bags).
    pub fn add_shared_type_entity_type(&mut self, name: &str) -> Result<EntityTypeId> {
        self.insert_entity_type(name, true)
    }

    fn insert_entity_type(&mut self, name: &str, shared: bool) -> Result<EntityTypeId> {
        self.ensure_mutable()?;
        identifiers::check_not_empty(name, "name")?;
        if self.find_entity_type(name).is_some() {
            return Err(Error::DuplicateEntityType {
                name: name.to_string(),
            });
        }

        let id = EntityTypeId(self.entity_types.len());
        let short_name = if shared {
            // `Order.ShippingAddress#Address` -> `Address`
            name.rsplit('#').next().map_or_else(|| name.to_string(), identifiers::short_name)
        } else {
            identifiers::short_name(name)
        };
        self.entity_types
            .push(EntityTypeData::new(name.to_string(), short_name, shared));
        tracing::debug!(entity_type = name, shared, "Added entity type");
        Ok(id)
    }

    /// Look up an entity type by its full name.
    #[must_use]
    pub fn find_entity_type(&self, name: &str) -> Option<EntityTypeRef<'_>> {
        self.entity_types
            .iter()
            .position(|et| et.name == name)
            .map(|idx| EntityTypeRef::new(self, EntityTypeId(idx)))
    }

    /// Look up an entity type by name, failing if it is absent.
    pub fn require_entity_type(&self, name: &str) -> Result<EntityTypeRef<'_>> {
        self.find_entity_type(name)
            .ok_or_else(|| Error::EntityTypeNotFound {
                name: name.to_string(),
            })
    }

    /// Read view of an entity type.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this model.
    #[must_use]
    pub fn entity_type(&self, id: EntityTypeId) -> EntityTypeRef<'_> {
        assert!(id.0 < self.entity_types.len(), "unknown {id}");
        EntityTypeRef::new(self, id)
    }

    /// Write view of an entity type.
    pub fn entity_type_mut(&mut self, id: EntityTypeId) -> Result<EntityTypeMut<'_>> {
        self.ensure_mutable()?;
        assert!(id.0 < self.entity_types.len(), "unknown {id}");
        Ok(EntityTypeMut::new(self, id))
    }

    /// All entity types in insertion order.
    pub fn entity_types(&self) -> impl Iterator<Item = EntityTypeRef<'_>> {
        (0..self.entity_types.len()).map(move |idx| EntityTypeRef::new(self, EntityTypeId(idx)))
    }

    /// Make `base` the base type of `entity_type`, or clear it with `None`.
    pub fn set_base_type(
        &mut self,
        entity_type: EntityTypeId,
        base: Option<EntityTypeId>,
    ) -> Result<()> {
        self.ensure_mutable()?;
        if let Some(base) = base {
            let mut current = Some(base);
            while let Some(candidate) = current {
                if candidate == entity_type {
                    return Err(Error::CircularInheritance {
                        entity_type: self.entity_types[entity_type.0].name.clone(),
                        base_type: self.entity_types[base.0].name.clone(),
                    });
                }
                current = self.entity_types[candidate.0].base_type;
            }

            let declared: Vec<String> = self.entity_types[entity_type.0]
                .properties
                .iter()
                .map(|p| self.properties[p.0].name.clone())
                .collect();
            let base_ref = self.entity_type(base);
            if let Some(clash) = declared.iter().find(|n| base_ref.find_property(n).is_some()) {
                return Err(Error::DuplicateProperty {
                    property: clash.clone(),
                    entity_type: base_ref.display_name(),
                });
            }
        }
        self.entity_types[entity_type.0].base_type = base;
        Ok(())
    }

    /// Mark an entity type abstract (not instantiable).
    pub fn set_abstract(&mut self, entity_type: EntityTypeId, is_abstract: bool) -> Result<()> {
        self.ensure_mutable()?;
        self.entity_types[entity_type.0].is_abstract = is_abstract;
        Ok(())
    }

    /// Define the primary key of a root entity type.
    pub fn set_primary_key(
        &mut self,
        entity_type: EntityTypeId,
        properties: &[PropertyId],
    ) -> Result<()> {
        self.ensure_mutable()?;
        let et = self.entity_type(entity_type);
        if et.base_type().is_some() {
            return Err(Error::invalid_argument(
                "entity_type",
                format!(
                    "a key cannot be configured on '{}' because it is a derived type",
                    et.display_name()
                ),
            ));
        }
        if properties.is_empty() {
            return Err(Error::invalid_argument(
                "properties",
                "a key needs at least one property",
            ));
        }
        for &p in properties {
            let prop = self.property(p);
            if prop.declaring_entity_type().id() != entity_type {
                return Err(Error::PropertyNotFound {
                    property: prop.name().to_string(),
                    entity_type: et.display_name(),
                });
            }
        }
        self.entity_types[entity_type.0].primary_key = Some(properties.to_vec());
        Ok(())
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Declare a property on an entity type.
    pub fn add_property(
        &mut self,
        entity_type: EntityTypeId,
        name: &str,
        nullable: bool,
    ) -> Result<PropertyId> {
        self.ensure_mutable()?;
        identifiers::check_not_empty(name, "name")?;
        let et = self.entity_type(entity_type);
        let clashes_with_derived = et
            .all_derived_types()
            .any(|d| d.find_declared_property(name).is_some());
        if et.find_property(name).is_some() || clashes_with_derived {
            return Err(Error::DuplicateProperty {
                property: name.to_string(),
                entity_type: et.display_name(),
            });
        }

        let id = PropertyId(self.properties.len());
        self.properties
            .push(PropertyData::new(name.to_string(), entity_type, nullable));
        self.entity_types[entity_type.0].properties.push(id);
        Ok(id)
    }

    /// Read view of a property.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this model.
    #[must_use]
    pub fn property(&self, id: PropertyId) -> PropertyRef<'_> {
        assert!(id.0 < self.properties.len(), "unknown {id}");
        PropertyRef::new(self, id)
    }

    /// Write view of a property.
    pub fn property_mut(&mut self, id: PropertyId) -> Result<PropertyMut<'_>> {
        self.ensure_mutable()?;
        assert!(id.0 < self.properties.len(), "unknown {id}");
        Ok(PropertyMut::new(self, id))
    }

    // ========================================================================
    // Foreign keys
    // ========================================================================

    /// Add a foreign key from `spec.dependent` to `spec.principal`.
    ///
    /// The principal key defaults to the principal's primary key.
    pub fn add_foreign_key(&mut self, spec: ForeignKeySpec) -> Result<ForeignKeyId> {
        self.ensure_mutable()?;
        let dependent = self.entity_type(spec.dependent);
        let principal = self.entity_type(spec.principal);

        if spec.properties.is_empty() {
            return Err(Error::InvalidForeignKey {
                reason: "a foreign key needs at least one property".to_string(),
            });
        }
        for &p in &spec.properties {
            if !self.property(p).declaring_entity_type().is_assignable_from(dependent) {
                return Err(Error::InvalidForeignKey {
                    reason: format!(
                        "property '{}' is not defined on '{}'",
                        self.property(p).name(),
                        dependent.display_name()
                    ),
                });
            }
        }

        let principal_key = match spec.principal_key {
            Some(key) => key,
            None => principal
                .primary_key()
                .map(|pk| pk.iter().map(|p| p.id()).collect())
                .ok_or_else(|| Error::InvalidForeignKey {
                    reason: format!("'{}' has no primary key", principal.display_name()),
                })?,
        };
        if principal_key.len() != spec.properties.len() {
            return Err(Error::InvalidForeignKey {
                reason: format!(
                    "{} dependent properties cannot reference {} principal properties",
                    spec.properties.len(),
                    principal_key.len()
                ),
            });
        }
        if spec.is_ownership {
            if spec.principal_to_dependent.is_none() {
                return Err(Error::InvalidForeignKey {
                    reason: "an ownership needs a navigation from the owner".to_string(),
                });
            }
            if dependent.find_ownership().is_some() {
                return Err(Error::InvalidForeignKey {
                    reason: format!("'{}' already has an owner", dependent.display_name()),
                });
            }
            let mut owner = Some(principal);
            while let Some(current) = owner {
                if current.is_in_hierarchy_with(dependent) {
                    return Err(Error::InvalidForeignKey {
                        reason: format!(
                            "'{}' cannot own itself through '{}'",
                            dependent.display_name(),
                            principal.display_name()
                        ),
                    });
                }
                owner = current.find_ownership().map(|fk| fk.principal_entity_type());
            }
        }

        let id = ForeignKeyId(self.foreign_keys.len());
        let dependent_id = spec.dependent;
        self.foreign_keys.push(ForeignKeyData {
            declaring: spec.dependent,
            properties: spec.properties,
            principal: spec.principal,
            principal_key,
            is_unique: spec.is_unique,
            is_required: spec.is_required,
            is_required_dependent: spec.is_required_dependent,
            is_ownership: spec.is_ownership,
            dependent_to_principal: spec.dependent_to_principal,
            principal_to_dependent: spec.principal_to_dependent,
        });
        self.entity_types[dependent_id.0].foreign_keys.push(id);
        Ok(id)
    }

    /// Read view of a foreign key.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this model.
    #[must_use]
    pub fn foreign_key(&self, id: ForeignKeyId) -> ForeignKeyRef<'_> {
        assert!(id.0 < self.foreign_keys.len(), "unknown {id}");
        ForeignKeyRef::new(self, id)
    }

    /// All foreign keys in insertion order.
    pub fn foreign_keys(&self) -> impl Iterator<Item = ForeignKeyRef<'_>> {
        (0..self.foreign_keys.len()).map(move |idx| ForeignKeyRef::new(self, ForeignKeyId(idx)))
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// JSON export of every annotation in the model, keyed by entity type
    /// and property name.
    #[must_use]
    pub fn annotation_snapshot(&self) -> JsonValue {
        let mut entity_types = Map::new();
        for et in self.entity_types() {
            let mut properties = Map::new();
            for p in et.declared_properties() {
                let overrides: Map<String, JsonValue> = p
                    .overrides()
                    .map(|o| {
                        (
                            o.store_object().display_name(),
                            serde_json::to_value(o.annotations()).unwrap_or(JsonValue::Null),
                        )
                    })
                    .collect();
                properties.insert(
                    p.name().to_string(),
                    json!({
                        "annotations": p.annotations(),
                        "overrides": overrides,
                    }),
                );
            }
            entity_types.insert(
                et.name().to_string(),
                json!({
                    "annotations": et.annotations(),
                    "properties": properties,
                }),
            );
        }
        json!({
            "annotations": self.annotations,
            "entity_types": entity_types,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_model() -> (Model, EntityTypeId, PropertyId) {
        let mut model = Model::new();
        let order = model.add_entity_type("shop::Order").unwrap();
        let id = model.add_property(order, "Id", false).unwrap();
        model.set_primary_key(order, &[id]).unwrap();
        (model, order, id)
    }

    #[test]
    fn test_add_entity_type_and_short_name() {
        let (model, order, _) = order_model();
        let et = model.entity_type(order);
        assert_eq!(et.name(), "shop::Order");
        assert_eq!(et.short_name(), "Order");
        assert!(model.find_entity_type("shop::Order").is_some());
        assert!(model.require_entity_type("Missing").is_err());
    }

    #[test]
    fn test_entity_type_for_type() {
        struct Invoice;
        let mut model = Model::new();
        let id = model.add_entity_type_for::<Invoice>().unwrap();
        assert_eq!(model.entity_type(id).short_name(), "Invoice");
    }

    #[test]
    fn test_shared_type_short_name() {
        let mut model = Model::new();
        let id = model
            .add_shared_type_entity_type("Order.ShippingAddress#shop::Address")
            .unwrap();
        let et = model.entity_type(id);
        assert!(et.has_shared_clr_type());
        assert_eq!(et.short_name(), "Address");
    }

    #[test]
    fn test_duplicate_entity_type() {
        let (mut model, _, _) = order_model();
        assert_eq!(
            model.add_entity_type("shop::Order"),
            Err(Error::DuplicateEntityType {
                name: "shop::Order".to_string()
            })
        );
        assert!(model.add_entity_type("").is_err());
    }

    #[test]
    fn test_duplicate_property_across_hierarchy() {
        let (mut model, order, _) = order_model();
        let special = model.add_entity_type("shop::SpecialOrder").unwrap();
        model.set_base_type(special, Some(order)).unwrap();
        assert!(matches!(
            model.add_property(special, "Id", false),
            Err(Error::DuplicateProperty { .. })
        ));
        model.add_property(special, "Discount", true).unwrap();
        assert!(matches!(
            model.add_property(order, "Discount", true),
            Err(Error::DuplicateProperty { .. })
        ));
    }

    #[test]
    fn test_circular_inheritance_rejected() {
        let mut model = Model::new();
        let a = model.add_entity_type("A").unwrap();
        let b = model.add_entity_type("B").unwrap();
        model.set_base_type(b, Some(a)).unwrap();
        assert!(matches!(
            model.set_base_type(a, Some(b)),
            Err(Error::CircularInheritance { .. })
        ));
        assert!(matches!(
            model.set_base_type(a, Some(a)),
            Err(Error::CircularInheritance { .. })
        ));
    }

    #[test]
    fn test_primary_key_only_on_root() {
        let (mut model, order, _) = order_model();
        let special = model.add_entity_type("shop::SpecialOrder").unwrap();
        model.set_base_type(special, Some(order)).unwrap();
        let code = model.add_property(special, "Code", false).unwrap();
        assert!(model.set_primary_key(special, &[code]).is_err());
        let pk = model.entity_type(special).primary_key().unwrap();
        assert_eq!(pk.len(), 1);
        assert_eq!(pk[0].name(), "Id");
    }

    #[test]
    fn test_foreign_key_defaults_to_principal_primary_key() {
        let (mut model, order, order_id) = order_model();
        let detail = model.add_entity_type("shop::OrderDetail").unwrap();
        let detail_id = model.add_property(detail, "Id", false).unwrap();
        model.set_primary_key(detail, &[detail_id]).unwrap();

        let fk = model
            .add_foreign_key(ForeignKeySpec::new(detail, vec![detail_id], order).unique(true))
            .unwrap();
        let fk = model.foreign_key(fk);
        assert_eq!(fk.principal_key()[0].id(), order_id);
        assert!(fk.is_unique());
        assert!(fk.principal_key_is_primary());
    }

    #[test]
    fn test_foreign_key_validation() {
        let (mut model, order, _) = order_model();
        let other = model.add_entity_type("shop::Other").unwrap();
        assert!(matches!(
            model.add_foreign_key(ForeignKeySpec::new(other, vec![], order)),
            Err(Error::InvalidForeignKey { .. })
        ));
        let keyless = model.add_entity_type("shop::Keyless").unwrap();
        let p = model.add_property(other, "KeylessId", false).unwrap();
        assert!(matches!(
            model.add_foreign_key(ForeignKeySpec::new(other, vec![p], keyless)),
            Err(Error::InvalidForeignKey { .. })
        ));
    }

    #[test]
    fn test_finalize_freezes_model() {
        let (mut model, order, id) = order_model();
        model.finalize();
        assert!(model.is_read_only());
        assert_eq!(model.add_entity_type("X"), Err(Error::ModelReadOnly));
        assert!(model.entity_type_mut(order).is_err());
        assert!(model.property_mut(id).is_err());
        assert!(model.annotations_mut().is_err());
        // Reads still work.
        assert_eq!(model.entity_type(order).short_name(), "Order");
    }

    #[test]
    fn test_with_options() {
        let options = RelationalOptions::new()
            .max_identifier_length(30)
            .default_schema("sales");
        let model = Model::with_options(&options);
        assert_eq!(model.max_identifier_length(), 30);
        assert_eq!(model.default_schema(), Some("sales"));
        assert_eq!(
            model
                .annotations()
                .configuration_source(AnnotationName::DefaultSchema),
            Some(ConfigurationSource::Convention)
        );
        assert_eq!(Model::new().max_identifier_length(), 128);
    }

    #[test]
    fn test_annotation_snapshot() {
        let (mut model, order, id) = order_model();
        model
            .entity_type_mut(order)
            .unwrap()
            .annotations_mut()
            .set(
                AnnotationName::TableName,
                Some("Orders".into()),
                ConfigurationSource::Explicit,
            );
        model.property_mut(id).unwrap().annotations_mut().set(
            AnnotationName::ColumnName,
            Some("order_id".into()),
            ConfigurationSource::Explicit,
        );

        let snapshot = model.annotation_snapshot();
        let order_json = &snapshot["entity_types"]["shop::Order"];
        assert_eq!(
            order_json["annotations"]["Relational:TableName"]["value"],
            "Orders"
        );
        assert_eq!(
            order_json["properties"]["Id"]["annotations"]["Relational:ColumnName"]["value"],
            "order_id"
        );
    }
}
