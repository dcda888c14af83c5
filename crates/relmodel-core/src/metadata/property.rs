//! Properties and their per-store-object overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entity_type::EntityTypeRef;
use super::foreign_key::ForeignKeyRef;
use super::model::Model;
use super::{EntityTypeId, PropertyId};
use crate::annotations::Annotations;
use crate::store_object::StoreObjectIdentifier;

#[derive(Debug, Clone)]
pub(crate) struct PropertyData {
    pub(crate) name: String,
    pub(crate) declaring: EntityTypeId,
    pub(crate) nullable: bool,
    pub(crate) annotations: Annotations,
    pub(crate) overrides: BTreeMap<StoreObjectIdentifier, PropertyOverrides>,
}

impl PropertyData {
    pub(crate) fn new(name: String, declaring: EntityTypeId, nullable: bool) -> Self {
        Self {
            name,
            declaring,
            nullable,
            annotations: Annotations::new(),
            overrides: BTreeMap::new(),
        }
    }
}

/// Facets of a property that apply only when it is mapped to one specific
/// table, view, function, query or stored procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyOverrides {
    store_object: StoreObjectIdentifier,
    annotations: Annotations,
}

impl PropertyOverrides {
    #[must_use]
    pub fn new(store_object: StoreObjectIdentifier) -> Self {
        Self {
            store_object,
            annotations: Annotations::new(),
        }
    }

    #[must_use]
    pub fn store_object(&self) -> &StoreObjectIdentifier {
        &self.store_object
    }

    #[must_use]
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}

/// Read view of a property.
#[derive(Debug, Clone, Copy)]
pub struct PropertyRef<'a> {
    model: &'a Model,
    id: PropertyId,
}

impl PartialEq for PropertyRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.model, other.model) && self.id == other.id
    }
}

impl Eq for PropertyRef<'_> {}

impl<'a> PropertyRef<'a> {
    pub(crate) fn new(model: &'a Model, id: PropertyId) -> Self {
        Self { model, id }
    }

    fn data(self) -> &'a PropertyData {
        &self.model.properties[self.id.0]
    }

    #[must_use]
    pub const fn id(self) -> PropertyId {
        self.id
    }

    #[must_use]
    pub const fn model(self) -> &'a Model {
        self.model
    }

    #[must_use]
    pub fn name(self) -> &'a str {
        &self.data().name
    }

    /// Entity type that declares the property (not a derived type that
    /// inherits it).
    #[must_use]
    pub fn declaring_entity_type(self) -> EntityTypeRef<'a> {
        EntityTypeRef::new(self.model, self.data().declaring)
    }

    /// Whether the property accepts null values.
    #[must_use]
    pub fn is_nullable(self) -> bool {
        self.data().nullable
    }

    #[must_use]
    pub fn annotations(self) -> &'a Annotations {
        &self.data().annotations
    }

    /// True if the property is part of its hierarchy's primary key.
    #[must_use]
    pub fn is_primary_key(self) -> bool {
        self.primary_key_index().is_some()
    }

    /// Position of the property within the primary key.
    #[must_use]
    pub fn primary_key_index(self) -> Option<usize> {
        self.declaring_entity_type()
            .root_type()
            .primary_key_ids()
            .and_then(|pk| pk.iter().position(|&p| p == self.id))
    }

    /// Foreign keys that include this property.
    pub fn containing_foreign_keys(self) -> impl Iterator<Item = ForeignKeyRef<'a>> {
        let id = self.id;
        self.model
            .foreign_keys()
            .filter(move |fk| fk.property_ids().contains(&id))
    }

    #[must_use]
    pub fn is_foreign_key(self) -> bool {
        self.containing_foreign_keys().next().is_some()
    }

    /// Overrides for one store object, if any were configured.
    #[must_use]
    pub fn find_overrides(self, store_object: &StoreObjectIdentifier) -> Option<&'a PropertyOverrides> {
        self.data().overrides.get(store_object)
    }

    /// Every configured override, ordered by store object.
    pub fn overrides(self) -> impl Iterator<Item = &'a PropertyOverrides> {
        self.data().overrides.values()
    }
}

/// Write view of a property.
#[derive(Debug)]
pub struct PropertyMut<'a> {
    model: &'a mut Model,
    id: PropertyId,
}

impl<'a> PropertyMut<'a> {
    pub(crate) fn new(model: &'a mut Model, id: PropertyId) -> Self {
        Self { model, id }
    }

    fn data_mut(&mut self) -> &mut PropertyData {
        &mut self.model.properties[self.id.0]
    }

    #[must_use]
    pub const fn id(&self) -> PropertyId {
        self.id
    }

    /// Read view of the same property.
    #[must_use]
    pub fn as_ref(&self) -> PropertyRef<'_> {
        PropertyRef::new(self.model, self.id)
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.data_mut().annotations
    }

    pub fn set_nullable(&mut self, nullable: bool) {
        self.data_mut().nullable = nullable;
    }

    /// Overrides for `store_object`, created empty on first use.
    pub fn overrides_mut(&mut self, store_object: &StoreObjectIdentifier) -> &mut PropertyOverrides {
        self.data_mut()
            .overrides
            .entry(store_object.clone())
            .or_insert_with(|| PropertyOverrides::new(store_object.clone()))
    }

    /// Existing overrides for `store_object`, without creating them.
    pub fn find_overrides_mut(
        &mut self,
        store_object: &StoreObjectIdentifier,
    ) -> Option<&mut PropertyOverrides> {
        self.data_mut().overrides.get_mut(store_object)
    }

    /// Drop the overrides for `store_object`, returning them if present.
    pub fn remove_overrides(
        &mut self,
        store_object: &StoreObjectIdentifier,
    ) -> Option<PropertyOverrides> {
        self.data_mut().overrides.remove(store_object)
    }
}
