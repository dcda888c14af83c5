//! Entity types: the nodes of the metadata graph.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use super::check_constraint::CheckConstraint;
use super::foreign_key::ForeignKeyRef;
use super::fragment::MappingFragment;
use super::model::Model;
use super::property::PropertyRef;
use super::stored_procedure::StoredProcedure;
use super::trigger::Trigger;
use super::{EntityTypeId, ForeignKeyId, PropertyId};
use crate::annotations::{Annotations, ConfigurationSource};
use crate::error::{Error, Result};
use crate::identifiers;
use crate::store_object::{StoreObjectIdentifier, StoreObjectType};

#[derive(Debug, Clone)]
pub(crate) struct EntityTypeData {
    pub(crate) name: String,
    pub(crate) short_name: String,
    pub(crate) shared_clr_type: bool,
    pub(crate) base_type: Option<EntityTypeId>,
    pub(crate) is_abstract: bool,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) foreign_keys: Vec<ForeignKeyId>,
    pub(crate) primary_key: Option<Vec<PropertyId>>,
    pub(crate) annotations: Annotations,
    pub(crate) check_constraints: BTreeMap<String, CheckConstraint>,
    pub(crate) triggers: BTreeMap<String, Trigger>,
    pub(crate) stored_procedures: BTreeMap<StoreObjectType, StoredProcedure>,
    pub(crate) fragments: BTreeMap<StoreObjectIdentifier, MappingFragment>,
}

impl EntityTypeData {
    pub(crate) fn new(name: String, short_name: String, shared_clr_type: bool) -> Self {
        Self {
            name,
            short_name,
            shared_clr_type,
            base_type: None,
            is_abstract: false,
            properties: Vec::new(),
            foreign_keys: Vec::new(),
            primary_key: None,
            annotations: Annotations::new(),
            check_constraints: BTreeMap::new(),
            triggers: BTreeMap::new(),
            stored_procedures: BTreeMap::new(),
            fragments: BTreeMap::new(),
        }
    }
}

/// Read view of an entity type.
#[derive(Debug, Clone, Copy)]
pub struct EntityTypeRef<'a> {
    model: &'a Model,
    id: EntityTypeId,
}

impl PartialEq for EntityTypeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.model, other.model) && self.id == other.id
    }
}

impl Eq for EntityTypeRef<'_> {}

impl<'a> EntityTypeRef<'a> {
    pub(crate) fn new(model: &'a Model, id: EntityTypeId) -> Self {
        Self { model, id }
    }

    fn data(self) -> &'a EntityTypeData {
        &self.model.entity_types[self.id.0]
    }

    #[must_use]
    pub const fn id(self) -> EntityTypeId {
        self.id
    }

    #[must_use]
    pub const fn model(self) -> &'a Model {
        self.model
    }

    /// Full name; the type path for ordinary types, the navigation-qualified
    /// name for shared-type entity types.
    #[must_use]
    pub fn name(self) -> &'a str {
        &self.data().name
    }

    /// Name without module path, used for default table names.
    #[must_use]
    pub fn short_name(self) -> &'a str {
        &self.data().short_name
    }

    /// Name used in error messages.
    #[must_use]
    pub fn display_name(self) -> String {
        if self.data().shared_clr_type {
            self.data().name.clone()
        } else {
            self.data().short_name.clone()
        }
    }

    /// True if several entity types share the same Rust type.
    #[must_use]
    pub fn has_shared_clr_type(self) -> bool {
        self.data().shared_clr_type
    }

    #[must_use]
    pub fn is_abstract(self) -> bool {
        self.data().is_abstract
    }

    #[must_use]
    pub fn annotations(self) -> &'a Annotations {
        &self.data().annotations
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    #[must_use]
    pub fn base_type(self) -> Option<EntityTypeRef<'a>> {
        self.data()
            .base_type
            .map(|id| EntityTypeRef::new(self.model, id))
    }

    /// Walk from this type up to the root, starting with `self`.
    pub fn base_chain(self) -> impl Iterator<Item = EntityTypeRef<'a>> {
        std::iter::successors(Some(self), |et| et.base_type())
    }

    /// Topmost type of the hierarchy (`self` if it has no base).
    #[must_use]
    pub fn root_type(self) -> EntityTypeRef<'a> {
        self.base_chain().last().unwrap_or(self)
    }

    /// Types that name this type as their direct base.
    pub fn direct_derived_types(self) -> impl Iterator<Item = EntityTypeRef<'a>> {
        let id = self.id;
        self.model
            .entity_types()
            .filter(move |et| et.data().base_type == Some(id))
    }

    /// Every type below this one, breadth first.
    pub fn all_derived_types(self) -> impl Iterator<Item = EntityTypeRef<'a>> {
        let mut found: Vec<EntityTypeRef<'a>> = self.direct_derived_types().collect();
        let mut next = 0;
        while next < found.len() {
            let current = found[next];
            found.extend(current.direct_derived_types());
            next += 1;
        }
        found.into_iter()
    }

    /// True if `other` is this type or derives from it.
    #[must_use]
    pub fn is_assignable_from(self, other: EntityTypeRef<'_>) -> bool {
        other.base_chain().any(|et| et.id == self.id)
    }

    /// True if both types belong to the same inheritance hierarchy.
    #[must_use]
    pub fn is_in_hierarchy_with(self, other: EntityTypeRef<'_>) -> bool {
        self.root_type().id == other.root_type().id
    }

    // ========================================================================
    // Properties and keys
    // ========================================================================

    /// Properties declared on this type only.
    pub fn declared_properties(self) -> impl Iterator<Item = PropertyRef<'a>> {
        let model = self.model;
        self.data()
            .properties
            .iter()
            .map(move |&p| PropertyRef::new(model, p))
    }

    /// Inherited and declared properties, root first.
    #[must_use]
    pub fn properties(self) -> Vec<PropertyRef<'a>> {
        let mut chain: Vec<_> = self.base_chain().collect();
        chain.reverse();
        chain
            .into_iter()
            .flat_map(EntityTypeRef::declared_properties)
            .collect()
    }

    #[must_use]
    pub fn find_declared_property(self, name: &str) -> Option<PropertyRef<'a>> {
        self.declared_properties().find(|p| p.name() == name)
    }

    /// Find a property declared here or on a base type.
    #[must_use]
    pub fn find_property(self, name: &str) -> Option<PropertyRef<'a>> {
        self.base_chain()
            .find_map(|et| et.find_declared_property(name))
    }

    /// Find a property, failing with [`Error::PropertyNotFound`].
    pub fn require_property(self, name: &str) -> Result<PropertyRef<'a>> {
        self.find_property(name).ok_or_else(|| Error::PropertyNotFound {
            property: name.to_string(),
            entity_type: self.display_name(),
        })
    }

    pub(crate) fn primary_key_ids(self) -> Option<&'a [PropertyId]> {
        self.root_type().data().primary_key.as_deref()
    }

    /// Primary key of the hierarchy, in key order.
    #[must_use]
    pub fn primary_key(self) -> Option<Vec<PropertyRef<'a>>> {
        let model = self.model;
        self.primary_key_ids()
            .map(|ids| ids.iter().map(|&p| PropertyRef::new(model, p)).collect())
    }

    // ========================================================================
    // Foreign keys
    // ========================================================================

    /// Foreign keys declared on this type only.
    pub fn declared_foreign_keys(self) -> impl Iterator<Item = ForeignKeyRef<'a>> {
        let model = self.model;
        self.data()
            .foreign_keys
            .iter()
            .map(move |&fk| model.foreign_key(fk))
    }

    /// Inherited and declared foreign keys.
    #[must_use]
    pub fn foreign_keys(self) -> Vec<ForeignKeyRef<'a>> {
        let mut chain: Vec<_> = self.base_chain().collect();
        chain.reverse();
        chain
            .into_iter()
            .flat_map(EntityTypeRef::declared_foreign_keys)
            .collect()
    }

    /// Foreign keys whose principal is this type or one of its bases.
    pub fn referencing_foreign_keys(self) -> impl Iterator<Item = ForeignKeyRef<'a>> {
        self.model
            .foreign_keys()
            .filter(move |fk| fk.principal_entity_type().is_assignable_from(self))
    }

    /// The ownership foreign key, if this type is owned.
    #[must_use]
    pub fn find_ownership(self) -> Option<ForeignKeyRef<'a>> {
        self.root_type()
            .declared_foreign_keys()
            .find(|fk| fk.is_ownership())
    }

    #[must_use]
    pub fn is_owned(self) -> bool {
        self.find_ownership().is_some()
    }

    // ========================================================================
    // Relational sub-objects
    // ========================================================================

    /// Check constraints declared on this type.
    pub fn declared_check_constraints(self) -> impl Iterator<Item = &'a CheckConstraint> {
        self.data().check_constraints.values()
    }

    /// Find a check constraint by model name on this type or a base type.
    #[must_use]
    pub fn find_check_constraint(self, name: &str) -> Option<&'a CheckConstraint> {
        self.base_chain()
            .find_map(|et| et.data().check_constraints.get(name))
    }

    pub fn declared_triggers(self) -> impl Iterator<Item = &'a Trigger> {
        self.data().triggers.values()
    }

    #[must_use]
    pub fn find_declared_trigger(self, name: &str) -> Option<&'a Trigger> {
        self.data().triggers.get(name)
    }

    /// The stored procedure configured for `kind`.
    #[must_use]
    pub fn stored_procedure(self, kind: StoreObjectType) -> Option<&'a StoredProcedure> {
        self.data().stored_procedures.get(&kind)
    }

    pub fn stored_procedures(self) -> impl Iterator<Item = &'a StoredProcedure> {
        self.data().stored_procedures.values()
    }

    /// Entity-splitting fragments, ordered by store object.
    pub fn mapping_fragments(self) -> impl Iterator<Item = &'a MappingFragment> {
        self.data().fragments.values()
    }

    #[must_use]
    pub fn find_mapping_fragment(
        self,
        store_object: &StoreObjectIdentifier,
    ) -> Option<&'a MappingFragment> {
        self.data().fragments.get(store_object)
    }
}

/// Write view of an entity type.
#[derive(Debug)]
pub struct EntityTypeMut<'a> {
    model: &'a mut Model,
    id: EntityTypeId,
}

impl<'a> EntityTypeMut<'a> {
    pub(crate) fn new(model: &'a mut Model, id: EntityTypeId) -> Self {
        Self { model, id }
    }

    fn data_mut(&mut self) -> &mut EntityTypeData {
        &mut self.model.entity_types[self.id.0]
    }

    #[must_use]
    pub const fn id(&self) -> EntityTypeId {
        self.id
    }

    /// Read view of the same entity type.
    #[must_use]
    pub fn as_ref(&self) -> EntityTypeRef<'_> {
        EntityTypeRef::new(self.model, self.id)
    }

    #[must_use]
    pub fn model(&self) -> &Model {
        self.model
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.data_mut().annotations
    }

    /// Add a check constraint; the name must be free in the whole hierarchy.
    pub fn add_check_constraint(
        &mut self,
        name: &str,
        sql: &str,
        source: ConfigurationSource,
    ) -> Result<&mut CheckConstraint> {
        identifiers::check_not_empty(name, "name")?;
        identifiers::check_not_empty(sql, "sql")?;
        let this = self.as_ref();
        let taken = this.find_check_constraint(name).is_some()
            || this
                .all_derived_types()
                .any(|d| d.data().check_constraints.contains_key(name));
        if taken {
            return Err(Error::DuplicateCheckConstraint {
                name: name.to_string(),
                entity_type: this.display_name(),
            });
        }
        tracing::trace!(entity_type = %this.display_name(), check_constraint = name, "Added check constraint");
        Ok(self
            .data_mut()
            .check_constraints
            .entry(name.to_string())
            .or_insert_with(|| CheckConstraint::new(name, sql, source)))
    }

    pub fn find_declared_check_constraint_mut(&mut self, name: &str) -> Option<&mut CheckConstraint> {
        self.data_mut().check_constraints.get_mut(name)
    }

    /// Remove a declared check constraint, returning it if it existed.
    pub fn remove_check_constraint(&mut self, name: &str) -> Option<CheckConstraint> {
        self.data_mut().check_constraints.remove(name)
    }

    pub fn add_trigger(&mut self, name: &str, source: ConfigurationSource) -> Result<&mut Trigger> {
        identifiers::check_not_empty(name, "name")?;
        if self.as_ref().find_declared_trigger(name).is_some() {
            return Err(Error::DuplicateTrigger {
                name: name.to_string(),
                entity_type: self.as_ref().display_name(),
            });
        }
        Ok(self
            .data_mut()
            .triggers
            .entry(name.to_string())
            .or_insert_with(|| Trigger::new(name, source)))
    }

    pub fn find_declared_trigger_mut(&mut self, name: &str) -> Option<&mut Trigger> {
        self.data_mut().triggers.get_mut(name)
    }

    pub fn remove_trigger(&mut self, name: &str) -> Option<Trigger> {
        self.data_mut().triggers.remove(name)
    }

    /// The stored procedure for `kind`, created on first use.
    pub fn stored_procedure_mut(
        &mut self,
        kind: StoreObjectType,
        source: ConfigurationSource,
    ) -> Result<&mut StoredProcedure> {
        let sproc = match self.data_mut().stored_procedures.entry(kind) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(StoredProcedure::new(kind, source)?),
        };
        sproc.update_configuration_source(source);
        Ok(sproc)
    }

    pub fn remove_stored_procedure(&mut self, kind: StoreObjectType) -> Option<StoredProcedure> {
        self.data_mut().stored_procedures.remove(&kind)
    }

    /// The mapping fragment for `store_object`, created on first use.
    pub fn mapping_fragment_mut(
        &mut self,
        store_object: &StoreObjectIdentifier,
        source: ConfigurationSource,
    ) -> &mut MappingFragment {
        let fragment = self
            .data_mut()
            .fragments
            .entry(store_object.clone())
            .or_insert_with(|| MappingFragment::new(store_object.clone(), source));
        fragment.update_configuration_source(source);
        fragment
    }

    pub fn remove_mapping_fragment(
        &mut self,
        store_object: &StoreObjectIdentifier,
    ) -> Option<MappingFragment> {
        self.data_mut().fragments.remove(store_object)
    }
}
