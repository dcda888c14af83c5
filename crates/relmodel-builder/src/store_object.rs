//! Sub-builders scoped to one table, view or split table of an entity type.
//!
//! They are handed to the closures of `to_table_with`, `to_view_with` and
//! `split_to_table`, and to the callbacks configuring triggers and check
//! constraints.

use relmodel_core::{
    AnnotationName, CheckConstraint, ConfigurationSource, EntityTypeId, Error, Model, Result,
    StoreObjectIdentifier, Trigger,
};
use relmodel_schema::facet::set_facet;
use relmodel_schema::{CheckConstraintMut, RelationalEntityType, RelationalEntityTypeMut, TriggerMut};

use crate::property::ColumnBuilder;

fn column<'m>(
    model: &'m mut Model,
    entity: EntityTypeId,
    store_object: &StoreObjectIdentifier,
    property: &str,
) -> Result<ColumnBuilder<'m>> {
    let id = model.entity_type(entity).require_property(property)?.id();
    ColumnBuilder::open(model, id, store_object.clone())
}

/// Configures the table an entity type is mapped to.
#[derive(Debug)]
pub struct TableBuilder<'a> {
    model: &'a mut Model,
    entity: EntityTypeId,
    store_object: StoreObjectIdentifier,
}

impl<'a> TableBuilder<'a> {
    pub(crate) fn new(
        model: &'a mut Model,
        entity: EntityTypeId,
        store_object: StoreObjectIdentifier,
    ) -> Self {
        Self {
            model,
            entity,
            store_object,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.store_object.name()
    }

    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.store_object.schema()
    }

    #[must_use]
    pub fn store_object(&self) -> &StoreObjectIdentifier {
        &self.store_object
    }

    /// Keep the table out of generated migrations.
    pub fn exclude_from_migrations(&mut self, excluded: bool) -> Result<&mut Self> {
        self.model
            .entity_type_mut(self.entity)?
            .set_is_table_excluded_from_migrations(Some(excluded))?;
        Ok(self)
    }

    pub fn has_comment(&mut self, comment: Option<&str>) -> Result<&mut Self> {
        self.model.entity_type_mut(self.entity)?.set_comment(comment)?;
        Ok(self)
    }

    /// Column of `property` in this table.
    pub fn property(&mut self, property: &str) -> Result<ColumnBuilder<'_>> {
        column(self.model, self.entity, &self.store_object, property)
    }

    /// Declare a trigger on this table, or reopen an existing one.
    pub fn has_trigger(&mut self, model_name: &str) -> Result<TriggerBuilder<'_>> {
        let entity_table = self.model.entity_type(self.entity).table_name();
        let mut entity_type = self.model.entity_type_mut(self.entity)?;
        if entity_type.as_ref().find_declared_trigger(model_name).is_none() {
            let trigger = entity_type.add_trigger(model_name, ConfigurationSource::Explicit)?;
            if entity_table.as_deref() != Some(self.store_object.name()) {
                trigger.set_table_name(Some(self.store_object.name()))?;
                trigger.set_table_schema(self.store_object.schema())?;
            }
        }
        Ok(TriggerBuilder {
            model: &mut *self.model,
            entity: self.entity,
            model_name: model_name.to_string(),
        })
    }
}

/// Configures the view an entity type is read from.
#[derive(Debug)]
pub struct ViewBuilder<'a> {
    model: &'a mut Model,
    entity: EntityTypeId,
    store_object: StoreObjectIdentifier,
}

impl<'a> ViewBuilder<'a> {
    pub(crate) fn new(
        model: &'a mut Model,
        entity: EntityTypeId,
        store_object: StoreObjectIdentifier,
    ) -> Self {
        Self {
            model,
            entity,
            store_object,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.store_object.name()
    }

    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.store_object.schema()
    }

    pub fn property(&mut self, property: &str) -> Result<ColumnBuilder<'_>> {
        column(self.model, self.entity, &self.store_object, property)
    }
}

/// Configures one extra table of an entity split across several tables.
///
/// Only properties opened with [`SplitTableBuilder::property`] are stored
/// in the split table; the rest stay in the main table.
#[derive(Debug)]
pub struct SplitTableBuilder<'a> {
    model: &'a mut Model,
    entity: EntityTypeId,
    store_object: StoreObjectIdentifier,
}

impl<'a> SplitTableBuilder<'a> {
    pub(crate) fn new(
        model: &'a mut Model,
        entity: EntityTypeId,
        store_object: StoreObjectIdentifier,
    ) -> Self {
        Self {
            model,
            entity,
            store_object,
        }
    }

    #[must_use]
    pub fn store_object(&self) -> &StoreObjectIdentifier {
        &self.store_object
    }

    pub fn property(&mut self, property: &str) -> Result<ColumnBuilder<'_>> {
        column(self.model, self.entity, &self.store_object, property)
    }

    pub fn exclude_from_migrations(&mut self, excluded: bool) -> Result<&mut Self> {
        let store_object = self.store_object.clone();
        let mut entity_type = self.model.entity_type_mut(self.entity)?;
        let fragment = entity_type.mapping_fragment_mut(&store_object, ConfigurationSource::Explicit);
        set_facet(
            fragment.annotations_mut(),
            AnnotationName::IsTableExcludedFromMigrations,
            Some(excluded),
            "excluded",
        )?;
        Ok(self)
    }
}

/// Configures a trigger declared on an entity type.
#[derive(Debug)]
pub struct TriggerBuilder<'a> {
    model: &'a mut Model,
    entity: EntityTypeId,
    model_name: String,
}

impl TriggerBuilder<'_> {
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn with_trigger<R>(&mut self, f: impl FnOnce(&mut Trigger) -> Result<R>) -> Result<R> {
        let mut entity_type = self.model.entity_type_mut(self.entity)?;
        let trigger = entity_type
            .find_declared_trigger_mut(&self.model_name)
            .ok_or_else(|| {
                Error::invalid_argument("trigger", format!("'{}' was removed", self.model_name))
            })?;
        f(trigger)
    }

    /// Name of the trigger in the database.
    pub fn has_database_name(&mut self, name: Option<&str>) -> Result<&mut Self> {
        self.with_trigger(|trigger| trigger.set_name(name))?;
        Ok(self)
    }
}

/// Configures a check constraint declared on an entity type.
#[derive(Debug)]
pub struct CheckConstraintBuilder<'a> {
    model: &'a mut Model,
    entity: EntityTypeId,
    model_name: String,
}

impl<'a> CheckConstraintBuilder<'a> {
    pub(crate) fn new(model: &'a mut Model, entity: EntityTypeId, model_name: &str) -> Self {
        Self {
            model,
            entity,
            model_name: model_name.to_string(),
        }
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

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

    /// Name of the constraint in the database.
    pub fn has_name(&mut self, name: Option<&str>) -> Result<&mut Self> {
        self.with_constraint(|constraint| constraint.set_name(name))?;
        Ok(self)
    }
}
