//! Entity type, typed entity type and owned navigation builders.
//!
//! The mapping surface shared by all three lives in [`EntityTypeMapping`]:
//! tables, views, functions, SQL queries, entity splitting, properties,
//! check constraints, stored procedures and owned types.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use relmodel_core::{
    ConfigurationSource, EntityTypeId, Error, ForeignKeySpec, Model, Result,
    StoreObjectIdentifier, StoreObjectType,
};
use relmodel_schema::{MappingStrategy, RelationalEntityType, RelationalEntityTypeMut};

use crate::property::PropertyBuilder;
use crate::store_object::{CheckConstraintBuilder, SplitTableBuilder, TableBuilder, ViewBuilder};
use crate::stored_procedure::{self, StoredProcedureBuilder};

/// Relational mapping operations available on every entity type builder.
pub trait EntityTypeMapping {
    fn model(&self) -> &Model;

    fn model_mut(&mut self) -> &mut Model;

    fn entity_type_id(&self) -> EntityTypeId;

    /// Map to the table `name` in the default schema.
    fn to_table(&mut self, name: &str) -> Result<&mut Self> {
        let id = self.entity_type_id();
        self.model_mut().entity_type_mut(id)?.set_table_name(Some(name))?;
        Ok(self)
    }

    /// Map to a table and configure it further.
    fn to_table_with<F>(&mut self, name: &str, schema: Option<&str>, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut TableBuilder<'_>) -> Result<()>,
    {
        let id = self.entity_type_id();
        let model = self.model_mut();
        {
            let mut entity_type = model.entity_type_mut(id)?;
            entity_type.set_table_name(Some(name))?;
            entity_type.set_schema(schema)?;
        }
        let store_object = StoreObjectIdentifier::table(name, model.entity_type(id).schema());
        build(&mut TableBuilder::new(model, id, store_object))?;
        Ok(self)
    }

    fn to_view(&mut self, name: &str) -> Result<&mut Self> {
        let id = self.entity_type_id();
        self.model_mut().entity_type_mut(id)?.set_view_name(Some(name))?;
        Ok(self)
    }

    fn to_view_with<F>(&mut self, name: &str, schema: Option<&str>, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut ViewBuilder<'_>) -> Result<()>,
    {
        let id = self.entity_type_id();
        let model = self.model_mut();
        {
            let mut entity_type = model.entity_type_mut(id)?;
            entity_type.set_view_name(Some(name))?;
            entity_type.set_view_schema(schema)?;
        }
        let store_object = StoreObjectIdentifier::view(name, model.entity_type(id).view_schema());
        build(&mut ViewBuilder::new(model, id, store_object))?;
        Ok(self)
    }

    /// Read rows from a table-valued database function.
    fn to_function(&mut self, name: &str) -> Result<&mut Self> {
        let id = self.entity_type_id();
        self.model_mut().entity_type_mut(id)?.set_function_name(Some(name))?;
        Ok(self)
    }

    /// Read rows from a raw SQL query.
    fn to_sql_query(&mut self, sql: &str) -> Result<&mut Self> {
        let id = self.entity_type_id();
        self.model_mut().entity_type_mut(id)?.set_sql_query(Some(sql))?;
        Ok(self)
    }

    /// Store some properties in an additional table sharing the key.
    fn split_to_table<F>(&mut self, name: &str, schema: Option<&str>, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut SplitTableBuilder<'_>) -> Result<()>,
    {
        relmodel_core::identifiers::check_not_empty(name, "name")?;
        let id = self.entity_type_id();
        let model = self.model_mut();
        let schema = schema
            .map(str::to_string)
            .or_else(|| model.default_schema().map(str::to_string));
        let store_object = StoreObjectIdentifier::table(name, schema);
        model
            .entity_type_mut(id)?
            .mapping_fragment_mut(&store_object, ConfigurationSource::Explicit);
        build(&mut SplitTableBuilder::new(model, id, store_object))?;
        Ok(self)
    }

    /// Configure the property `name`, declaring it if needed.
    fn property(&mut self, name: &str) -> Result<PropertyBuilder<'_>> {
        let id = self.entity_type_id();
        let model = self.model_mut();
        let existing = model.entity_type(id).find_property(name).map(|p| p.id());
        let property = match existing {
            Some(property) => property,
            None => model.add_property(id, name, true)?,
        };
        Ok(PropertyBuilder::new(model, property))
    }

    /// Add a check constraint, replace its SQL, or remove it with `None`.
    fn has_check_constraint(&mut self, name: &str, sql: Option<&str>) -> Result<&mut Self> {
        self.has_check_constraint_with(name, sql, |_| Ok(()))
    }

    fn has_check_constraint_with<F>(
        &mut self,
        name: &str,
        sql: Option<&str>,
        build: F,
    ) -> Result<&mut Self>
    where
        F: FnOnce(&mut CheckConstraintBuilder<'_>) -> Result<()>,
    {
        let id = self.entity_type_id();
        let model = self.model_mut();
        let mut entity_type = model.entity_type_mut(id)?;
        let Some(sql) = sql else {
            entity_type.remove_check_constraint(name);
            return Ok(self);
        };
        match entity_type.find_declared_check_constraint_mut(name) {
            Some(existing) if existing.sql() == sql => {
                existing.update_configuration_source(ConfigurationSource::Explicit);
            }
            Some(existing) => existing.set_sql(sql, ConfigurationSource::Explicit),
            None => {
                entity_type.add_check_constraint(name, sql, ConfigurationSource::Explicit)?;
            }
        }
        build(&mut CheckConstraintBuilder::new(model, id, name))?;
        Ok(self)
    }

    fn insert_using_stored_procedure<F>(&mut self, name: Option<&str>, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut StoredProcedureBuilder<'_>) -> Result<()>,
    {
        let id = self.entity_type_id();
        stored_procedure::configure(
            self.model_mut(),
            id,
            StoreObjectType::InsertStoredProcedure,
            name,
            build,
        )?;
        Ok(self)
    }

    fn update_using_stored_procedure<F>(&mut self, name: Option<&str>, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut StoredProcedureBuilder<'_>) -> Result<()>,
    {
        let id = self.entity_type_id();
        stored_procedure::configure(
            self.model_mut(),
            id,
            StoreObjectType::UpdateStoredProcedure,
            name,
            build,
        )?;
        Ok(self)
    }

    fn delete_using_stored_procedure<F>(&mut self, name: Option<&str>, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut StoredProcedureBuilder<'_>) -> Result<()>,
    {
        let id = self.entity_type_id();
        stored_procedure::configure(
            self.model_mut(),
            id,
            StoreObjectType::DeleteStoredProcedure,
            name,
            build,
        )?;
        Ok(self)
    }

    /// Own a single `target` reached through `navigation`. By default it
    /// shares the owner's table.
    fn owns_one<F>(&mut self, target: &str, navigation: &str, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut OwnedNavigationBuilder<'_>) -> Result<()>,
    {
        let owner = self.entity_type_id();
        let owned = add_owned(self.model_mut(), owner, target, navigation, true)?;
        build(&mut OwnedNavigationBuilder::new(
            self.model_mut(),
            owner,
            owned,
            navigation,
        ))?;
        Ok(self)
    }

    /// Own a collection of `target`. Each item gets its own row in a
    /// separate table keyed by the owner key and an `Id`.
    fn owns_many<F>(&mut self, target: &str, navigation: &str, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut OwnedNavigationBuilder<'_>) -> Result<()>,
    {
        let owner = self.entity_type_id();
        let owned = add_owned(self.model_mut(), owner, target, navigation, false)?;
        build(&mut OwnedNavigationBuilder::new(
            self.model_mut(),
            owner,
            owned,
            navigation,
        ))?;
        Ok(self)
    }

    fn has_comment(&mut self, comment: Option<&str>) -> Result<&mut Self> {
        let id = self.entity_type_id();
        self.model_mut().entity_type_mut(id)?.set_comment(comment)?;
        Ok(self)
    }

    fn exclude_from_migrations(&mut self, excluded: bool) -> Result<&mut Self> {
        let id = self.entity_type_id();
        self.model_mut()
            .entity_type_mut(id)?
            .set_is_table_excluded_from_migrations(Some(excluded))?;
        Ok(self)
    }
}

/// Declare the owned entity type `{Owner}.{navigation}#{target}`, keyed by
/// a copy of the owner's key, or reuse it if it already exists.
fn add_owned(
    model: &mut Model,
    owner: EntityTypeId,
    target: &str,
    navigation: &str,
    unique: bool,
) -> Result<EntityTypeId> {
    relmodel_core::identifiers::check_not_empty(navigation, "navigation")?;
    let owner_ref = model.entity_type(owner);
    let name = format!("{}.{navigation}#{target}", owner_ref.name());
    if let Some(existing) = model.find_entity_type(&name) {
        return Ok(existing.id());
    }

    let owner_key: Vec<String> = owner_ref
        .primary_key()
        .ok_or_else(|| Error::InvalidForeignKey {
            reason: format!(
                "'{}' must have a key before it can own '{target}' through '{navigation}'",
                owner_ref.display_name()
            ),
        })?
        .iter()
        .map(|p| format!("{}{}", owner_ref.short_name(), p.name()))
        .collect();

    let owned = model.add_shared_type_entity_type(&name)?;
    let mut foreign_key = Vec::with_capacity(owner_key.len());
    for property in &owner_key {
        foreign_key.push(model.add_property(owned, property, false)?);
    }
    let mut key = foreign_key.clone();
    if !unique {
        key.push(model.add_property(owned, "Id", false)?);
    }
    model.set_primary_key(owned, &key)?;
    model.add_foreign_key(
        ForeignKeySpec::new(owned, foreign_key, owner)
            .unique(unique)
            .ownership(navigation),
    )?;
    tracing::debug!(owned = %name, unique, "Added owned entity type");
    Ok(owned)
}

/// Configures an entity type by name.
#[derive(Debug)]
pub struct EntityTypeBuilder<'a> {
    model: &'a mut Model,
    id: EntityTypeId,
}

impl<'a> EntityTypeBuilder<'a> {
    pub(crate) fn new(model: &'a mut Model, id: EntityTypeId) -> Self {
        Self { model, id }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.model.entity_type(self.id).name()
    }

    fn use_mapping_strategy(&mut self, strategy: MappingStrategy) -> Result<&mut Self> {
        self.model
            .entity_type_mut(self.id)?
            .set_mapping_strategy(Some(strategy))?;
        Ok(self)
    }

    /// One table for the whole hierarchy, with a discriminator.
    pub fn use_tph_mapping_strategy(&mut self) -> Result<&mut Self> {
        self.use_mapping_strategy(MappingStrategy::Tph)
    }

    /// One table per type, joined on the key.
    pub fn use_tpt_mapping_strategy(&mut self) -> Result<&mut Self> {
        self.use_mapping_strategy(MappingStrategy::Tpt)
    }

    /// One complete table per concrete type.
    pub fn use_tpc_mapping_strategy(&mut self) -> Result<&mut Self> {
        self.use_mapping_strategy(MappingStrategy::Tpc)
    }

    /// Derive from the entity type `base`, or stop deriving with `None`.
    pub fn has_base_type(&mut self, base: Option<&str>) -> Result<&mut Self> {
        let base = match base {
            Some(name) => Some(self.model.require_entity_type(name)?.id()),
            None => None,
        };
        self.model.set_base_type(self.id, base)?;
        Ok(self)
    }

    /// Use the named properties as primary key, declaring missing ones.
    pub fn has_key(&mut self, properties: &[&str]) -> Result<&mut Self> {
        let mut key = Vec::with_capacity(properties.len());
        for name in properties {
            let existing = self
                .model
                .entity_type(self.id)
                .find_property(name)
                .map(|p| p.id());
            key.push(match existing {
                Some(id) => id,
                None => self.model.add_property(self.id, name, false)?,
            });
        }
        self.model.set_primary_key(self.id, &key)?;
        Ok(self)
    }

    pub fn is_abstract(&mut self, is_abstract: bool) -> Result<&mut Self> {
        self.model.set_abstract(self.id, is_abstract)?;
        Ok(self)
    }
}

impl EntityTypeMapping for EntityTypeBuilder<'_> {
    fn model(&self) -> &Model {
        &*self.model
    }

    fn model_mut(&mut self) -> &mut Model {
        &mut *self.model
    }

    fn entity_type_id(&self) -> EntityTypeId {
        self.id
    }
}

/// Configures the entity type of the Rust type `T`.
#[derive(Debug)]
pub struct TypedEntityTypeBuilder<'a, T: ?Sized> {
    inner: EntityTypeBuilder<'a>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: ?Sized> TypedEntityTypeBuilder<'a, T> {
    pub(crate) fn new(model: &'a mut Model, id: EntityTypeId) -> Self {
        Self {
            inner: EntityTypeBuilder::new(model, id),
            _marker: PhantomData,
        }
    }

    /// Derive from the entity type of `B`, declaring it if needed.
    pub fn has_base<B: ?Sized>(&mut self) -> Result<&mut Self> {
        let model = &mut *self.inner.model;
        let base = match model.find_entity_type(std::any::type_name::<B>()) {
            Some(base) => base.id(),
            None => model.add_entity_type_for::<B>()?,
        };
        model.set_base_type(self.inner.id, Some(base))?;
        Ok(self)
    }
}

impl<'a, T: ?Sized> Deref for TypedEntityTypeBuilder<'a, T> {
    type Target = EntityTypeBuilder<'a>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T: ?Sized> DerefMut for TypedEntityTypeBuilder<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<T: ?Sized> EntityTypeMapping for TypedEntityTypeBuilder<'_, T> {
    fn model(&self) -> &Model {
        &*self.inner.model
    }

    fn model_mut(&mut self) -> &mut Model {
        &mut *self.inner.model
    }

    fn entity_type_id(&self) -> EntityTypeId {
        self.inner.id
    }
}

/// Configures an owned entity type from its owner.
#[derive(Debug)]
pub struct OwnedNavigationBuilder<'a> {
    model: &'a mut Model,
    owner: EntityTypeId,
    id: EntityTypeId,
    navigation: String,
}

impl<'a> OwnedNavigationBuilder<'a> {
    fn new(model: &'a mut Model, owner: EntityTypeId, id: EntityTypeId, navigation: &str) -> Self {
        Self {
            model,
            owner,
            id,
            navigation: navigation.to_string(),
        }
    }

    #[must_use]
    pub const fn owner_id(&self) -> EntityTypeId {
        self.owner
    }

    #[must_use]
    pub fn navigation(&self) -> &str {
        &self.navigation
    }

    /// Store the owned data as a JSON document in one column of the owner's
    /// table; the column defaults to the navigation name.
    pub fn to_json(&mut self, column: Option<&str>) -> Result<&mut Self> {
        let column = column.unwrap_or(&self.navigation).to_string();
        self.model
            .entity_type_mut(self.id)?
            .set_container_column_name(Some(&column))?;
        Ok(self)
    }

    /// Key of the owned object inside its parent JSON document.
    pub fn has_json_property_name(&mut self, name: Option<&str>) -> Result<&mut Self> {
        self.model
            .entity_type_mut(self.id)?
            .set_json_property_name(name)?;
        Ok(self)
    }
}

impl EntityTypeMapping for OwnedNavigationBuilder<'_> {
    fn model(&self) -> &Model {
        &*self.model
    }

    fn model_mut(&mut self) -> &mut Model {
        &mut *self.model
    }

    fn entity_type_id(&self) -> EntityTypeId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelBuilder;
    use relmodel_core::StoreObjectIdentifier;
    use relmodel_schema::{CheckConstraintRef, MappingKind, RelationalProperty};

    #[test]
    fn test_table_view_and_defaults() {
        let mut builder = ModelBuilder::new();
        builder
            .entity("Order")
            .unwrap()
            .to_table("Orders")
            .unwrap()
            .to_view("OrdersView")
            .unwrap();
        let model = builder.finish();
        let order = model.require_entity_type("Order").unwrap();
        assert_eq!(order.table_name().as_deref(), Some("Orders"));
        assert_eq!(order.view_name().as_deref(), Some("OrdersView"));
        assert_eq!(order.default_table_name().as_deref(), Some("Order"));
        assert_eq!(order.mapping_kind(), MappingKind::TableAndView);
    }

    #[test]
    fn test_function_and_query_mappings() {
        let mut builder = ModelBuilder::new();
        builder.entity("Report").unwrap().to_function("GetReports").unwrap();
        builder
            .entity("Summary")
            .unwrap()
            .to_sql_query("SELECT * FROM Summaries")
            .unwrap();
        let model = builder.finish();
        let report = model.require_entity_type("Report").unwrap();
        assert_eq!(report.table_name(), None);
        assert_eq!(report.mapping_kind(), MappingKind::Function);
        let summary = model.require_entity_type("Summary").unwrap();
        assert_eq!(summary.mapping_kind(), MappingKind::SqlQuery);
        assert_eq!(summary.default_sql_query_name(), "Summary.MappedSqlQuery");
    }

    #[test]
    fn test_empty_table_name_rejected() {
        let mut builder = ModelBuilder::new();
        let err = builder.entity("Order").unwrap().to_table("").unwrap_err();
        assert!(err.is_argument_error());
    }

    #[test]
    fn test_check_constraint_lifecycle() {
        let mut builder = ModelBuilder::new();
        let mut product = builder.entity("Product").unwrap();
        product
            .has_check_constraint("CK_Price", Some("Price > 0"))
            .unwrap()
            .has_check_constraint("CK_Price", Some("Price >= 0"))
            .unwrap();
        assert_eq!(
            product
                .model()
                .require_entity_type("Product")
                .unwrap()
                .find_check_constraint("CK_Price")
                .unwrap()
                .sql(),
            "Price >= 0"
        );
        product.has_check_constraint("CK_Price", None).unwrap();
        product.has_check_constraint("CK_Price", None).unwrap();
        let model = builder.finish();
        let product = model.require_entity_type("Product").unwrap();
        assert!(CheckConstraintRef::find(product, "CK_Price").is_none());
    }

    #[test]
    fn test_check_constraint_name_taken_by_base() {
        let mut builder = ModelBuilder::new();
        builder
            .entity("Animal")
            .unwrap()
            .has_check_constraint("CK_Legs", Some("Legs >= 0"))
            .unwrap();
        let err = builder
            .entity("Dog")
            .unwrap()
            .has_base_type(Some("Animal"))
            .unwrap()
            .has_check_constraint("CK_Legs", Some("Legs = 4"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateCheckConstraint { .. }));
    }

    #[test]
    fn test_owns_one_shares_owner_table() {
        let mut builder = ModelBuilder::new();
        builder
            .entity("Order")
            .unwrap()
            .has_key(&["Id"])
            .unwrap()
            .to_table("Orders")
            .unwrap()
            .owns_one("Address", "ShippingAddress", |address| {
                address.property("Street")?;
                Ok(())
            })
            .unwrap();
        let model = builder.finish();

        let owned = model
            .require_entity_type("Order.ShippingAddress#Address")
            .unwrap();
        assert!(owned.is_owned());
        assert_eq!(owned.table_name().as_deref(), Some("Orders"));
        let street = owned.require_property("Street").unwrap();
        assert_eq!(street.column_name().as_deref(), Some("ShippingAddress_Street"));
        let key = owned.require_property("OrderId").unwrap();
        let orders = StoreObjectIdentifier::table("Orders", None);
        assert_eq!(key.column_name_in(&orders).as_deref(), Some("Id"));
    }

    #[test]
    fn test_owns_many_gets_own_table() {
        let mut builder = ModelBuilder::new();
        builder
            .entity("Order")
            .unwrap()
            .has_key(&["Id"])
            .unwrap()
            .to_table("Orders")
            .unwrap()
            .owns_many("OrderLine", "Lines", |_| Ok(()))
            .unwrap();
        let model = builder.finish();

        let lines = model.require_entity_type("Order.Lines#OrderLine").unwrap();
        assert_eq!(lines.table_name().as_deref(), Some("Orders_Lines"));
        let key: Vec<&str> = lines
            .primary_key()
            .unwrap()
            .into_iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(key, vec!["OrderId", "Id"]);
    }

    #[test]
    fn test_owner_without_key_rejected() {
        let mut builder = ModelBuilder::new();
        let err = builder
            .entity("Order")
            .unwrap()
            .owns_one("Address", "ShippingAddress", |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidForeignKey { .. }));
    }

    #[test]
    fn test_owned_json_column() {
        let mut builder = ModelBuilder::new();
        builder
            .entity("Customer")
            .unwrap()
            .has_key(&["Id"])
            .unwrap()
            .owns_one("Profile", "Details", |details| {
                details.to_json(None)?;
                details.property("Bio")?.has_json_property_name(Some("bio"))?;
                Ok(())
            })
            .unwrap();
        let model = builder.finish();
        let details = model.require_entity_type("Customer.Details#Profile").unwrap();
        assert!(details.is_mapped_to_json());
        assert_eq!(details.container_column_name(), Some("Details"));
        let bio = details.require_property("Bio").unwrap();
        assert_eq!(bio.column_name(), None);
        assert_eq!(bio.json_property_name(), Some("bio"));
    }

    #[test]
    fn test_typed_builder() {
        struct Animal;
        struct Dog;

        let mut builder = ModelBuilder::new();
        builder
            .entity_for::<Animal>()
            .unwrap()
            .has_key(&["Id"])
            .unwrap()
            .use_tpt_mapping_strategy()
            .unwrap();
        let mut dog = builder.entity_for::<Dog>().unwrap();
        dog.has_base::<Animal>().unwrap();
        dog.to_table("Dogs").unwrap();
        let model = builder.finish();

        let dog = model.require_entity_type(std::any::type_name::<Dog>()).unwrap();
        assert_eq!(dog.short_name(), "Dog");
        assert_eq!(
            dog.base_type().map(|b| b.short_name()),
            Some("Animal")
        );
        assert_eq!(dog.table_name().as_deref(), Some("Dogs"));
        assert!(!dog.is_tph_derived());
    }
}
