//! Foreign keys, including ownership relationships.

use super::entity_type::EntityTypeRef;
use super::model::Model;
use super::property::PropertyRef;
use super::{EntityTypeId, ForeignKeyId, PropertyId};

#[derive(Debug, Clone)]
pub(crate) struct ForeignKeyData {
    pub(crate) declaring: EntityTypeId,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) principal: EntityTypeId,
    pub(crate) principal_key: Vec<PropertyId>,
    pub(crate) is_unique: bool,
    pub(crate) is_required: bool,
    pub(crate) is_required_dependent: bool,
    pub(crate) is_ownership: bool,
    pub(crate) dependent_to_principal: Option<String>,
    pub(crate) principal_to_dependent: Option<String>,
}

/// Definition of a foreign key passed to [`Model::add_foreign_key`].
///
/// ```ignore
/// let spec = ForeignKeySpec::new(order_details, vec![details_id], order)
///     .unique(true)
///     .required(true);
/// model.add_foreign_key(spec)?;
/// ```
#[derive(Debug, Clone)]
pub struct ForeignKeySpec {
    pub dependent: EntityTypeId,
    pub properties: Vec<PropertyId>,
    pub principal: EntityTypeId,
    /// Principal properties referenced; `None` means the principal's primary key.
    pub principal_key: Option<Vec<PropertyId>>,
    pub is_unique: bool,
    pub is_required: bool,
    pub is_required_dependent: bool,
    pub is_ownership: bool,
    pub dependent_to_principal: Option<String>,
    pub principal_to_dependent: Option<String>,
}

impl ForeignKeySpec {
    /// A non-unique, optional foreign key with no navigations.
    #[must_use]
    pub fn new(dependent: EntityTypeId, properties: Vec<PropertyId>, principal: EntityTypeId) -> Self {
        Self {
            dependent,
            properties,
            principal,
            principal_key: None,
            is_unique: false,
            is_required: false,
            is_required_dependent: false,
            is_ownership: false,
            dependent_to_principal: None,
            principal_to_dependent: None,
        }
    }

    #[must_use]
    pub fn principal_key(mut self, key: Vec<PropertyId>) -> Self {
        self.principal_key = Some(key);
        self
    }

    #[must_use]
    pub fn unique(mut self, unique: bool) -> Self {
        self.is_unique = unique;
        self
    }

    /// Whether the dependent always needs a principal.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.is_required = required;
        self
    }

    /// Whether the principal always has a dependent (one-to-one only).
    #[must_use]
    pub fn required_dependent(mut self, required_dependent: bool) -> Self {
        self.is_required_dependent = required_dependent;
        self
    }

    /// Mark the foreign key as the dependent's ownership, reached from the
    /// owner through `navigation`.
    #[must_use]
    pub fn ownership(mut self, navigation: impl Into<String>) -> Self {
        self.is_ownership = true;
        self.is_required = true;
        self.principal_to_dependent = Some(navigation.into());
        self
    }

    #[must_use]
    pub fn dependent_to_principal(mut self, navigation: impl Into<String>) -> Self {
        self.dependent_to_principal = Some(navigation.into());
        self
    }

    #[must_use]
    pub fn principal_to_dependent(mut self, navigation: impl Into<String>) -> Self {
        self.principal_to_dependent = Some(navigation.into());
        self
    }
}

/// Read view of a foreign key.
#[derive(Debug, Clone, Copy)]
pub struct ForeignKeyRef<'a> {
    model: &'a Model,
    id: ForeignKeyId,
}

impl<'a> ForeignKeyRef<'a> {
    pub(crate) fn new(model: &'a Model, id: ForeignKeyId) -> Self {
        Self { model, id }
    }

    fn data(self) -> &'a ForeignKeyData {
        &self.model.foreign_keys[self.id.0]
    }

    #[must_use]
    pub const fn id(self) -> ForeignKeyId {
        self.id
    }

    /// The dependent entity type, which declares the foreign key.
    #[must_use]
    pub fn declaring_entity_type(self) -> EntityTypeRef<'a> {
        EntityTypeRef::new(self.model, self.data().declaring)
    }

    #[must_use]
    pub fn principal_entity_type(self) -> EntityTypeRef<'a> {
        EntityTypeRef::new(self.model, self.data().principal)
    }

    pub(crate) fn property_ids(self) -> &'a [PropertyId] {
        &self.data().properties
    }

    /// Dependent-side properties, in key order.
    #[must_use]
    pub fn properties(self) -> Vec<PropertyRef<'a>> {
        self.data()
            .properties
            .iter()
            .map(|&p| PropertyRef::new(self.model, p))
            .collect()
    }

    /// Referenced principal-side properties, in key order.
    #[must_use]
    pub fn principal_key(self) -> Vec<PropertyRef<'a>> {
        self.data()
            .principal_key
            .iter()
            .map(|&p| PropertyRef::new(self.model, p))
            .collect()
    }

    /// True if the referenced key is the principal hierarchy's primary key.
    #[must_use]
    pub fn principal_key_is_primary(self) -> bool {
        self.principal_entity_type()
            .root_type()
            .primary_key_ids()
            .is_some_and(|pk| pk == self.data().principal_key.as_slice())
    }

    #[must_use]
    pub fn is_unique(self) -> bool {
        self.data().is_unique
    }

    #[must_use]
    pub fn is_required(self) -> bool {
        self.data().is_required
    }

    #[must_use]
    pub fn is_required_dependent(self) -> bool {
        self.data().is_required_dependent
    }

    #[must_use]
    pub fn is_ownership(self) -> bool {
        self.data().is_ownership
    }

    #[must_use]
    pub fn dependent_to_principal(self) -> Option<&'a str> {
        self.data().dependent_to_principal.as_deref()
    }

    #[must_use]
    pub fn principal_to_dependent(self) -> Option<&'a str> {
        self.data().principal_to_dependent.as_deref()
    }
}

impl PartialEq for ForeignKeyRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.model, other.model) && self.id == other.id
    }
}

impl Eq for ForeignKeyRef<'_> {}
