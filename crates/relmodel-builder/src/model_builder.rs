//! The entry point of fluent configuration.

use relmodel_core::{Error, Model, RelationalOptions, Result};
use relmodel_schema::RelationalModelMut;

use crate::convention::ConventionEntityTypeBuilder;
use crate::entity::{EntityTypeBuilder, TypedEntityTypeBuilder};

/// Builds a [`Model`] through fluent calls.
///
/// # Example
///
/// ```ignore
/// let mut builder = ModelBuilder::new();
/// builder.has_default_schema(Some("sales"))?;
/// builder
///     .entity("Order")?
///     .has_key(&["Id"])?
///     .to_table("Orders")?
///     .has_check_constraint("CK_Total", Some("Total >= 0"))?;
/// let model = builder.finish();
/// ```
#[derive(Debug, Default)]
pub struct ModelBuilder {
    model: Model,
}

impl ModelBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the provider options, recorded as conventions.
    #[must_use]
    pub fn with_options(options: &RelationalOptions) -> Self {
        Self {
            model: Model::with_options(options),
        }
    }

    /// Continue configuring an existing model.
    #[must_use]
    pub fn from_model(model: Model) -> Self {
        Self { model }
    }

    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Configure the entity type `name`, declaring it if needed.
    pub fn entity(&mut self, name: &str) -> Result<EntityTypeBuilder<'_>> {
        let id = match self.model.find_entity_type(name) {
            Some(existing) => existing.id(),
            None => self.model.add_entity_type(name)?,
        };
        Ok(EntityTypeBuilder::new(&mut self.model, id))
    }

    /// Configure the entity type of `T`, named by its full type path.
    pub fn entity_for<T: ?Sized>(&mut self) -> Result<TypedEntityTypeBuilder<'_, T>> {
        let id = match self.model.find_entity_type(std::any::type_name::<T>()) {
            Some(existing) => existing.id(),
            None => self.model.add_entity_type_for::<T>()?,
        };
        Ok(TypedEntityTypeBuilder::new(&mut self.model, id))
    }

    /// Configure a shared-type entity type such as a property bag.
    pub fn shared_type_entity(&mut self, name: &str) -> Result<EntityTypeBuilder<'_>> {
        let id = match self.model.find_entity_type(name) {
            Some(existing) if existing.has_shared_clr_type() => existing.id(),
            Some(existing) => {
                return Err(Error::invalid_argument(
                    "name",
                    format!("'{}' is not a shared-type entity type", existing.display_name()),
                ));
            }
            None => self.model.add_shared_type_entity_type(name)?,
        };
        Ok(EntityTypeBuilder::new(&mut self.model, id))
    }

    /// Convention-stage access to an existing entity type.
    pub fn convention_entity(
        &mut self,
        name: &str,
        from_data_annotation: bool,
    ) -> Result<ConventionEntityTypeBuilder<'_>> {
        let id = self.model.require_entity_type(name)?.id();
        Ok(ConventionEntityTypeBuilder::new(
            &mut self.model,
            id,
            from_data_annotation,
        ))
    }

    pub fn has_default_schema(&mut self, schema: Option<&str>) -> Result<&mut Self> {
        self.model.set_default_schema(schema)?;
        Ok(self)
    }

    /// Bound the length of generated identifiers.
    pub fn has_max_identifier_length(&mut self, length: usize) -> Result<&mut Self> {
        if length == 0 {
            return Err(Error::invalid_argument(
                "length",
                "the maximum identifier length must be positive",
            ));
        }
        self.model.set_max_identifier_length(Some(length))?;
        Ok(self)
    }

    /// Freeze the model and hand it out.
    #[must_use]
    pub fn finish(mut self) -> Model {
        self.model.finalize();
        self.model
    }
}
