//! Insert, update and delete stored procedure configuration.

use relmodel_core::{
    ConfigurationSource, EntityTypeId, Error, Model, ParameterDirection, Result, StoreObjectType,
    StoredProcedure, StoredProcedureParameter, StoredProcedureResultColumn,
};
use relmodel_schema::{
    MappingStrategy, RelationalEntityType, StoredProcedureBindingMut, StoredProcedureMut,
};

/// Map the `kind` operation of `entity` to a stored procedure and run
/// `build` against it.
pub(crate) fn configure<F>(
    model: &mut Model,
    entity: EntityTypeId,
    kind: StoreObjectType,
    name: Option<&str>,
    build: F,
) -> Result<()>
where
    F: FnOnce(&mut StoredProcedureBuilder<'_>) -> Result<()>,
{
    let entity_type = model.entity_type(entity);
    if entity_type.is_abstract() && entity_type.mapping_strategy() == Some(MappingStrategy::Tpc) {
        return Err(Error::AbstractTpc {
            entity_type: entity_type.display_name(),
            store_object: name.map_or_else(|| kind.to_string(), str::to_string),
        });
    }

    let mut entity_type = model.entity_type_mut(entity)?;
    let procedure = entity_type.stored_procedure_mut(kind, ConfigurationSource::Explicit)?;
    if name.is_some() {
        procedure.set_name(name)?;
    }
    tracing::debug!(
        entity_type = %model.entity_type(entity).display_name(),
        kind = %kind,
        "Mapped stored procedure"
    );

    let mut builder = StoredProcedureBuilder {
        model,
        entity,
        kind,
    };
    build(&mut builder)
}

/// Configures one stored procedure of an entity type.
///
/// ```ignore
/// order.update_using_stored_procedure(Some("Order_Update"), |sp| {
///     sp.has_original_value_parameter("Id")?
///         .has_parameter("Total")?
///         .has_rows_affected_return_value(true)?;
///     Ok(())
/// })?;
/// ```
#[derive(Debug)]
pub struct StoredProcedureBuilder<'a> {
    model: &'a mut Model,
    entity: EntityTypeId,
    kind: StoreObjectType,
}

impl StoredProcedureBuilder<'_> {
    #[must_use]
    pub const fn kind(&self) -> StoreObjectType {
        self.kind
    }

    fn with_procedure<R>(&mut self, f: impl FnOnce(&mut StoredProcedure) -> Result<R>) -> Result<R> {
        let kind = self.kind;
        let mut entity_type = self.model.entity_type_mut(self.entity)?;
        f(entity_type.stored_procedure_mut(kind, ConfigurationSource::Explicit)?)
    }

    fn require_property(&self, property: &str) -> Result<()> {
        self.model.entity_type(self.entity).require_property(property)?;
        Ok(())
    }

    pub fn has_name(&mut self, name: Option<&str>) -> Result<&mut Self> {
        self.with_procedure(|procedure| procedure.set_name(name))?;
        Ok(self)
    }

    pub fn has_schema(&mut self, schema: Option<&str>) -> Result<&mut Self> {
        self.with_procedure(|procedure| procedure.set_schema(schema))?;
        Ok(self)
    }

    /// Pass the current value of `property`.
    pub fn has_parameter(&mut self, property: &str) -> Result<&mut Self> {
        self.has_parameter_with(property, |_| Ok(()))
    }

    pub fn has_parameter_with<F>(&mut self, property: &str, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut StoredProcedureParameterBuilder<'_>) -> Result<()>,
    {
        self.require_property(property)?;
        self.with_procedure(|procedure| {
            let parameter = procedure.add_parameter(property)?;
            build(&mut StoredProcedureParameterBuilder { parameter })
        })?;
        Ok(self)
    }

    /// Pass the value `property` had when it was loaded.
    pub fn has_original_value_parameter(&mut self, property: &str) -> Result<&mut Self> {
        self.has_original_value_parameter_with(property, |_| Ok(()))
    }

    pub fn has_original_value_parameter_with<F>(
        &mut self,
        property: &str,
        build: F,
    ) -> Result<&mut Self>
    where
        F: FnOnce(&mut StoredProcedureParameterBuilder<'_>) -> Result<()>,
    {
        self.require_property(property)?;
        self.with_procedure(|procedure| {
            let parameter = procedure.add_original_value_parameter(property)?;
            build(&mut StoredProcedureParameterBuilder { parameter })
        })?;
        Ok(self)
    }

    /// Output parameter receiving the number of rows affected.
    pub fn has_rows_affected_parameter(&mut self, name: Option<&str>) -> Result<&mut Self> {
        self.with_procedure(|procedure| procedure.add_rows_affected_parameter()?.set_name(name))?;
        Ok(self)
    }

    /// Result column read back into a store-generated `property`.
    pub fn has_result_column(&mut self, property: &str) -> Result<&mut Self> {
        self.has_result_column_with(property, |_| Ok(()))
    }

    pub fn has_result_column_with<F>(&mut self, property: &str, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut StoredProcedureResultColumnBuilder<'_>) -> Result<()>,
    {
        self.require_property(property)?;
        self.with_procedure(|procedure| {
            let column = procedure.add_result_column(property)?;
            build(&mut StoredProcedureResultColumnBuilder { column })
        })?;
        Ok(self)
    }

    pub fn has_rows_affected_result_column(&mut self, name: Option<&str>) -> Result<&mut Self> {
        self.with_procedure(|procedure| {
            procedure.add_rows_affected_result_column()?.set_name(name)
        })?;
        Ok(self)
    }

    /// Read the rows-affected count from the procedure's return value.
    pub fn has_rows_affected_return_value(&mut self, returned: bool) -> Result<&mut Self> {
        self.with_procedure(|procedure| procedure.set_are_rows_affected_returned(returned))?;
        Ok(self)
    }
}

#[derive(Debug)]
pub struct StoredProcedureParameterBuilder<'a> {
    parameter: &'a mut StoredProcedureParameter,
}

impl StoredProcedureParameterBuilder<'_> {
    pub fn has_name(&mut self, name: Option<&str>) -> Result<&mut Self> {
        self.parameter.set_name(name)?;
        Ok(self)
    }

    pub fn is_output(&mut self) -> &mut Self {
        self.parameter.set_direction(ParameterDirection::Output);
        self
    }

    pub fn is_input_output(&mut self) -> &mut Self {
        self.parameter.set_direction(ParameterDirection::InputOutput);
        self
    }
}

#[derive(Debug)]
pub struct StoredProcedureResultColumnBuilder<'a> {
    column: &'a mut StoredProcedureResultColumn,
}

impl StoredProcedureResultColumnBuilder<'_> {
    pub fn has_name(&mut self, name: Option<&str>) -> Result<&mut Self> {
        self.column.set_name(name)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::{EntityTypeMapping, ModelBuilder};
    use relmodel_core::{Error, ParameterDirection, StoreObjectIdentifier, StoreObjectType};
    use relmodel_schema::{RelationalEntityType, RelationalProperty, StoredProcedureRef};

    fn order_builder() -> ModelBuilder {
        let mut builder = ModelBuilder::new();
        let mut order = builder.entity("Order").unwrap();
        order.has_key(&["Id"]).unwrap();
        order.property("Total").unwrap();
        order.property("Version").unwrap();
        order.to_table("Orders").unwrap();
        builder
    }

    #[test]
    fn test_insert_procedure_defaults() {
        let mut builder = order_builder();
        builder
            .entity("Order")
            .unwrap()
            .insert_using_stored_procedure(None, |sp| {
                sp.has_parameter("Total")?
                    .has_result_column_with("Id", |c| {
                        c.has_name(Some("NewId"))?;
                        Ok(())
                    })?;
                Ok(())
            })
            .unwrap();
        let model = builder.finish();

        let order = model.require_entity_type("Order").unwrap();
        let insert =
            StoredProcedureRef::find(order, StoreObjectType::InsertStoredProcedure).unwrap();
        assert_eq!(insert.name().as_deref(), Some("Orders_Insert"));
        assert_eq!(insert.result_column_names(), vec!["NewId".to_string()]);

        let store_object = order
            .store_object(StoreObjectType::InsertStoredProcedure)
            .unwrap();
        assert_eq!(
            store_object,
            StoreObjectIdentifier::insert_stored_procedure("Orders_Insert", None)
        );
        assert!(order.require_property("Total").unwrap().is_mapped_to(&store_object));
        assert!(!order.require_property("Version").unwrap().is_mapped_to(&store_object));
    }

    #[test]
    fn test_update_procedure_parameters() {
        let mut builder = order_builder();
        builder
            .entity("Order")
            .unwrap()
            .update_using_stored_procedure(Some("Order_Update"), |sp| {
                sp.has_schema(Some("sales"))?
                    .has_original_value_parameter("Id")?
                    .has_parameter_with("Version", |p| {
                        p.is_input_output();
                        Ok(())
                    })?
                    .has_rows_affected_parameter(None)?;
                Ok(())
            })
            .unwrap();
        let model = builder.finish();

        let order = model.require_entity_type("Order").unwrap();
        let update =
            StoredProcedureRef::find(order, StoreObjectType::UpdateStoredProcedure).unwrap();
        assert_eq!(update.name().as_deref(), Some("Order_Update"));
        assert_eq!(update.schema().as_deref(), Some("sales"));
        assert_eq!(
            update.parameter_names(),
            vec![
                "Id_Original".to_string(),
                "Version".to_string(),
                "RowsAffected".to_string()
            ]
        );
        assert_eq!(
            update
                .procedure()
                .find_parameter("Version")
                .unwrap()
                .direction(),
            ParameterDirection::InputOutput
        );
    }

    #[test]
    fn test_rows_affected_reported_once() {
        let mut builder = order_builder();
        let err = builder
            .entity("Order")
            .unwrap()
            .delete_using_stored_procedure(None, |sp| {
                sp.has_rows_affected_return_value(true)?
                    .has_rows_affected_result_column(None)?;
                Ok(())
            })
            .unwrap_err();
        assert!(err.is_argument_error());
    }

    #[test]
    fn test_unknown_property_rejected() {
        let mut builder = order_builder();
        let err = builder
            .entity("Order")
            .unwrap()
            .insert_using_stored_procedure(None, |sp| {
                sp.has_parameter("Missing")?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, Error::PropertyNotFound { .. }));
    }

    #[test]
    fn test_abstract_tpc_rejected() {
        let mut builder = ModelBuilder::new();
        let err = builder
            .entity("Animal")
            .unwrap()
            .is_abstract(true)
            .unwrap()
            .use_tpc_mapping_strategy()
            .unwrap()
            .insert_using_stored_procedure(None, |_| Ok(()))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AbstractTpc { ref store_object, .. } if *store_object == StoreObjectType::InsertStoredProcedure.to_string()
        ));

        let err = builder
            .entity("Animal")
            .unwrap()
            .delete_using_stored_procedure(Some("Animal_Remove"), |_| Ok(()))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AbstractTpc { ref store_object, .. } if store_object == "Animal_Remove"
        ));
    }
}
