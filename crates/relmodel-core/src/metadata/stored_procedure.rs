//! Insert/update/delete stored procedures bound to an entity type.

use serde::{Deserialize, Serialize};

use crate::annotations::{Annotations, ConfigurationSource};
use crate::error::{Error, Result};
use crate::store_object::StoreObjectType;

/// Direction of a stored-procedure parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
}

/// A parameter bound either to a property value or to the rows-affected count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProcedureParameter {
    property_name: Option<String>,
    direction: ParameterDirection,
    for_original_value: bool,
    annotations: Annotations,
}

impl StoredProcedureParameter {
    /// Property the parameter carries, `None` for the rows-affected parameter.
    #[must_use]
    pub fn property_name(&self) -> Option<&str> {
        self.property_name.as_deref()
    }

    #[must_use]
    pub const fn direction(&self) -> ParameterDirection {
        self.direction
    }

    pub fn set_direction(&mut self, direction: ParameterDirection) {
        self.direction = direction;
    }

    /// True if the parameter passes the value loaded from the database
    /// rather than the current value (used for concurrency checks).
    #[must_use]
    pub const fn is_for_original_value(&self) -> bool {
        self.for_original_value
    }

    #[must_use]
    pub const fn is_rows_affected(&self) -> bool {
        self.property_name.is_none()
    }

    #[must_use]
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}

/// A column of the result set the procedure returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProcedureResultColumn {
    property_name: Option<String>,
    annotations: Annotations,
}

impl StoredProcedureResultColumn {
    #[must_use]
    pub fn property_name(&self) -> Option<&str> {
        self.property_name.as_deref()
    }

    #[must_use]
    pub const fn is_rows_affected(&self) -> bool {
        self.property_name.is_none()
    }

    #[must_use]
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}

/// A stored procedure used to save one kind of change for an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProcedure {
    kind: StoreObjectType,
    annotations: Annotations,
    parameters: Vec<StoredProcedureParameter>,
    result_columns: Vec<StoredProcedureResultColumn>,
    rows_affected_returned: bool,
    source: ConfigurationSource,
}

impl StoredProcedure {
    /// Create an empty stored procedure of a stored-procedure `kind`.
    pub fn new(kind: StoreObjectType, source: ConfigurationSource) -> Result<Self> {
        if !kind.is_stored_procedure() {
            return Err(Error::invalid_argument(
                "kind",
                format!("'{kind}' is not a stored procedure kind"),
            ));
        }
        Ok(Self {
            kind,
            annotations: Annotations::new(),
            parameters: Vec::new(),
            result_columns: Vec::new(),
            rows_affected_returned: false,
            source,
        })
    }

    #[must_use]
    pub const fn kind(&self) -> StoreObjectType {
        self.kind
    }

    #[must_use]
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    #[must_use]
    pub const fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }

    pub fn update_configuration_source(&mut self, source: ConfigurationSource) {
        self.source = source.max(Some(self.source));
    }

    #[must_use]
    pub fn parameters(&self) -> &[StoredProcedureParameter] {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut [StoredProcedureParameter] {
        &mut self.parameters
    }

    #[must_use]
    pub fn result_columns(&self) -> &[StoredProcedureResultColumn] {
        &self.result_columns
    }

    pub fn result_columns_mut(&mut self) -> &mut [StoredProcedureResultColumn] {
        &mut self.result_columns
    }

    /// True if the rows-affected count is the procedure's return value.
    #[must_use]
    pub const fn are_rows_affected_returned(&self) -> bool {
        self.rows_affected_returned
    }

    fn has_rows_affected(&self) -> bool {
        self.rows_affected_returned
            || self.parameters.iter().any(StoredProcedureParameter::is_rows_affected)
            || self
                .result_columns
                .iter()
                .any(StoredProcedureResultColumn::is_rows_affected)
    }

    fn ensure_no_rows_affected(&self) -> Result<()> {
        if self.has_rows_affected() {
            return Err(Error::invalid_argument(
                "rows_affected",
                format!("the {} stored procedure already reports rows affected", self.kind),
            ));
        }
        Ok(())
    }

    /// Return the rows-affected count as the procedure's result.
    pub fn set_are_rows_affected_returned(&mut self, returned: bool) -> Result<()> {
        if returned && !self.rows_affected_returned {
            self.ensure_no_rows_affected()?;
        }
        self.rows_affected_returned = returned;
        Ok(())
    }

    #[must_use]
    pub fn find_parameter(&self, property_name: &str) -> Option<&StoredProcedureParameter> {
        self.parameters
            .iter()
            .find(|p| !p.for_original_value && p.property_name() == Some(property_name))
    }

    #[must_use]
    pub fn find_original_value_parameter(
        &self,
        property_name: &str,
    ) -> Option<&StoredProcedureParameter> {
        self.parameters
            .iter()
            .find(|p| p.for_original_value && p.property_name() == Some(property_name))
    }

    #[must_use]
    pub fn find_rows_affected_parameter(&self) -> Option<&StoredProcedureParameter> {
        self.parameters.iter().find(|p| p.is_rows_affected())
    }

    #[must_use]
    pub fn find_result_column(&self, property_name: &str) -> Option<&StoredProcedureResultColumn> {
        self.result_columns
            .iter()
            .find(|c| c.property_name() == Some(property_name))
    }

    fn push_parameter(
        &mut self,
        property_name: Option<String>,
        for_original_value: bool,
        direction: ParameterDirection,
    ) -> &mut StoredProcedureParameter {
        self.parameters.push(StoredProcedureParameter {
            property_name,
            direction,
            for_original_value,
            annotations: Annotations::new(),
        });
        let last = self.parameters.len() - 1;
        &mut self.parameters[last]
    }

    /// Add a parameter carrying the current value of a property.
    pub fn add_parameter(&mut self, property_name: &str) -> Result<&mut StoredProcedureParameter> {
        if self.find_parameter(property_name).is_some() {
            return Err(duplicate(self.kind, property_name));
        }
        Ok(self.push_parameter(Some(property_name.to_string()), false, ParameterDirection::Input))
    }

    /// Add a parameter carrying the original value of a property.
    pub fn add_original_value_parameter(
        &mut self,
        property_name: &str,
    ) -> Result<&mut StoredProcedureParameter> {
        if self.kind == StoreObjectType::InsertStoredProcedure {
            return Err(Error::invalid_argument(
                "property_name",
                "insert stored procedures have no original values",
            ));
        }
        if self.find_original_value_parameter(property_name).is_some() {
            return Err(duplicate(self.kind, property_name));
        }
        Ok(self.push_parameter(Some(property_name.to_string()), true, ParameterDirection::Input))
    }

    /// Add the output parameter receiving the rows-affected count.
    pub fn add_rows_affected_parameter(&mut self) -> Result<&mut StoredProcedureParameter> {
        self.ensure_no_rows_affected()?;
        Ok(self.push_parameter(None, false, ParameterDirection::Output))
    }

    /// Add a result column populating a store-generated property.
    pub fn add_result_column(&mut self, property_name: &str) -> Result<&mut StoredProcedureResultColumn> {
        if self.find_result_column(property_name).is_some() {
            return Err(duplicate(self.kind, property_name));
        }
        Ok(self.push_result_column(Some(property_name.to_string())))
    }

    /// Add the result column carrying the rows-affected count.
    pub fn add_rows_affected_result_column(&mut self) -> Result<&mut StoredProcedureResultColumn> {
        self.ensure_no_rows_affected()?;
        Ok(self.push_result_column(None))
    }

    fn push_result_column(&mut self, property_name: Option<String>) -> &mut StoredProcedureResultColumn {
        self.result_columns.push(StoredProcedureResultColumn {
            property_name,
            annotations: Annotations::new(),
        });
        let last = self.result_columns.len() - 1;
        &mut self.result_columns[last]
    }
}

fn duplicate(kind: StoreObjectType, property_name: &str) -> Error {
    Error::invalid_argument(
        "property_name",
        format!("the {kind} stored procedure already binds the property '{property_name}'"),
    )
}
