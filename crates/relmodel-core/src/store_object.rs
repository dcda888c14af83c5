//! Identity of database-side objects an entity type can be mapped to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of store object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StoreObjectType {
    Table,
    View,
    Function,
    SqlQuery,
    InsertStoredProcedure,
    UpdateStoredProcedure,
    DeleteStoredProcedure,
}

impl StoreObjectType {
    /// True for the three stored-procedure kinds.
    #[must_use]
    pub const fn is_stored_procedure(self) -> bool {
        matches!(
            self,
            Self::InsertStoredProcedure | Self::UpdateStoredProcedure | Self::DeleteStoredProcedure
        )
    }

    /// Whether objects of this kind carry a schema.
    #[must_use]
    pub const fn has_schema(self) -> bool {
        !matches!(self, Self::Function | Self::SqlQuery)
    }

    /// Suffix used when deriving stored-procedure names (`Orders_Insert`).
    #[must_use]
    pub const fn operation_name(self) -> Option<&'static str> {
        match self {
            Self::InsertStoredProcedure => Some("Insert"),
            Self::UpdateStoredProcedure => Some("Update"),
            Self::DeleteStoredProcedure => Some("Delete"),
            _ => None,
        }
    }
}

impl fmt::Display for StoreObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Table => "Table",
            Self::View => "View",
            Self::Function => "Function",
            Self::SqlQuery => "SqlQuery",
            Self::InsertStoredProcedure => "InsertStoredProcedure",
            Self::UpdateStoredProcedure => "UpdateStoredProcedure",
            Self::DeleteStoredProcedure => "DeleteStoredProcedure",
        };
        f.write_str(s)
    }
}

/// Structural identity of a table, view, function, SQL query or stored
/// procedure. Used as a map key for per-object property overrides.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StoreObjectIdentifier {
    kind: StoreObjectType,
    name: String,
    schema: Option<String>,
}

impl StoreObjectIdentifier {
    /// Build an identifier of any kind. The schema is dropped for kinds
    /// that have none.
    pub fn new(kind: StoreObjectType, name: impl Into<String>, schema: Option<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            schema: if kind.has_schema() { schema } else { None },
        }
    }

    pub fn table(name: impl Into<String>, schema: Option<String>) -> Self {
        Self::new(StoreObjectType::Table, name, schema)
    }

    pub fn view(name: impl Into<String>, schema: Option<String>) -> Self {
        Self::new(StoreObjectType::View, name, schema)
    }

    pub fn db_function(name: impl Into<String>) -> Self {
        Self::new(StoreObjectType::Function, name, None)
    }

    pub fn sql_query(name: impl Into<String>) -> Self {
        Self::new(StoreObjectType::SqlQuery, name, None)
    }

    pub fn insert_stored_procedure(name: impl Into<String>, schema: Option<String>) -> Self {
        Self::new(StoreObjectType::InsertStoredProcedure, name, schema)
    }

    pub fn update_stored_procedure(name: impl Into<String>, schema: Option<String>) -> Self {
        Self::new(StoreObjectType::UpdateStoredProcedure, name, schema)
    }

    pub fn delete_stored_procedure(name: impl Into<String>, schema: Option<String>) -> Self {
        Self::new(StoreObjectType::DeleteStoredProcedure, name, schema)
    }

    #[must_use]
    pub const fn kind(&self) -> StoreObjectType {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// `schema.name`, or just `name` without a schema.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for StoreObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}
