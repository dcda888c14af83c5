//! Inheritance mapping strategies and the kind of store object an entity
//! type is mapped to.

use std::fmt;
use std::str::FromStr;

use relmodel_core::{AnnotationValue, Error, Result};
use serde::{Deserialize, Serialize};

use crate::facet::FacetValue;

/// How an inheritance hierarchy is laid out in tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MappingStrategy {
    /// Table per hierarchy: one table with a discriminator.
    #[serde(rename = "TPH")]
    Tph,
    /// Table per type: one table per type, joined on the key.
    #[serde(rename = "TPT")]
    Tpt,
    /// Table per concrete type: every concrete type has a full table.
    #[serde(rename = "TPC")]
    Tpc,
}

impl MappingStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MappingStrategy::Tph => "TPH",
            MappingStrategy::Tpt => "TPT",
            MappingStrategy::Tpc => "TPC",
        }
    }
}

impl fmt::Display for MappingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TPH" => Ok(MappingStrategy::Tph),
            "TPT" => Ok(MappingStrategy::Tpt),
            "TPC" => Ok(MappingStrategy::Tpc),
            other => Err(Error::invalid_argument(
                "strategy",
                format!("unknown mapping strategy '{other}'"),
            )),
        }
    }
}

impl FacetValue for MappingStrategy {
    fn into_annotation(self, _argument: &'static str) -> Result<AnnotationValue> {
        Ok(AnnotationValue::Text(self.as_str().to_string()))
    }
}

/// What an entity type's rows are read from.
///
/// Function and SQL query mappings replace the table and view mappings;
/// a table and a view may both be configured (the view is used for
/// queries, the table for updates and migrations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    Function,
    SqlQuery,
    TableAndView,
    View,
    Table,
    Unmapped,
}

impl MappingKind {
    #[must_use]
    pub const fn has_table(self) -> bool {
        matches!(self, MappingKind::Table | MappingKind::TableAndView)
    }

    #[must_use]
    pub const fn has_view(self) -> bool {
        matches!(self, MappingKind::View | MappingKind::TableAndView)
    }
}
