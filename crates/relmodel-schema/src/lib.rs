//! Relational name resolution for relmodel.
//!
//! `relmodel-schema` answers "where does this live in the database?" for
//! every piece of the metadata graph in `relmodel-core`.
//!
//! # Role In The Architecture
//!
//! - **Read traits** (`RelationalEntityType`, `RelationalProperty`,
//!   `RelationalModel`) are implemented for the borrowed views and resolve
//!   table, view, column and stored procedure names from annotations,
//!   inheritance, ownership and configured defaults.
//! - **Write traits** (`RelationalEntityTypeMut`, `RelationalPropertyMut`, ...)
//!   expose a setter, a precedence-gated `try_` setter, a `can_` predicate and
//!   a configuration-source getter per facet.
//! - **Table sharing** (`sharing`) finds the root property that owns a
//!   column shared by several entity types, with bounded walks.
//!
//! `relmodel-builder` drives the write traits from fluent chains.

pub mod check_constraint;
pub mod entity_type;
pub mod facet;
pub mod mapping;
pub mod model;
pub mod property;
pub mod sharing;
pub mod stored_procedure;
pub mod trigger;

pub use check_constraint::{CheckConstraintMut, CheckConstraintRef};
pub use entity_type::{RelationalEntityType, RelationalEntityTypeMut, SQL_QUERY_NAME_SUFFIX};
pub use facet::{Annotatable, FacetValue};
pub use mapping::{MappingKind, MappingStrategy};
pub use model::{RelationalModel, RelationalModelMut};
pub use property::{OverridableProperty, RelationalProperty, RelationalPropertyMut};
pub use sharing::{
    MAX_ENTITY_TYPES_SHARING_TABLE, find_shared_object_root_primary_key_property,
    find_shared_store_object_root_property, is_optional_sharing_dependent,
};
pub use stored_procedure::{
    ORIGINAL_VALUE_SUFFIX, ROWS_AFFECTED_NAME, StoredProcedureBindingMut, StoredProcedureMut,
    StoredProcedureRef,
};
pub use trigger::{TriggerMut, TriggerRef};
