//! Core types for relmodel.
//!
//! This crate holds the pieces every other relmodel crate builds on:
//!
//! - [`Annotations`] with [`ConfigurationSource`] precedence
//! - [`StoreObjectIdentifier`] naming tables, views, functions, SQL queries
//!   and stored procedures
//! - the arena-backed metadata graph ([`Model`], entity types, properties,
//!   foreign keys and their relational sub-objects)
//! - identifier truncation and uniquification
//! - [`RelationalOptions`] and the shared [`Error`] type
//!
//! Relational name resolution lives in `relmodel-schema`; fluent
//! configuration lives in `relmodel-builder`.

pub mod annotations;
pub mod error;
pub mod identifiers;
pub mod metadata;
pub mod options;
pub mod store_object;

pub use annotations::{
    Annotation, AnnotationName, AnnotationValue, Annotations, ConfigurationSource, JsonDocument,
    SetOutcome,
};
pub use error::{Error, RELATIONAL_NOT_IN_USE, Result};
pub use identifiers::DEFAULT_MAX_IDENTIFIER_LENGTH;
pub use metadata::{
    CheckConstraint, EntityTypeId, EntityTypeMut, EntityTypeRef, ForeignKeyId, ForeignKeyRef,
    ForeignKeySpec, MappingFragment, Model, ParameterDirection, PropertyId, PropertyMut,
    PropertyOverrides, PropertyRef, StoredProcedure, StoredProcedureParameter,
    StoredProcedureResultColumn, Trigger,
};
pub use options::RelationalOptions;
pub use store_object::{StoreObjectIdentifier, StoreObjectType};
