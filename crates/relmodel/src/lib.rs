//! Relational mapping metadata for Rust.
//!
//! relmodel describes how entity types map onto a relational database:
//! tables, views, functions, SQL queries and stored procedures, the columns
//! of each property, check constraints and triggers, inheritance mapping
//! strategies and owned types. Configuration comes from conventions, data
//! annotations and explicit fluent calls, and a higher-precedence source is
//! never overwritten by a lower one.
//!
//! The umbrella crate re-exports the workspace:
//!
//! - [`core`]: annotations, store object identifiers and the metadata model
//! - [`schema`]: relational name resolution over the model
//! - [`builder`]: fluent configuration
//! - [`session`]: the async database facade
//!
//! # Example
//!
//! ```ignore
//! use relmodel::prelude::*;
//!
//! let mut builder = ModelBuilder::new();
//! builder.has_default_schema(Some("sales"))?;
//! builder
//!     .entity("Order")?
//!     .has_key(&["Id"])?
//!     .to_table("Orders")?
//!     .has_check_constraint("CK_Order_Total", Some("Total >= 0"))?;
//! let model = builder.finish();
//!
//! let order = model.require_entity_type("Order")?;
//! assert_eq!(order.table_name().as_deref(), Some("Orders"));
//! ```

pub use relmodel_builder as builder;
pub use relmodel_core as core;
pub use relmodel_schema as schema;
pub use relmodel_session as session;

pub use asupersync::{Cx, Outcome};
pub use relmodel_builder::ModelBuilder;
pub use relmodel_core::{Error, Model, Result};
pub use relmodel_session::DatabaseFacade;

/// Everything needed to configure and read a model.
pub mod prelude {
    pub use asupersync::{Cx, Outcome};
    pub use relmodel_builder::{
        CheckConstraintBuilder, ColumnBuilder, ConventionCheckConstraintBuilder,
        ConventionEntityTypeBuilder, ConventionPropertyBuilder, EntityTypeBuilder,
        EntityTypeMapping, ModelBuilder, OwnedNavigationBuilder, PropertyBuilder,
        SplitTableBuilder, StoredProcedureBuilder, TableBuilder, TriggerBuilder,
        TypedEntityTypeBuilder, ViewBuilder,
    };
    pub use relmodel_core::{
        AnnotationName, AnnotationValue, ConfigurationSource, Error, Model, RelationalOptions,
        Result, StoreObjectIdentifier, StoreObjectType,
    };
    pub use relmodel_schema::{
        CheckConstraintRef, MappingKind, MappingStrategy, OverridableProperty,
        RelationalEntityType, RelationalEntityTypeMut, RelationalModel, RelationalModelMut,
        RelationalProperty, RelationalPropertyMut, StoredProcedureRef, TriggerRef,
    };
    pub use relmodel_session::{
        DatabaseFacade, DatabaseServices, InterpolatedSql, IsolationLevel, SqlArgument,
        SqlParameter,
    };
}
