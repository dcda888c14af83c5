//! Fluent configuration for relmodel.
//!
//! [`ModelBuilder`] owns a [`relmodel_core::Model`] while it is being
//! configured and hands out builders that borrow it:
//!
//! - [`EntityTypeBuilder`] and [`TypedEntityTypeBuilder`] for entity types,
//!   [`OwnedNavigationBuilder`] for owned types. Their shared mapping surface
//!   is the [`EntityTypeMapping`] trait.
//! - [`PropertyBuilder`] for model-wide column facets and [`ColumnBuilder`]
//!   for facets scoped to one table, view or split table.
//! - Sub-builders passed to closures: [`TableBuilder`], [`ViewBuilder`],
//!   [`SplitTableBuilder`], [`StoredProcedureBuilder`], [`TriggerBuilder`]
//!   and [`CheckConstraintBuilder`].
//! - `Convention*Builder`s, whose mutators return `Ok(None)` instead of
//!   overwriting higher-precedence configuration.
//!
//! Every mutator returns `Result<&mut Self>`, so chains read
//! `builder.entity("Order")?.to_table("Orders")?.has_comment(Some("..."))?`.

pub mod convention;
pub mod entity;
pub mod model_builder;
pub mod property;
pub mod store_object;
pub mod stored_procedure;

pub use convention::{
    ConventionCheckConstraintBuilder, ConventionEntityTypeBuilder, ConventionPropertyBuilder,
};
pub use entity::{
    EntityTypeBuilder, EntityTypeMapping, OwnedNavigationBuilder, TypedEntityTypeBuilder,
};
pub use model_builder::ModelBuilder;
pub use property::{ColumnBuilder, PropertyBuilder};
pub use store_object::{
    CheckConstraintBuilder, SplitTableBuilder, TableBuilder, TriggerBuilder, ViewBuilder,
};
pub use stored_procedure::{
    StoredProcedureBuilder, StoredProcedureParameterBuilder, StoredProcedureResultColumnBuilder,
};
