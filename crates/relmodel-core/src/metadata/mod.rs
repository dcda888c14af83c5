//! The metadata graph: a model of entity types, their properties and the
//! foreign keys between them, plus the relational sub-objects each entity
//! type owns.
//!
//! The graph is arena-backed. Elements are addressed by typed ids and read
//! through borrowed views (`EntityTypeRef`, `PropertyRef`, `ForeignKeyRef`);
//! writes go through `EntityTypeMut` / `PropertyMut`, which can only be
//! obtained while the model is still mutable.

pub mod check_constraint;
pub mod entity_type;
pub mod foreign_key;
pub mod fragment;
pub mod model;
pub mod property;
pub mod stored_procedure;
pub mod trigger;

use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) usize);

        impl $name {
            /// Position of the element in its arena.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

arena_id!(
    /// Identifies an entity type within its model.
    EntityTypeId
);
arena_id!(
    /// Identifies a property within its model.
    PropertyId
);
arena_id!(
    /// Identifies a foreign key within its model.
    ForeignKeyId
);

pub use check_constraint::CheckConstraint;
pub use entity_type::{EntityTypeMut, EntityTypeRef};
pub use foreign_key::{ForeignKeyRef, ForeignKeySpec};
pub use fragment::MappingFragment;
pub use model::Model;
pub use property::{PropertyMut, PropertyOverrides, PropertyRef};
pub use stored_procedure::{
    ParameterDirection, StoredProcedure, StoredProcedureParameter, StoredProcedureResultColumn,
};
pub use trigger::Trigger;
