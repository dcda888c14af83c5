//! Error types for relmodel.
//!
//! Configuration-time failures (bad arguments, structural mistakes in the
//! metadata graph) and the facade's runtime failures share one enum so every
//! crate in the workspace can propagate with `?`.
//!
//! Precedence conflicts are deliberately absent: a convention-stage write
//! that loses to a higher configuration source is reported through
//! [`SetOutcome`](crate::annotations::SetOutcome), not as an error.

use thiserror::Error;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Message used when a relational-only operation is invoked without a
/// relational provider.
pub const RELATIONAL_NOT_IN_USE: &str = "Relational-specific methods can only be used when the context is using a relational database provider.";

/// The error type for metadata configuration and facade operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An argument failed validation (empty name, blank SQL, ...).
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        argument: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A property was resolved against a store object it is not mapped to.
    #[error(
        "the property '{entity_type}.{property}' is not mapped to the table '{store_object}'"
    )]
    PropertyNotMappedToTable {
        property: String,
        entity_type: String,
        store_object: String,
    },

    /// A check constraint with the same name already exists on the entity type.
    #[error(
        "the check constraint '{name}' cannot be added to the entity type '{entity_type}' because another check constraint with the same name already exists"
    )]
    DuplicateCheckConstraint { name: String, entity_type: String },

    /// A trigger with the same name already exists on the entity type.
    #[error(
        "the trigger '{name}' cannot be added to the entity type '{entity_type}' because another trigger with the same name already exists"
    )]
    DuplicateTrigger { name: String, entity_type: String },

    /// An entity type with the same name already exists in the model.
    #[error("the entity type '{name}' has already been added to the model")]
    DuplicateEntityType { name: String },

    /// A property with the same name is already declared in the hierarchy.
    #[error("the property '{property}' has already been added to the entity type '{entity_type}'")]
    DuplicateProperty {
        property: String,
        entity_type: String,
    },

    /// No entity type with the given name exists.
    #[error("the entity type '{name}' was not found in the model")]
    EntityTypeNotFound { name: String },

    /// No property with the given name exists on the entity type or its bases.
    #[error("the property '{property}' was not found on the entity type '{entity_type}'")]
    PropertyNotFound {
        property: String,
        entity_type: String,
    },

    /// Stored procedures cannot be configured on abstract types mapped with TPC.
    #[error(
        "the stored procedure '{store_object}' cannot be configured for '{entity_type}' because the entity type is abstract and uses the TPC mapping strategy"
    )]
    AbstractTpc {
        entity_type: String,
        store_object: String,
    },

    /// Setting the base type would introduce a cycle in the hierarchy.
    #[error(
        "the entity type '{base_type}' cannot be the base type of '{entity_type}' because it would create a cycle in the inheritance hierarchy"
    )]
    CircularInheritance {
        entity_type: String,
        base_type: String,
    },

    /// A foreign key definition is structurally invalid.
    #[error("invalid foreign key: {reason}")]
    InvalidForeignKey { reason: String },

    /// The model was finalized and can no longer be mutated.
    #[error("the model is read-only; it was finalized and cannot be configured further")]
    ModelReadOnly,

    /// A relational service was requested from a non-relational provider.
    #[error("{}", RELATIONAL_NOT_IN_USE)]
    RelationalNotInUse,

    /// The same context was entered concurrently from two call sites.
    #[error(
        "a second operation was started on this context instance before a previous operation completed"
    )]
    ConcurrentMethodInvocation,

    /// The command timeout is negative.
    #[error("the specified command timeout value {seconds} is not valid; timeout values must be positive")]
    TimeoutTooSmall { seconds: i64 },

    /// The command timeout does not fit the provider's range.
    #[error(
        "the specified command timeout value {seconds} is not valid; it must be less than or equal to {}",
        i32::MAX
    )]
    TimeoutTooBig { seconds: u64 },

    /// A transaction operation was issued with no active transaction.
    #[error("no transaction is in progress")]
    NoActiveTransaction,

    /// A collaborator service failed.
    #[error("{service} failed: {message}")]
    Service {
        service: &'static str,
        message: String,
    },
}

impl Error {
    /// Build an [`Error::InvalidArgument`].
    pub fn invalid_argument(argument: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }

    /// Build an [`Error::Service`].
    pub fn service(service: &'static str, message: impl Into<String>) -> Self {
        Error::Service {
            service,
            message: message.into(),
        }
    }

    /// True for validation failures raised at the point of a fluent call.
    #[must_use]
    pub const fn is_argument_error(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. })
    }
}
