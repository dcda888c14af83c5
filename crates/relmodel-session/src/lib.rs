//! Database facade for relmodel.
//!
//! [`DatabaseFacade`] is the database-level surface of a context: migrations,
//! raw SQL, connection and transaction control and the command timeout. It
//! forwards to services the relational provider supplies through
//! [`DatabaseServices`]. Without them every operation fails with
//! [`relmodel_core::Error::RelationalNotInUse`].
//!
//! Async operations take a `&Cx` and return an [`asupersync::Outcome`], so
//! cancellation and panics surface alongside ordinary errors.
//!
//! # Example
//!
//! ```ignore
//! let mut facade = DatabaseFacade::new(services);
//! facade.open_connection(&cx).await?;
//! facade.begin_transaction(&cx, Some(IsolationLevel::Serializable)).await?;
//! let sql = InterpolatedSql::new()
//!     .sql("UPDATE Orders SET Total = ")
//!     .value(json!(10))
//!     .sql(" WHERE Id = ")
//!     .value(json!(7));
//! facade.execute_sql_interpolated(&cx, sql).await?;
//! facade.commit_transaction(&cx).await?;
//! ```

pub mod concurrency;
pub mod facade;
pub mod services;
pub mod sql;

pub use concurrency::{ConcurrencyDetector, CriticalSection};
pub use facade::{DatabaseFacade, FacadeConfig};
pub use services::{
    DatabaseServices, HistoryRepository, HistoryRow, IsolationLevel, MigrationsAssembly,
    Migrator, RelationalConnection, RelationalDatabaseCreator, TransactionInfo,
};
pub use sql::{
    DEFAULT_PARAMETER_MARKER, InterpolatedSql, ParameterValue, RawSqlCommand, SqlArgument,
    SqlParameter,
};
