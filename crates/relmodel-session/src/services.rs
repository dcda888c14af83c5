//! Services a relational provider supplies to the facade.
//!
//! The facade never talks to a database itself. Providers implement these
//! traits and hand them out through [`DatabaseServices`]; a provider that is
//! not relational returns `None`, and the facade reports
//! [`relmodel_core::Error::RelationalNotInUse`].

use std::fmt;
use std::future::Future;

use asupersync::{Cx, Outcome};
use relmodel_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::sql::RawSqlCommand;

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Snapshot,
    Serializable,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Snapshot => "SNAPSHOT",
            IsolationLevel::Serializable => "SERIALIZABLE",
        };
        f.write_str(s)
    }
}

/// The transaction a connection is enlisted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInfo {
    pub id: u64,
    /// `None` when the provider's default applies.
    pub isolation_level: Option<IsolationLevel>,
}

/// One row of the migrations history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub migration_id: String,
    pub product_version: String,
}

impl HistoryRow {
    pub fn new(migration_id: impl Into<String>, product_version: impl Into<String>) -> Self {
        Self {
            migration_id: migration_id.into(),
            product_version: product_version.into(),
        }
    }
}

/// The migrations compiled into the application.
pub trait MigrationsAssembly {
    /// Migration identifiers in the order they apply.
    fn migrations(&self) -> Vec<String>;
}

/// Reads the migrations history table.
pub trait HistoryRepository {
    fn applied_migrations(
        &mut self,
        cx: &Cx,
    ) -> impl Future<Output = Outcome<Vec<HistoryRow>, Error>> + Send;
}

/// Applies migrations to the database.
pub trait Migrator {
    /// Migrate to `target`, or to the latest migration when `None`.
    fn migrate(
        &mut self,
        cx: &Cx,
        target: Option<&str>,
    ) -> impl Future<Output = Outcome<(), Error>> + Send;
}

/// Creates and describes databases.
pub trait RelationalDatabaseCreator {
    /// DDL creating the schema for the current model.
    fn generate_create_script(&self) -> Result<String>;
}

/// A database connection with transaction and timeout state.
pub trait RelationalConnection {
    /// Open the connection. Returns `false` when it was already open.
    fn open(&mut self, cx: &Cx) -> impl Future<Output = Outcome<bool, Error>> + Send;

    /// Close the connection. Returns `false` when it was already closed.
    fn close(&mut self, cx: &Cx) -> impl Future<Output = Outcome<bool, Error>> + Send;

    /// Run a command and return the number of rows affected.
    fn execute_non_query(
        &mut self,
        cx: &Cx,
        command: &RawSqlCommand,
        timeout: Option<u32>,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;

    fn begin_transaction(
        &mut self,
        cx: &Cx,
        isolation_level: Option<IsolationLevel>,
    ) -> impl Future<Output = Outcome<TransactionInfo, Error>> + Send;

    fn commit_transaction(&mut self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;

    fn rollback_transaction(&mut self, cx: &Cx)
    -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Enlist an externally created transaction, or clear the current one
    /// with `None`. Returns the transaction now in use.
    fn use_transaction(
        &mut self,
        cx: &Cx,
        transaction: Option<TransactionInfo>,
    ) -> impl Future<Output = Outcome<Option<TransactionInfo>, Error>> + Send;

    fn current_transaction(&self) -> Option<TransactionInfo>;

    /// Command timeout in seconds.
    fn command_timeout(&self) -> Option<u32>;

    fn set_command_timeout(&mut self, seconds: Option<u32>);
}

/// The services of one context.
///
/// Every accessor returns `None` when the provider is not relational.
pub trait DatabaseServices {
    type Assembly: MigrationsAssembly;
    type History: HistoryRepository;
    type Migrator: Migrator;
    type Creator: RelationalDatabaseCreator;
    type Connection: RelationalConnection;

    fn migrations_assembly(&self) -> Option<&Self::Assembly>;

    fn history_repository(&mut self) -> Option<&mut Self::History>;

    fn migrator(&mut self) -> Option<&mut Self::Migrator>;

    fn database_creator(&self) -> Option<&Self::Creator>;

    fn connection(&self) -> Option<&Self::Connection>;

    fn connection_mut(&mut self) -> Option<&mut Self::Connection>;

    /// True when the provider is relational.
    fn is_relational(&self) -> bool {
        self.connection().is_some()
    }
}
