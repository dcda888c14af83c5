//! Database-level operations of a context.

use std::collections::HashSet;
use std::time::Duration;

use asupersync::{Cx, Outcome};
use relmodel_core::{Error, RelationalOptions, Result};

use crate::concurrency::ConcurrencyDetector;
use crate::services::{
    DatabaseServices, HistoryRepository, IsolationLevel, MigrationsAssembly, Migrator,
    RelationalConnection, RelationalDatabaseCreator, TransactionInfo,
};
use crate::sql::{DEFAULT_PARAMETER_MARKER, InterpolatedSql, RawSqlCommand, SqlArgument};

// ============================================================================
// Facade Configuration
// ============================================================================

/// Configuration for [`DatabaseFacade`] behavior.
#[derive(Debug, Clone)]
pub struct FacadeConfig {
    /// Marker placed before parameter names in raw SQL.
    pub parameter_marker: String,
    /// Whether to log the SQL of raw commands at debug level.
    pub log_sql: bool,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            parameter_marker: DEFAULT_PARAMETER_MARKER.to_string(),
            log_sql: false,
        }
    }
}

// ============================================================================
// Facade
// ============================================================================

/// Migrations, raw SQL, connection and transaction control for one context.
///
/// # Example
///
/// ```ignore
/// let mut facade = DatabaseFacade::new(services);
/// for id in facade.get_pending_migrations(&cx).await? {
///     tracing::info!(%id, "Pending migration");
/// }
/// facade.migrate(&cx, None).await?;
/// facade.set_command_timeout(Some(30))?;
/// let rows = facade
///     .execute_sql_raw(&cx, "DELETE FROM Orders WHERE Total < {0}", vec![SqlArgument::value(0)])
///     .await?;
/// ```
#[derive(Debug)]
pub struct DatabaseFacade<S: DatabaseServices> {
    services: S,
    detector: ConcurrencyDetector,
    config: FacadeConfig,
}

impl<S: DatabaseServices> DatabaseFacade<S> {
    pub fn new(services: S) -> Self {
        Self::with_config(services, FacadeConfig::default())
    }

    pub fn with_config(services: S, config: FacadeConfig) -> Self {
        Self {
            services,
            detector: ConcurrencyDetector::new(),
            config,
        }
    }

    /// Share an existing detector, such as the one of the owning context.
    #[must_use]
    pub fn with_concurrency_detector(mut self, detector: ConcurrencyDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn services(&self) -> &S {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut S {
        &mut self.services
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    pub fn concurrency_detector(&self) -> &ConcurrencyDetector {
        &self.detector
    }

    pub fn is_relational(&self) -> bool {
        self.services.is_relational()
    }

    /// Apply provider options. Only the command timeout concerns the facade.
    pub fn apply_options(&mut self, options: &RelationalOptions) -> Result<()> {
        if let Some(seconds) = options.command_timeout_secs {
            let seconds = checked_timeout(seconds)?;
            self.services
                .connection_mut()
                .ok_or(Error::RelationalNotInUse)?
                .set_command_timeout(Some(seconds));
        }
        Ok(())
    }

    /// The underlying database connection.
    pub fn db_connection(&self) -> Result<&S::Connection> {
        self.services.connection().ok_or(Error::RelationalNotInUse)
    }

    pub fn db_connection_mut(&mut self) -> Result<&mut S::Connection> {
        self.services.connection_mut().ok_or(Error::RelationalNotInUse)
    }

    // ========================================================================
    // Migrations
    // ========================================================================

    /// All migrations defined in the application, in apply order.
    pub fn get_migrations(&self) -> Result<Vec<String>> {
        let assembly = self
            .services
            .migrations_assembly()
            .ok_or(Error::RelationalNotInUse)?;
        Ok(assembly.migrations())
    }

    /// Migrations recorded in the history table.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn get_applied_migrations(&mut self, cx: &Cx) -> Outcome<Vec<String>, Error> {
        let Some(history) = self.services.history_repository() else {
            return Outcome::Err(Error::RelationalNotInUse);
        };
        match history.applied_migrations(cx).await {
            Outcome::Ok(rows) => Outcome::Ok(rows.into_iter().map(|row| row.migration_id).collect()),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Migrations defined in the application but not yet applied.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn get_pending_migrations(&mut self, cx: &Cx) -> Outcome<Vec<String>, Error> {
        let defined = match self.get_migrations() {
            Ok(defined) => defined,
            Err(e) => return Outcome::Err(e),
        };
        let applied: HashSet<String> = match self.get_applied_migrations(cx).await {
            Outcome::Ok(applied) => applied.into_iter().collect(),
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        let mut seen = HashSet::new();
        let pending: Vec<String> = defined
            .into_iter()
            .filter(|id| !applied.contains(id) && seen.insert(id.clone()))
            .collect();
        tracing::debug!(pending = pending.len(), "Computed pending migrations");
        Outcome::Ok(pending)
    }

    /// Apply pending migrations, up to `target` when given.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn migrate(&mut self, cx: &Cx, target: Option<&str>) -> Outcome<(), Error> {
        let Some(migrator) = self.services.migrator() else {
            return Outcome::Err(Error::RelationalNotInUse);
        };
        match migrator.migrate(cx, target).await {
            Outcome::Ok(()) => {
                tracing::info!(target_migration = ?target, "Database migrated");
                Outcome::Ok(())
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// DDL for the current model.
    pub fn generate_create_script(&self) -> Result<String> {
        self.services
            .database_creator()
            .ok_or(Error::RelationalNotInUse)?
            .generate_create_script()
    }

    // ========================================================================
    // Raw SQL
    // ========================================================================

    /// Run SQL with `{n}` placeholders and return the number of rows affected.
    ///
    /// No transaction is started; begin one first to make the command
    /// transactional.
    #[tracing::instrument(level = "debug", skip(self, cx, arguments))]
    pub async fn execute_sql_raw(
        &mut self,
        cx: &Cx,
        sql: &str,
        arguments: Vec<SqlArgument>,
    ) -> Outcome<u64, Error> {
        let Some(connection) = self.services.connection_mut() else {
            return Outcome::Err(Error::RelationalNotInUse);
        };
        let command =
            match RawSqlCommand::build_with_marker(sql, arguments, &self.config.parameter_marker) {
                Ok(command) => command,
                Err(e) => return Outcome::Err(e),
            };
        let _section = match self.detector.enter_critical_section() {
            Ok(section) => section,
            Err(e) => return Outcome::Err(e),
        };
        if self.config.log_sql {
            tracing::debug!(
                sql = %command.sql(),
                parameters = command.parameters().len(),
                "Executing raw SQL"
            );
        }

        let timeout = connection.command_timeout();
        connection.execute_non_query(cx, &command, timeout).await
    }

    /// Run SQL assembled from fragments and values.
    pub async fn execute_sql_interpolated(
        &mut self,
        cx: &Cx,
        sql: InterpolatedSql,
    ) -> Outcome<u64, Error> {
        let (format, arguments) = sql.into_parts();
        self.execute_sql_raw(cx, &format, arguments).await
    }

    // ========================================================================
    // Connection and Transactions
    // ========================================================================

    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn open_connection(&mut self, cx: &Cx) -> Outcome<(), Error> {
        let Some(connection) = self.services.connection_mut() else {
            return Outcome::Err(Error::RelationalNotInUse);
        };
        match connection.open(cx).await {
            Outcome::Ok(opened) => {
                if !opened {
                    tracing::debug!("Connection was already open");
                }
                Outcome::Ok(())
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn close_connection(&mut self, cx: &Cx) -> Outcome<(), Error> {
        let Some(connection) = self.services.connection_mut() else {
            return Outcome::Err(Error::RelationalNotInUse);
        };
        match connection.close(cx).await {
            Outcome::Ok(_) => Outcome::Ok(()),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Start a transaction, with the provider's default isolation when
    /// `isolation_level` is `None`.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn begin_transaction(
        &mut self,
        cx: &Cx,
        isolation_level: Option<IsolationLevel>,
    ) -> Outcome<TransactionInfo, Error> {
        let Some(connection) = self.services.connection_mut() else {
            return Outcome::Err(Error::RelationalNotInUse);
        };
        match connection.begin_transaction(cx, isolation_level).await {
            Outcome::Ok(transaction) => {
                tracing::info!(id = transaction.id, "Transaction started");
                Outcome::Ok(transaction)
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn commit_transaction(&mut self, cx: &Cx) -> Outcome<(), Error> {
        let Some(connection) = self.services.connection_mut() else {
            return Outcome::Err(Error::RelationalNotInUse);
        };
        let Some(transaction) = connection.current_transaction() else {
            return Outcome::Err(Error::NoActiveTransaction);
        };
        match connection.commit_transaction(cx).await {
            Outcome::Ok(()) => {
                tracing::info!(id = transaction.id, "Transaction committed");
                Outcome::Ok(())
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn rollback_transaction(&mut self, cx: &Cx) -> Outcome<(), Error> {
        let Some(connection) = self.services.connection_mut() else {
            return Outcome::Err(Error::RelationalNotInUse);
        };
        let Some(transaction) = connection.current_transaction() else {
            return Outcome::Err(Error::NoActiveTransaction);
        };
        match connection.rollback_transaction(cx).await {
            Outcome::Ok(()) => {
                tracing::info!(id = transaction.id, "Transaction rolled back");
                Outcome::Ok(())
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Enlist a transaction created outside the context, or stop using the
    /// current one with `None`. Returns the transaction now in use.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn use_transaction(
        &mut self,
        cx: &Cx,
        transaction: Option<TransactionInfo>,
    ) -> Outcome<Option<TransactionInfo>, Error> {
        let Some(connection) = self.services.connection_mut() else {
            return Outcome::Err(Error::RelationalNotInUse);
        };
        let _section = match self.detector.enter_critical_section() {
            Ok(section) => section,
            Err(e) => return Outcome::Err(e),
        };
        match connection.use_transaction(cx, transaction).await {
            Outcome::Ok(current) => {
                match &current {
                    Some(transaction) => tracing::info!(id = transaction.id, "Transaction enlisted"),
                    None => tracing::info!("Transaction cleared"),
                }
                Outcome::Ok(current)
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    pub fn current_transaction(&self) -> Result<Option<TransactionInfo>> {
        Ok(self.db_connection()?.current_transaction())
    }

    // ========================================================================
    // Command Timeout
    // ========================================================================

    /// Set the command timeout in seconds; `None` restores the provider default.
    pub fn set_command_timeout(&mut self, seconds: Option<i64>) -> Result<()> {
        let timeout = match seconds {
            None => None,
            Some(seconds) if seconds < 0 => return Err(Error::TimeoutTooSmall { seconds }),
            Some(seconds) => Some(checked_timeout(seconds.unsigned_abs())?),
        };
        let connection = self
            .services
            .connection_mut()
            .ok_or(Error::RelationalNotInUse)?;
        connection.set_command_timeout(timeout);
        Ok(())
    }

    /// Set the command timeout, rounded to whole seconds.
    pub fn set_command_timeout_duration(&mut self, timeout: Duration) -> Result<()> {
        let seconds = timeout.as_secs() + u64::from(timeout.subsec_millis() >= 500);
        let seconds = checked_timeout(seconds)?;
        let connection = self
            .services
            .connection_mut()
            .ok_or(Error::RelationalNotInUse)?;
        connection.set_command_timeout(Some(seconds));
        Ok(())
    }

    pub fn get_command_timeout(&self) -> Result<Option<u32>> {
        Ok(self.db_connection()?.command_timeout())
    }
}

/// Timeouts must fit a signed 32-bit second count.
fn checked_timeout(seconds: u64) -> Result<u32> {
    if seconds > u64::from(i32::MAX.unsigned_abs()) {
        return Err(Error::TimeoutTooBig { seconds });
    }
    u32::try_from(seconds).map_err(|_| Error::TimeoutTooBig { seconds })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::HistoryRow;
    use asupersync::runtime::RuntimeBuilder;
    use relmodel_core::Model;
    use relmodel_schema::RelationalModel;
    use serde_json::json;
    use std::future::Future;

    fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
        match outcome {
            Outcome::Ok(v) => v,
            Outcome::Err(e) => panic!("unexpected error: {e}"),
            Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
            Outcome::Panicked(p) => panic!("panicked: {p:?}"),
        }
    }

    fn expect_err<T>(outcome: Outcome<T, Error>) -> Error {
        match outcome {
            Outcome::Err(e) => e,
            _ => panic!("expected an error"),
        }
    }

    struct FakeAssembly(Vec<&'static str>);

    impl MigrationsAssembly for FakeAssembly {
        fn migrations(&self) -> Vec<String> {
            self.0.iter().map(|id| (*id).to_string()).collect()
        }
    }

    struct FakeHistory(Vec<HistoryRow>);

    impl HistoryRepository for FakeHistory {
        fn applied_migrations(
            &mut self,
            _cx: &Cx,
        ) -> impl Future<Output = Outcome<Vec<HistoryRow>, Error>> + Send {
            let rows = self.0.clone();
            async move { Outcome::Ok(rows) }
        }
    }

    #[derive(Default)]
    struct FakeMigrator {
        targets: Vec<Option<String>>,
    }

    impl Migrator for FakeMigrator {
        fn migrate(
            &mut self,
            _cx: &Cx,
            target: Option<&str>,
        ) -> impl Future<Output = Outcome<(), Error>> + Send {
            self.targets.push(target.map(str::to_string));
            async { Outcome::Ok(()) }
        }
    }

    struct FakeCreator(Model);

    impl RelationalDatabaseCreator for FakeCreator {
        fn generate_create_script(&self) -> Result<String> {
            Ok(self
                .0
                .tables()
                .iter()
                .map(|table| format!("CREATE TABLE {table} ();\n"))
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeConnection {
        open: bool,
        executed: Vec<(RawSqlCommand, Option<u32>)>,
        transaction: Option<TransactionInfo>,
        next_transaction: u64,
        timeout: Option<u32>,
    }

    impl RelationalConnection for FakeConnection {
        fn open(&mut self, _cx: &Cx) -> impl Future<Output = Outcome<bool, Error>> + Send {
            let was_open = std::mem::replace(&mut self.open, true);
            async move { Outcome::Ok(!was_open) }
        }

        fn close(&mut self, _cx: &Cx) -> impl Future<Output = Outcome<bool, Error>> + Send {
            let was_open = std::mem::replace(&mut self.open, false);
            async move { Outcome::Ok(was_open) }
        }

        fn execute_non_query(
            &mut self,
            _cx: &Cx,
            command: &RawSqlCommand,
            timeout: Option<u32>,
        ) -> impl Future<Output = Outcome<u64, Error>> + Send {
            self.executed.push((command.clone(), timeout));
            async { Outcome::Ok(1) }
        }

        fn begin_transaction(
            &mut self,
            _cx: &Cx,
            isolation_level: Option<IsolationLevel>,
        ) -> impl Future<Output = Outcome<TransactionInfo, Error>> + Send {
            let outcome = if self.transaction.is_some() {
                Outcome::Err(Error::service("connection", "a transaction is already in progress"))
            } else {
                self.next_transaction += 1;
                let transaction = TransactionInfo {
                    id: self.next_transaction,
                    isolation_level,
                };
                self.transaction = Some(transaction.clone());
                Outcome::Ok(transaction)
            };
            async move { outcome }
        }

        fn commit_transaction(&mut self, _cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
            self.transaction = None;
            async { Outcome::Ok(()) }
        }

        fn rollback_transaction(
            &mut self,
            _cx: &Cx,
        ) -> impl Future<Output = Outcome<(), Error>> + Send {
            self.transaction = None;
            async { Outcome::Ok(()) }
        }

        fn use_transaction(
            &mut self,
            _cx: &Cx,
            transaction: Option<TransactionInfo>,
        ) -> impl Future<Output = Outcome<Option<TransactionInfo>, Error>> + Send {
            self.transaction = transaction;
            let current = self.transaction.clone();
            async move { Outcome::Ok(current) }
        }

        fn current_transaction(&self) -> Option<TransactionInfo> {
            self.transaction.clone()
        }

        fn command_timeout(&self) -> Option<u32> {
            self.timeout
        }

        fn set_command_timeout(&mut self, seconds: Option<u32>) {
            self.timeout = seconds;
        }
    }

    #[derive(Default)]
    struct FakeServices {
        assembly: Option<FakeAssembly>,
        history: Option<FakeHistory>,
        migrator: Option<FakeMigrator>,
        creator: Option<FakeCreator>,
        connection: Option<FakeConnection>,
    }

    impl FakeServices {
        fn relational() -> Self {
            let mut model = Model::new();
            model.add_entity_type("Order").unwrap();
            model.finalize();
            Self {
                assembly: Some(FakeAssembly(vec!["001_Initial", "002_Orders", "003_Index"])),
                history: Some(FakeHistory(vec![HistoryRow::new("001_Initial", "0.1.0")])),
                migrator: Some(FakeMigrator::default()),
                creator: Some(FakeCreator(model)),
                connection: Some(FakeConnection::default()),
            }
        }
    }

    impl DatabaseServices for FakeServices {
        type Assembly = FakeAssembly;
        type History = FakeHistory;
        type Migrator = FakeMigrator;
        type Creator = FakeCreator;
        type Connection = FakeConnection;

        fn migrations_assembly(&self) -> Option<&FakeAssembly> {
            self.assembly.as_ref()
        }

        fn history_repository(&mut self) -> Option<&mut FakeHistory> {
            self.history.as_mut()
        }

        fn migrator(&mut self) -> Option<&mut FakeMigrator> {
            self.migrator.as_mut()
        }

        fn database_creator(&self) -> Option<&FakeCreator> {
            self.creator.as_ref()
        }

        fn connection(&self) -> Option<&FakeConnection> {
            self.connection.as_ref()
        }

        fn connection_mut(&mut self) -> Option<&mut FakeConnection> {
            self.connection.as_mut()
        }
    }

    fn connection(facade: &DatabaseFacade<FakeServices>) -> &FakeConnection {
        facade.services().connection.as_ref().unwrap()
    }

    #[test]
    fn test_pending_migrations() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();

        rt.block_on(async {
            let mut facade = DatabaseFacade::new(FakeServices::relational());
            assert!(facade.is_relational());
            assert_eq!(facade.get_migrations().unwrap().len(), 3);
            assert_eq!(
                unwrap_outcome(facade.get_applied_migrations(&cx).await),
                vec!["001_Initial".to_string()]
            );
            assert_eq!(
                unwrap_outcome(facade.get_pending_migrations(&cx).await),
                vec!["002_Orders".to_string(), "003_Index".to_string()]
            );

            unwrap_outcome(facade.migrate(&cx, Some("002_Orders")).await);
            assert_eq!(
                facade.services().migrator.as_ref().unwrap().targets,
                vec![Some("002_Orders".to_string())]
            );
        });
    }

    #[test]
    fn test_non_relational_provider() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();

        rt.block_on(async {
            let mut facade = DatabaseFacade::new(FakeServices::default());
            assert!(!facade.is_relational());
            assert!(matches!(facade.get_migrations(), Err(Error::RelationalNotInUse)));
            assert!(matches!(
                expect_err(facade.migrate(&cx, None).await),
                Error::RelationalNotInUse
            ));
            assert!(matches!(
                expect_err(facade.execute_sql_raw(&cx, "SELECT 1", Vec::new()).await),
                Error::RelationalNotInUse
            ));
            assert!(matches!(facade.generate_create_script(), Err(Error::RelationalNotInUse)));
            assert!(matches!(facade.set_command_timeout(Some(5)), Err(Error::RelationalNotInUse)));
            assert!(matches!(facade.db_connection(), Err(Error::RelationalNotInUse)));
            assert!(matches!(
                expect_err(facade.use_transaction(&cx, None).await),
                Error::RelationalNotInUse
            ));
            assert_eq!(
                facade.current_transaction().unwrap_err().to_string(),
                relmodel_core::RELATIONAL_NOT_IN_USE
            );
        });
    }

    #[test]
    fn test_execute_sql_raw_and_interpolated() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();

        rt.block_on(async {
            let mut facade = DatabaseFacade::new(FakeServices::relational());
            facade.set_command_timeout(Some(30)).unwrap();

            let rows = unwrap_outcome(
                facade
                    .execute_sql_raw(
                        &cx,
                        "DELETE FROM Orders WHERE Total < {0}",
                        vec![SqlArgument::value(0)],
                    )
                    .await,
            );
            assert_eq!(rows, 1);

            let sql = InterpolatedSql::new()
                .sql("UPDATE Orders SET Note = ")
                .value(json!("{late}"))
                .sql(" WHERE Id = ")
                .value(json!(4));
            unwrap_outcome(facade.execute_sql_interpolated(&cx, sql).await);

            let executed = &connection(&facade).executed;
            assert_eq!(executed.len(), 2);
            assert_eq!(executed[0].0.sql(), "DELETE FROM Orders WHERE Total < @p0");
            assert_eq!(executed[0].1, Some(30));
            assert_eq!(executed[1].0.sql(), "UPDATE Orders SET Note = @p0 WHERE Id = @p1");
            assert_eq!(executed[1].0.parameters()[0].value, json!("{late}"));
            assert!(!facade.concurrency_detector().is_in_critical_section());
        });
    }

    #[test]
    fn test_concurrent_raw_sql_is_rejected() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();

        rt.block_on(async {
            let mut facade = DatabaseFacade::new(FakeServices::relational());
            let detector = facade.concurrency_detector().clone();
            let section = detector.enter_critical_section().unwrap();

            let err = expect_err(facade.execute_sql_raw(&cx, "SELECT 1", Vec::new()).await);
            assert!(matches!(err, Error::ConcurrentMethodInvocation));
            assert!(connection(&facade).executed.is_empty());

            drop(section);
            unwrap_outcome(facade.execute_sql_raw(&cx, "SELECT 1", Vec::new()).await);
        });
    }

    #[test]
    fn test_bad_placeholder_leaves_no_critical_section() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();

        rt.block_on(async {
            let mut facade = DatabaseFacade::new(FakeServices::relational());
            let err = expect_err(facade.execute_sql_raw(&cx, "SELECT {1}", Vec::new()).await);
            assert!(err.is_argument_error());
            assert!(!facade.concurrency_detector().is_in_critical_section());
        });
    }

    #[test]
    fn test_placeholders_are_checked_before_the_critical_section() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();

        rt.block_on(async {
            let mut facade = DatabaseFacade::new(FakeServices::relational());
            let detector = facade.concurrency_detector().clone();
            let section = detector.enter_critical_section().unwrap();

            let err = expect_err(facade.execute_sql_raw(&cx, "SELECT {2}", Vec::new()).await);
            assert!(err.is_argument_error());
            assert!(detector.is_in_critical_section());

            drop(section);
            assert!(!detector.is_in_critical_section());
        });
    }

    #[test]
    fn test_use_external_transaction() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();

        rt.block_on(async {
            let mut facade = DatabaseFacade::new(FakeServices::relational());
            unwrap_outcome(facade.open_connection(&cx).await);
            assert!(facade.db_connection().unwrap().open);

            let external = TransactionInfo {
                id: 42,
                isolation_level: Some(IsolationLevel::Snapshot),
            };
            let current = unwrap_outcome(facade.use_transaction(&cx, Some(external.clone())).await);
            assert_eq!(current, Some(external.clone()));
            assert_eq!(facade.current_transaction().unwrap(), Some(external));

            assert_eq!(unwrap_outcome(facade.use_transaction(&cx, None).await), None);
            assert_eq!(facade.current_transaction().unwrap(), None);
            assert!(matches!(
                expect_err(facade.commit_transaction(&cx).await),
                Error::NoActiveTransaction
            ));

            let detector = facade.concurrency_detector().clone();
            let section = detector.enter_critical_section().unwrap();
            assert!(matches!(
                expect_err(facade.use_transaction(&cx, None).await),
                Error::ConcurrentMethodInvocation
            ));
            drop(section);

            facade.db_connection_mut().unwrap().set_command_timeout(Some(12));
            assert_eq!(facade.get_command_timeout().unwrap(), Some(12));
        });
    }

    #[test]
    fn test_connection_and_transactions() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();

        rt.block_on(async {
            let mut facade = DatabaseFacade::new(FakeServices::relational());
            unwrap_outcome(facade.open_connection(&cx).await);
            unwrap_outcome(facade.open_connection(&cx).await);
            assert!(connection(&facade).open);

            assert!(matches!(
                expect_err(facade.commit_transaction(&cx).await),
                Error::NoActiveTransaction
            ));

            let transaction = unwrap_outcome(
                facade
                    .begin_transaction(&cx, Some(IsolationLevel::Serializable))
                    .await,
            );
            assert_eq!(transaction.isolation_level, Some(IsolationLevel::Serializable));
            assert_eq!(facade.current_transaction().unwrap(), Some(transaction));
            unwrap_outcome(facade.rollback_transaction(&cx).await);
            assert_eq!(facade.current_transaction().unwrap(), None);

            let second = unwrap_outcome(facade.begin_transaction(&cx, None).await);
            assert_eq!(second.id, 2);
            unwrap_outcome(facade.commit_transaction(&cx).await);
            assert!(matches!(
                expect_err(facade.rollback_transaction(&cx).await),
                Error::NoActiveTransaction
            ));

            unwrap_outcome(facade.close_connection(&cx).await);
            assert!(!connection(&facade).open);
        });
    }

    #[test]
    fn test_command_timeout_bounds() {
        let mut facade = DatabaseFacade::new(FakeServices::relational());
        assert_eq!(facade.get_command_timeout().unwrap(), None);

        facade.set_command_timeout(Some(45)).unwrap();
        assert_eq!(facade.get_command_timeout().unwrap(), Some(45));

        assert!(matches!(
            facade.set_command_timeout(Some(-1)),
            Err(Error::TimeoutTooSmall { seconds: -1 })
        ));
        let too_big = i64::from(i32::MAX) + 1;
        assert!(matches!(
            facade.set_command_timeout(Some(too_big)),
            Err(Error::TimeoutTooBig { .. })
        ));
        assert_eq!(facade.get_command_timeout().unwrap(), Some(45));

        facade
            .set_command_timeout_duration(Duration::from_millis(2_600))
            .unwrap();
        assert_eq!(facade.get_command_timeout().unwrap(), Some(3));

        facade.set_command_timeout(None).unwrap();
        assert_eq!(facade.get_command_timeout().unwrap(), None);
    }

    #[test]
    fn test_apply_options_sets_timeout() {
        let mut facade = DatabaseFacade::new(FakeServices::relational());
        facade
            .apply_options(&RelationalOptions::new().default_schema("sales"))
            .unwrap();
        assert_eq!(facade.get_command_timeout().unwrap(), None);

        facade
            .apply_options(&RelationalOptions::new().command_timeout_secs(90))
            .unwrap();
        assert_eq!(facade.get_command_timeout().unwrap(), Some(90));
    }

    #[test]
    fn test_generate_create_script() {
        let facade = DatabaseFacade::new(FakeServices::relational());
        let script = facade.generate_create_script().unwrap();
        assert_eq!(script, "CREATE TABLE Order ();\n");
    }
}
