//! Database handle and the migration engine.
//!
//! A [`Database`] owns a [`Driver`] and a dialect, renders templates for it,
//! and manages the versioned-upgrade lifecycle: [`Database::open`] acquires
//! the driver's migration lock, compares the requested version against the
//! `_migrations` bookkeeping table, and, when an upgrade is due, fires an
//! [`UpgradeEvent`] at every registered listener, awaiting all work the
//! listeners register via [`UpgradeEvent::wait_until`].
//!
//! # Example
//!
//! ```ignore
//! use sqlstitch::{Database, DatabaseConfig, Dialect};
//!
//! let mut db = Database::new(driver, DatabaseConfig::new(Dialect::Sqlite));
//! db.on_upgrade(move |event| {
//!     let scope = event.scope();
//!     let users = users.clone();
//!     event.wait_until(async move { scope.ensure_table(&users).await });
//! });
//! db.open(1).await?;
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures_core::future::BoxFuture;
use futures_util::future::try_join_all;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::ddl;
use crate::driver::{Driver, Row, scalar_to_version};
use crate::error::{DbError, DbResult};
use crate::render::{Dialect, render_ddl, render_sql};
use crate::schema::{Table, datetime, integer};
use crate::template::{Template, bind, ident};
use crate::value::Value;

type Listener = Arc<dyn Fn(&UpgradeEvent) + Send + Sync>;

/// Guard marking the single in-progress exclusive upgrade scope.
///
/// Entering while another scope is active fails loudly; the flag clears when
/// the guard drops, including on error paths.
struct ExclusiveScope {
    flag: Arc<AtomicBool>,
}

impl ExclusiveScope {
    fn enter(flag: Arc<AtomicBool>) -> DbResult<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            return Err(DbError::usage(
                "cannot start an exclusive upgrade scope inside another",
            ));
        }
        Ok(Self { flag })
    }
}

impl Drop for ExclusiveScope {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Handle for schema work inside an in-progress upgrade.
///
/// The scope runs against the migration lock already held by the upgrade;
/// its operations never reacquire it.
#[derive(Clone)]
pub struct UpgradeScope {
    driver: Arc<dyn Driver>,
    dialect: Dialect,
}

impl UpgradeScope {
    /// Create a table (and its indexes) if it does not exist yet.
    pub async fn ensure_table(&self, table: &Table) -> DbResult<()> {
        ensure_table_with(self.driver.as_ref(), self.dialect, table).await
    }

    /// Render and execute a statement for effect.
    pub async fn execute(&self, template: &Template) -> DbResult<u64> {
        let rendered = render_sql(template, self.dialect);
        self.driver.execute(&rendered.sql, &rendered.params).await
    }

    /// Render and execute a query, returning all rows.
    pub async fn fetch_all(&self, template: &Template) -> DbResult<Vec<Row>> {
        let rendered = render_sql(template, self.dialect);
        self.driver.fetch_all(&rendered.sql, &rendered.params).await
    }
}

/// The event dispatched when a requested version exceeds the stored one.
pub struct UpgradeEvent {
    /// Version recorded before this upgrade.
    pub old_version: u32,
    /// Version being upgraded to.
    pub new_version: u32,
    scope: UpgradeScope,
    tasks: Mutex<Vec<BoxFuture<'static, DbResult<()>>>>,
}

impl UpgradeEvent {
    fn new(old_version: u32, new_version: u32, scope: UpgradeScope) -> Self {
        Self {
            old_version,
            new_version,
            scope,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// A handle for schema work under the upgrade's held lock.
    pub fn scope(&self) -> UpgradeScope {
        self.scope.clone()
    }

    /// Register a unit of upgrade work.
    ///
    /// The engine awaits every registered unit before recording the new
    /// version; if any unit fails, the whole upgrade fails and nothing is
    /// recorded. Units from different listeners may interleave and complete
    /// in any order.
    pub fn wait_until(&self, work: impl Future<Output = DbResult<()>> + Send + 'static) {
        self.tasks
            .lock()
            .expect("upgrade task list lock poisoned")
            .push(Box::pin(work));
    }

    fn take_tasks(&self) -> Vec<BoxFuture<'static, DbResult<()>>> {
        std::mem::take(
            &mut *self
                .tasks
                .lock()
                .expect("upgrade task list lock poisoned"),
        )
    }
}

/// A schema-managed database handle.
pub struct Database {
    driver: Arc<dyn Driver>,
    config: DatabaseConfig,
    version: u32,
    opened: bool,
    upgrade_active: Arc<AtomicBool>,
    listeners: Vec<Listener>,
}

impl Database {
    /// Create a handle over a driver. The database is not opened yet.
    pub fn new(driver: Arc<dyn Driver>, config: DatabaseConfig) -> Self {
        Self {
            driver,
            config,
            version: 0,
            opened: false,
            upgrade_active: Arc::new(AtomicBool::new(false)),
            listeners: Vec::new(),
        }
    }

    /// Register an upgrade listener.
    ///
    /// Listeners are invoked in registration order when [`Database::open`]
    /// detects a version increase. Each listener registers its asynchronous
    /// work on the event via [`UpgradeEvent::wait_until`].
    pub fn on_upgrade(&mut self, listener: impl Fn(&UpgradeEvent) + Send + Sync + 'static) {
        self.listeners.push(Arc::new(listener));
    }

    /// Open the database at the requested schema version.
    ///
    /// Acquires the driver's migration lock for the whole
    /// version-check-then-write sequence, ensures the bookkeeping table
    /// exists, and fires the upgrade lifecycle if `target_version` exceeds
    /// the stored version. A request at or below the stored version fires no
    /// event and plateaus at the stored maximum.
    ///
    /// Fails with a usage error if this instance is already open. Fails with
    /// the first rejected unit of upgrade work, in which case no version is
    /// recorded and the instance stays unopened.
    pub async fn open(&mut self, target_version: u32) -> DbResult<()> {
        if self.opened {
            return Err(DbError::usage("database is already open"));
        }

        let driver = Arc::clone(&self.driver);
        let dialect = self.config.dialect;
        let migration_table = self.config.migration_table.clone();
        let listeners = self.listeners.clone();
        let guard = Arc::clone(&self.upgrade_active);
        let applied = Arc::new(AtomicU32::new(0));
        let applied_in = Arc::clone(&applied);

        self.driver
            .with_migration_lock(Box::new(move || -> BoxFuture<'static, DbResult<()>> {
                Box::pin(async move {
                    let _scope = ExclusiveScope::enter(guard)?;
                    let version = run_upgrade(
                        driver,
                        dialect,
                        &migration_table,
                        target_version,
                        &listeners,
                    )
                    .await?;
                    applied_in.store(version, Ordering::SeqCst);
                    Ok(())
                })
            }))
            .await?;

        self.version = applied.load(Ordering::SeqCst);
        self.opened = true;
        Ok(())
    }

    /// The currently applied schema version (0 before [`Database::open`]).
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Check if [`Database::open`] has completed on this instance.
    pub fn is_open(&self) -> bool {
        self.opened
    }

    /// The configured dialect.
    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// Whether the driver reports affected rows for mutating statements.
    pub fn supports_affected_rows(&self) -> bool {
        self.driver.supports_affected_rows()
    }

    /// Create a table (and its indexes) if it does not exist yet.
    ///
    /// Inside an in-progress upgrade scope the already-held migration lock
    /// is reused; otherwise the lock is acquired for the duration of the
    /// statement.
    pub async fn ensure_table(&self, table: &Table) -> DbResult<()> {
        if self.upgrade_active.load(Ordering::SeqCst) {
            return ensure_table_with(self.driver.as_ref(), self.config.dialect, table).await;
        }

        let driver = Arc::clone(&self.driver);
        let dialect = self.config.dialect;
        let guard = Arc::clone(&self.upgrade_active);
        let table = table.clone();
        self.driver
            .with_migration_lock(Box::new(move || -> BoxFuture<'static, DbResult<()>> {
                Box::pin(async move {
                    let _scope = ExclusiveScope::enter(guard)?;
                    ensure_table_with(driver.as_ref(), dialect, &table).await
                })
            }))
            .await
    }

    /// Render and execute a statement for effect.
    pub async fn execute(&self, template: &Template) -> DbResult<u64> {
        let rendered = render_sql(template, self.config.dialect);
        self.driver.execute(&rendered.sql, &rendered.params).await
    }

    /// Render and execute a query, returning all rows.
    pub async fn fetch_all(&self, template: &Template) -> DbResult<Vec<Row>> {
        let rendered = render_sql(template, self.config.dialect);
        self.driver.fetch_all(&rendered.sql, &rendered.params).await
    }

    /// Render and execute a query, returning the first row, if any.
    pub async fn fetch_optional(&self, template: &Template) -> DbResult<Option<Row>> {
        let rendered = render_sql(template, self.config.dialect);
        self.driver
            .fetch_optional(&rendered.sql, &rendered.params)
            .await
    }

    /// Render and execute a query, returning a single scalar, if any.
    pub async fn fetch_scalar(&self, template: &Template) -> DbResult<Option<Value>> {
        let rendered = render_sql(template, self.config.dialect);
        self.driver
            .fetch_scalar(&rendered.sql, &rendered.params)
            .await
    }

    /// Close the underlying driver.
    pub async fn close(&self) -> DbResult<()> {
        self.driver.close().await
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("dialect", &self.config.dialect)
            .field("version", &self.version)
            .field("opened", &self.opened)
            .finish_non_exhaustive()
    }
}

/// The migration bookkeeping table, defined through this crate's own schema
/// model. One row per successfully applied version; rows are never updated
/// or deleted.
fn bookkeeping_table(name: &str) -> DbResult<Table> {
    Table::define(name)
        .field("version", integer())
        .field("appliedAt", datetime())
        .build()
}

async fn ensure_table_with(driver: &dyn Driver, dialect: Dialect, table: &Table) -> DbResult<()> {
    let sql = render_ddl(&ddl::create_table(table, dialect), dialect);
    debug!(table = table.name(), "ensuring table");
    driver.execute(&sql, &[]).await?;
    for statement in ddl::create_indexes(table, dialect) {
        let sql = render_ddl(&statement, dialect);
        driver.execute(&sql, &[]).await?;
    }
    Ok(())
}

async fn current_version(
    driver: &dyn Driver,
    dialect: Dialect,
    migration_table: &str,
) -> DbResult<u32> {
    let mut q = Template::new("SELECT MAX(");
    q.push_bind(ident("version"));
    q.push(") FROM ");
    q.push_bind(ident(migration_table));

    let rendered = render_sql(&q, dialect);
    let scalar = driver.fetch_scalar(&rendered.sql, &rendered.params).await?;
    scalar_to_version(scalar)
}

async fn record_version(
    driver: Arc<dyn Driver>,
    dialect: Dialect,
    migration_table: &str,
    version: u32,
) -> DbResult<()> {
    let mut t = Template::new("INSERT INTO ");
    t.push_bind(ident(migration_table));
    t.push(" (");
    t.push_bind(ident("version"));
    t.push(", ");
    t.push_bind(ident("applied_at"));
    t.push(") VALUES (");
    t.push_bind(bind(i64::from(version)));
    t.push(", ");
    t.push_bind(bind(Utc::now()));
    t.push(")");
    let rendered = render_sql(&t, dialect);

    let executor = Arc::clone(&driver);
    driver
        .run_in_transaction(Box::new(move || -> BoxFuture<'static, DbResult<()>> {
            Box::pin(async move {
                executor.execute(&rendered.sql, &rendered.params).await?;
                Ok(())
            })
        }))
        .await
}

/// The locked upgrade sequence: ensure bookkeeping, read the stored version,
/// dispatch the upgrade lifecycle if one is due, and return the version the
/// database settles at.
async fn run_upgrade(
    driver: Arc<dyn Driver>,
    dialect: Dialect,
    migration_table: &str,
    target_version: u32,
    listeners: &[Listener],
) -> DbResult<u32> {
    ensure_table_with(
        driver.as_ref(),
        dialect,
        &bookkeeping_table(migration_table)?,
    )
    .await?;

    let current = current_version(driver.as_ref(), dialect, migration_table).await?;
    if target_version <= current {
        // no event below or at the stored version; plateau at the maximum
        return Ok(current.max(target_version));
    }

    debug!(
        old_version = current,
        new_version = target_version,
        "running schema upgrade"
    );

    let event = UpgradeEvent::new(
        current,
        target_version,
        UpgradeScope {
            driver: Arc::clone(&driver),
            dialect,
        },
    );
    for listener in listeners {
        listener(&event);
    }

    // every registered unit must succeed before the version is recorded
    try_join_all(event.take_tasks()).await?;

    record_version(Arc::clone(&driver), dialect, migration_table, target_version).await?;
    info!(version = target_version, "migration version recorded");
    Ok(target_version)
}
