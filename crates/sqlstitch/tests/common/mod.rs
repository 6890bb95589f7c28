#![allow(dead_code)]

//! Shared in-memory driver double for integration tests.
//!
//! Implements the `Driver` seam over a process-local store so the migration
//! engine can be exercised end to end: executed SQL is logged, `_migrations`
//! rows live in a `Vec`, and migration-lock acquisitions are depth-counted.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use sqlstitch::{DbError, DbResult, Driver, Row, Value};
use sqlstitch::driver::DriverWork;

/// Backing store shared by every driver (and `Database`) in a test.
#[derive(Default)]
pub struct MemoryStore {
    versions: Mutex<Vec<i64>>,
    executed: Mutex<Vec<String>>,
    lock_depth: AtomicUsize,
    max_lock_depth: AtomicUsize,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Pre-populate an applied migration version.
    pub fn seed(&self, version: i64) {
        self.versions.lock().unwrap().push(version);
    }

    /// Applied versions, in insertion order.
    pub fn applied_versions(&self) -> Vec<i64> {
        self.versions.lock().unwrap().clone()
    }

    /// Every SQL string the driver has seen.
    pub fn executed_sql(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// The highest concurrent migration-lock depth observed.
    pub fn max_lock_depth(&self) -> usize {
        self.max_lock_depth.load(Ordering::SeqCst)
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn log(&self, sql: &str) {
        self.executed.lock().unwrap().push(sql.to_string());
    }
}

/// An in-memory `Driver` over a shared [`MemoryStore`].
pub struct MemoryDriver {
    store: std::sync::Arc<MemoryStore>,
}

impl MemoryDriver {
    pub fn new(store: std::sync::Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn fetch_all(&self, sql: &str, _params: &[Value]) -> DbResult<Vec<Row>> {
        self.store.log(sql);
        Ok(Vec::new())
    }

    async fn fetch_scalar(&self, sql: &str, _params: &[Value]) -> DbResult<Option<Value>> {
        self.store.log(sql);
        if sql.contains("MAX(") {
            let versions = self.store.versions.lock().unwrap();
            return Ok(Some(
                versions.iter().max().map_or(Value::Null, |v| Value::Int(*v)),
            ));
        }
        Ok(None)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<u64> {
        self.store.log(sql);
        if sql.starts_with("INSERT INTO") && sql.contains("_migrations") {
            let Some(Value::Int(version)) = params.first().cloned() else {
                return Err(DbError::driver("expected a version parameter"));
            };
            self.store.versions.lock().unwrap().push(version);
        }
        Ok(1)
    }

    async fn close(&self) -> DbResult<()> {
        self.store.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn run_in_transaction(&self, work: DriverWork) -> DbResult<()> {
        work().await
    }

    async fn with_migration_lock(&self, work: DriverWork) -> DbResult<()> {
        let depth = self.store.lock_depth.fetch_add(1, Ordering::SeqCst) + 1;
        self.store.max_lock_depth.fetch_max(depth, Ordering::SeqCst);
        let result = work().await;
        self.store.lock_depth.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
