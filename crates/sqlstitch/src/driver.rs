//! The driver seam.
//!
//! This crate never talks to a database directly; everything it executes
//! goes through the [`Driver`] trait with already-rendered SQL and
//! positional [`Value`]s. Connection handling, pooling, wire protocols and
//! timeouts all live on the driver side of this boundary.

use async_trait::async_trait;
use futures_core::future::BoxFuture;

use crate::error::{DbError, DbResult};
use crate::value::Value;

/// A single result row: named columns with scalar values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column value.
    pub fn push(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.columns.push((name.into(), value));
        self
    }

    /// Look up a column by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// The first column's value, if any.
    pub fn first(&self) -> Option<&Value> {
        self.columns.first().map(|(_, value)| value)
    }

    /// Iterate columns in order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// A unit of work executed by the driver while it holds a resource
/// (a transaction or the migration lock).
pub type DriverWork = Box<dyn FnOnce() -> BoxFuture<'static, DbResult<()>> + Send>;

/// The capability this crate consumes from a database driver.
///
/// All statement operations take rendered SQL plus positional parameter
/// values and are asynchronous. `run_in_transaction` and
/// `with_migration_lock` invoke the given work while the transaction /
/// mutual-exclusion primitive is held, and release it when the work's
/// future resolves.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Execute a query and return all rows.
    async fn fetch_all(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>>;

    /// Execute a query and return the first row, if any.
    ///
    /// The default implementation fetches all rows and takes the first.
    async fn fetch_optional(&self, sql: &str, params: &[Value]) -> DbResult<Option<Row>> {
        let rows = self.fetch_all(sql, params).await?;
        Ok(rows.into_iter().next())
    }

    /// Execute a query and return the first column of the first row, if any.
    ///
    /// The default implementation goes through [`Driver::fetch_optional`].
    async fn fetch_scalar(&self, sql: &str, params: &[Value]) -> DbResult<Option<Value>> {
        let row = self.fetch_optional(sql, params).await?;
        Ok(row.and_then(|r| r.first().cloned()))
    }

    /// Execute a statement for effect and return the affected-row count.
    ///
    /// Drivers whose engine cannot report affected rows return 0 and
    /// advertise it via [`Driver::supports_affected_rows`].
    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<u64>;

    /// Close the underlying connection.
    async fn close(&self) -> DbResult<()>;

    /// Run the given work inside a transaction.
    ///
    /// Commits when the work resolves `Ok`, rolls back on `Err`; the error
    /// propagates either way.
    async fn run_in_transaction(&self, work: DriverWork) -> DbResult<()>;

    /// Run the given work while holding the migration lock.
    ///
    /// The lock is an external mutual-exclusion primitive shared by all
    /// openers of the same underlying store. It must be held for the whole
    /// version-check-then-write sequence, not just for schema writes.
    async fn with_migration_lock(&self, work: DriverWork) -> DbResult<()>;

    /// Whether mutating statements report affected rows.
    fn supports_affected_rows(&self) -> bool {
        true
    }
}

/// Interpret a scalar read as a migration version.
///
/// `MAX(version)` over an empty table is NULL; both NULL and a missing row
/// mean version 0.
pub(crate) fn scalar_to_version(scalar: Option<Value>) -> DbResult<u32> {
    match scalar {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Int(n)) if n >= 0 => Ok(n as u32),
        Some(other) => Err(DbError::migration(format!(
            "unexpected version value in migration bookkeeping: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_lookup_by_name() {
        let mut row = Row::new();
        row.push("version", Value::Int(3))
            .push("applied_at", Value::Null);
        assert_eq!(row.get("version"), Some(&Value::Int(3)));
        assert_eq!(row.first(), Some(&Value::Int(3)));
        assert!(row.get("missing").is_none());
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn version_scalar_interpretation() {
        assert_eq!(scalar_to_version(None).unwrap(), 0);
        assert_eq!(scalar_to_version(Some(Value::Null)).unwrap(), 0);
        assert_eq!(scalar_to_version(Some(Value::Int(4))).unwrap(), 4);
        assert!(scalar_to_version(Some(Value::Text("x".into()))).is_err());
    }
}
