//! Database configuration.
//!
//! Configuration is constructed and passed in explicitly; nothing in this
//! crate mutates global state at load time. The dialect can be given
//! directly, parsed from a database URL's scheme, or read from
//! `DATABASE_URL`.

use std::str::FromStr;

use serde::Deserialize;
use url::Url;

use crate::error::{DbError, DbResult};
use crate::render::Dialect;

/// Name of the migration bookkeeping table.
pub const DEFAULT_MIGRATION_TABLE: &str = "_migrations";

/// Configuration for a [`Database`](crate::Database).
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// The SQL dialect templates render to.
    pub dialect: Dialect,
    /// Migration bookkeeping table name.
    #[serde(default = "default_migration_table")]
    pub migration_table: String,
}

fn default_migration_table() -> String {
    DEFAULT_MIGRATION_TABLE.to_string()
}

impl DatabaseConfig {
    /// Create a configuration for a dialect, with defaults elsewhere.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            migration_table: default_migration_table(),
        }
    }

    /// Override the migration bookkeeping table name.
    pub fn migration_table(mut self, name: impl Into<String>) -> Self {
        self.migration_table = name.into();
        self
    }

    /// Derive a configuration from a database URL's scheme.
    ///
    /// `postgres://...`, `mysql://...` and `sqlite://...` map onto the three
    /// supported dialects; anything else is a configuration error.
    pub fn from_url(url: &str) -> DbResult<Self> {
        let parsed =
            Url::parse(url).map_err(|e| DbError::config(format!("invalid database URL: {e}")))?;
        let dialect = Dialect::from_str(parsed.scheme())?;
        Ok(Self::new(dialect))
    }

    /// Derive a configuration from the `DATABASE_URL` environment variable.
    pub fn from_env() -> DbResult<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DbError::config("DATABASE_URL is not set"))?;
        Self::from_url(&url)
    }
}
