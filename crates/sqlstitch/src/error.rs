//! Error types for sqlstitch

use thiserror::Error;

/// Result type alias for sqlstitch operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for schema, rendering and migration operations
#[derive(Debug, Error)]
pub enum DbError {
    /// Invalid table or field definition
    #[error("Definition error: {0}")]
    Definition(String),

    /// API misuse (opening an already-open database, empty SET, unknown reference)
    #[error("Usage error: {0}")]
    Usage(String),

    /// A rejected unit of upgrade work, or corrupt migration bookkeeping
    #[error("Migration error: {0}")]
    Migration(String),

    /// Invalid configuration (unknown dialect, malformed database URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error reported by the underlying driver
    #[error("Driver error: {0}")]
    Driver(String),
}

impl DbError {
    /// Create a definition error
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition(message.into())
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Create a migration error
    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a driver error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }

    /// Check if this is a usage error
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    /// Check if this is a migration error
    pub fn is_migration(&self) -> bool {
        matches!(self, Self::Migration(_))
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
