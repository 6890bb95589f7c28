//! # sqlstitch
//!
//! A schema-first, dialect-aware SQL composition and migration layer.
//!
//! ## Features
//!
//! - **Composable templates**: literal segments and parameters stay separate
//!   until render time, so fragments merge without placeholder bookkeeping
//! - **Three dialects**: Postgres (`$n`), MySQL and SQLite (`?`) with
//!   dialect-correct identifier quoting and literal encoding
//! - **Schema-derived fragments**: `where_clause` / `set_clause` /
//!   `on_clause` resolve field names through a table's metadata
//! - **Declarative tables**: field declarations classify into a closed type
//!   enumeration, with primary/unique/index/reference aggregates computed
//!   once at definition time
//! - **Versioned migrations**: `open(n)` fires an upgrade lifecycle under a
//!   driver-supplied lock; all registered upgrade work must succeed before a
//!   version is recorded
//! - **Narrow driver seam**: everything executes through the async
//!   [`Driver`] trait with rendered SQL and positional values
//!
//! ## Example
//!
//! ```ignore
//! use sqlstitch::prelude::*;
//! use sqlstitch::schema::{integer, text};
//!
//! let users = Table::define("users")
//!     .field("id", integer().primary())
//!     .field("userName", text().unique())
//!     .build()?;
//!
//! let mut q = sql("SELECT * FROM ");
//! q.push_bind(ident("users"));
//! q.push(" WHERE ");
//! q.merge(&where_clause(&users, &Conditions::new().field("userName", "alice"))?);
//!
//! let rendered = render_sql(&q, Dialect::Postgres);
//! assert_eq!(rendered.sql, "SELECT * FROM \"users\" WHERE \"user_name\" = $1");
//! ```

pub mod clause;
pub mod config;
pub mod db;
pub mod ddl;
pub mod driver;
pub mod error;
pub mod prelude;
pub mod render;
pub mod schema;
pub mod template;
pub mod value;

pub use clause::{Assignments, Conditions, Filter, on_clause, set_clause, where_clause};
pub use config::{DEFAULT_MIGRATION_TABLE, DatabaseConfig};
pub use db::{Database, UpgradeEvent, UpgradeScope};
pub use driver::{Driver, DriverWork, Row};
pub use error::{DbError, DbResult};
pub use render::{Dialect, Rendered, render_ddl, render_sql};
pub use schema::{Casing, FieldDecl, FieldMeta, FieldType, OnDelete, Reference, Table};
pub use template::{Builtin, Param, Template, bind, builtin, ident, sql};
pub use value::Value;
