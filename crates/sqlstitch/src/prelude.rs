//! Convenient imports for typical `sqlstitch` usage.
//!
//! ```ignore
//! use sqlstitch::prelude::*;
//! ```

pub use crate::{
    Assignments, Conditions, Database, DatabaseConfig, DbError, DbResult, Dialect, Driver, Filter,
    Row, Table, Template, Value, on_clause, render_ddl, render_sql, set_clause, where_clause,
};

pub use crate::template::{Builtin, bind, builtin, ident, sql};

pub use crate::schema::{
    Casing, FieldType, OnDelete, boolean, date, datetime, email, integer, json, number, text, url,
};
