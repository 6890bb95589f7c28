//! Declarative schema definition and derived table metadata.
//!
//! ```ignore
//! use sqlstitch::schema::{Table, integer, text, datetime};
//!
//! let users = Table::define("users")
//!     .field("id", integer().primary())
//!     .field("email", text().unique())
//!     .field("createdAt", datetime().default_value(chrono::Utc::now()))
//!     .build()?;
//!
//! let posts = Table::define("posts")
//!     .field("id", integer().primary())
//!     .field("authorId", integer().references(&users)?.indexed())
//!     .build()?;
//! ```

mod field;
mod table;

pub use field::{
    FieldDecl, FieldMeta, FieldType, OnDelete, Reference, boolean, date, datetime, email, integer,
    json, number, text, url,
};
pub use table::{Casing, Table, TableBuilder};
