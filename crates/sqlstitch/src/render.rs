//! Dialect-aware rendering of templates into SQL text and parameter lists.
//!
//! [`render_sql`] is the normal path: values become positional placeholders,
//! identifiers are quoted, builtins are spliced inline. [`render_ddl`] is the
//! schema-definition path, used for statements that do not support
//! placeholders in value positions: every value is inlined as a literal.
//!
//! Dialect resolution from configuration text happens through
//! [`Dialect::from_str`]; an unknown tag is a [`DbError::Config`], never a
//! silent default.

use std::fmt::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DbError;
use crate::template::{Builtin, Param, Template};
use crate::value::{Value, datetime_text, quote_text};

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL: `$n` placeholders, `"` identifier quotes, TRUE/FALSE.
    #[serde(alias = "postgresql")]
    Postgres,
    /// MySQL: `?` placeholders, backtick identifier quotes, TRUE/FALSE.
    MySql,
    /// SQLite: `?` placeholders, `"` identifier quotes, 0/1 booleans.
    Sqlite,
}

impl Dialect {
    /// The canonical dialect tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    fn quote_char(self) -> char {
        match self {
            Self::MySql => '`',
            Self::Postgres | Self::Sqlite => '"',
        }
    }

    fn write_placeholder(self, out: &mut String, index: usize) {
        match self {
            Self::Postgres => {
                let _ = write!(out, "${index}");
            }
            Self::MySql | Self::Sqlite => out.push('?'),
        }
    }

    pub(crate) fn bool_literal(self, value: bool) -> &'static str {
        match self {
            Self::Sqlite => {
                if value {
                    "1"
                } else {
                    "0"
                }
            }
            Self::Postgres | Self::MySql => {
                if value {
                    "TRUE"
                } else {
                    "FALSE"
                }
            }
        }
    }

    pub(crate) fn builtin_sql(self, builtin: Builtin) -> &'static str {
        match builtin {
            Builtin::CurrentTimestamp => "CURRENT_TIMESTAMP",
            Builtin::CurrentDate => "CURRENT_DATE",
            Builtin::Random => match self {
                Self::MySql => "RAND()",
                Self::Postgres | Self::Sqlite => "RANDOM()",
            },
        }
    }

    /// Quote an identifier path for this dialect.
    ///
    /// `path` may be dotted (`table.column`); each segment is quoted
    /// independently, with embedded quote characters doubled. The `.`
    /// separator is reserved for qualified names and cannot appear inside a
    /// table or field name (enforced at definition time).
    pub fn quote_ident(self, path: &str) -> String {
        let quote = self.quote_char();
        let mut out = String::with_capacity(path.len() + 4);
        for (i, segment) in path.split('.').enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push(quote);
            for ch in segment.chars() {
                if ch == quote {
                    out.push(quote);
                }
                out.push(ch);
            }
            out.push(quote);
        }
        out
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(DbError::config(format!(
                "unknown SQL dialect '{other}' (expected postgres, mysql or sqlite)"
            ))),
        }
    }
}

/// A rendered statement: SQL text plus positional parameter values.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// Final SQL text with dialect placeholders.
    pub sql: String,
    /// Bound values, in placeholder order.
    pub params: Vec<Value>,
}

/// Render a template into SQL text and a positional parameter list.
///
/// Placeholders are sequential and 1-indexed; the numbering dialect counts
/// cumulative bound parameters, not textual position. Identifier and builtin
/// markers are spliced inline and contribute no parameters.
pub fn render_sql(template: &Template, dialect: Dialect) -> Rendered {
    let mut sql = String::new();
    let mut params = Vec::new();

    for (i, segment) in template.segments().iter().enumerate() {
        sql.push_str(segment);
        if let Some(param) = template.params().get(i) {
            match param {
                Param::Value(v) => {
                    params.push(v.clone());
                    dialect.write_placeholder(&mut sql, params.len());
                }
                Param::Ident(name) => sql.push_str(&dialect.quote_ident(name)),
                Param::Builtin(b) => sql.push_str(dialect.builtin_sql(*b)),
            }
        }
    }

    Rendered { sql, params }
}

/// Render a schema-definition template with every value inlined as a literal.
///
/// DDL statements do not support placeholders in value positions, so values
/// go through full literal encoding here: NULL stays NULL, booleans use the
/// dialect encoding, numbers are decimal text, strings and datetimes are
/// single-quoted with embedded quotes doubled (datetimes ISO-8601).
pub fn render_ddl(template: &Template, dialect: Dialect) -> String {
    let mut sql = String::new();

    for (i, segment) in template.segments().iter().enumerate() {
        sql.push_str(segment);
        if let Some(param) = template.params().get(i) {
            match param {
                Param::Value(v) => sql.push_str(&literal(v, dialect)),
                Param::Ident(name) => sql.push_str(&dialect.quote_ident(name)),
                Param::Builtin(b) => sql.push_str(dialect.builtin_sql(*b)),
            }
        }
    }

    sql
}

fn literal(value: &Value, dialect: Dialect) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => dialect.bool_literal(*b).to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => quote_text(s),
        Value::DateTime(t) => quote_text(&datetime_text(t)),
        Value::Json(j) => quote_text(&j.to_string()),
    }
}
