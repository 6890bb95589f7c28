//! Schema-aware fragment helpers.
//!
//! [`where_clause`], [`set_clause`] and [`on_clause`] turn structured
//! condition/update objects into [`Template`] fragments, resolving field
//! names to column names through a table's casing rule. Fragments compose
//! into larger statements via [`Template::merge`].

use crate::error::{DbError, DbResult};
use crate::schema::Table;
use crate::template::{Param, Template, bind, ident};
use crate::value::Value;

/// A per-field condition.
///
/// A filter may set several operator slots at once; expansion always follows
/// the fixed order eq, neq, lt, gt, gte, lte, like, in, is_null, with the
/// resulting clauses joined by ` AND `.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    eq: Option<Value>,
    neq: Option<Value>,
    lt: Option<Value>,
    gt: Option<Value>,
    gte: Option<Value>,
    lte: Option<Value>,
    like: Option<Value>,
    in_list: Option<Vec<Value>>,
    is_null: Option<bool>,
}

impl Filter {
    /// Create an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Equality shorthand: a bare value means `column = value`.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::new().eq(value)
    }

    /// Add `column = value`.
    pub fn eq(mut self, value: impl Into<Value>) -> Self {
        self.eq = Some(value.into());
        self
    }

    /// Add `column != value`.
    pub fn neq(mut self, value: impl Into<Value>) -> Self {
        self.neq = Some(value.into());
        self
    }

    /// Add `column < value`.
    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }

    /// Add `column > value`.
    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    /// Add `column >= value`.
    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.gte = Some(value.into());
        self
    }

    /// Add `column <= value`.
    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.lte = Some(value.into());
        self
    }

    /// Add `column LIKE value`.
    pub fn like(mut self, value: impl Into<Value>) -> Self {
        self.like = Some(value.into());
        self
    }

    /// Add `column IN (values...)`.
    ///
    /// An empty list renders an always-false clause, never invalid `IN ()`.
    pub fn in_list<T>(mut self, values: impl IntoIterator<Item = T>) -> Self
    where
        T: Into<Value>,
    {
        self.in_list = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Add `column IS NULL` (`true`) or `column IS NOT NULL` (`false`).
    pub fn is_null(mut self, is_null: bool) -> Self {
        self.is_null = Some(is_null);
        self
    }

    fn is_empty(&self) -> bool {
        self.eq.is_none()
            && self.neq.is_none()
            && self.lt.is_none()
            && self.gt.is_none()
            && self.gte.is_none()
            && self.lte.is_none()
            && self.like.is_none()
            && self.in_list.is_none()
            && self.is_null.is_none()
    }
}

impl From<Value> for Filter {
    fn from(value: Value) -> Self {
        Self::value(value)
    }
}

impl From<&str> for Filter {
    fn from(value: &str) -> Self {
        Self::value(value)
    }
}

impl From<String> for Filter {
    fn from(value: String) -> Self {
        Self::value(value)
    }
}

impl From<i64> for Filter {
    fn from(value: i64) -> Self {
        Self::value(value)
    }
}

impl From<i32> for Filter {
    fn from(value: i32) -> Self {
        Self::value(value)
    }
}

impl From<f64> for Filter {
    fn from(value: f64) -> Self {
        Self::value(value)
    }
}

impl From<bool> for Filter {
    fn from(value: bool) -> Self {
        Self::value(value)
    }
}

/// An ordered set of field conditions for [`where_clause`].
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    entries: Vec<(String, Option<Filter>)>,
}

impl Conditions {
    /// Create an empty condition set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition for a field.
    pub fn field(mut self, name: impl Into<String>, filter: impl Into<Filter>) -> Self {
        self.entries.push((name.into(), Some(filter.into())));
        self
    }

    /// Add a condition only if present; `None` entries are skipped entirely.
    pub fn field_opt(mut self, name: impl Into<String>, filter: Option<Filter>) -> Self {
        self.entries.push((name.into(), filter));
        self
    }

    fn entries(&self) -> &[(String, Option<Filter>)] {
        &self.entries
    }
}

/// An ordered set of column assignments for [`set_clause`].
#[derive(Debug, Clone, Default)]
pub struct Assignments {
    entries: Vec<(String, Option<Param>)>,
}

impl Assignments {
    /// Create an empty assignment set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a value (or identifier/builtin marker) to a field.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Param>) -> Self {
        self.entries.push((name.into(), Some(value.into())));
        self
    }

    /// Assign only if present; `None` entries are skipped entirely.
    pub fn set_opt(mut self, name: impl Into<String>, value: Option<Param>) -> Self {
        self.entries.push((name.into(), value));
        self
    }

    fn entries(&self) -> &[(String, Option<Param>)] {
        &self.entries
    }
}

fn push_comparison(acc: &mut Template, column: &str, operator: &str, value: &Value) {
    acc.push_bind(ident(column));
    acc.push(" ");
    acc.push(operator);
    acc.push(" ");
    acc.push_bind(bind(value.clone()));
}

/// Build a WHERE fragment from structured conditions.
///
/// Each present condition entry expands to one clause per set operator slot,
/// in the fixed order eq, neq, lt, gt, gte, lte, like, in, is_null; clauses
/// join with ` AND ` within and across fields. With zero usable conditions
/// the fragment is the always-true `1 = 1`, so it composes safely into an
/// unconditional WHERE.
pub fn where_clause(table: &Table, conditions: &Conditions) -> DbResult<Template> {
    let mut acc = Template::empty();
    let mut wrote = false;

    for (field, filter) in conditions.entries() {
        let Some(filter) = filter else { continue };
        if filter.is_empty() {
            continue;
        }
        let column = table.column(field)?.to_string();

        let comparisons: [(&str, &Option<Value>); 7] = [
            ("=", &filter.eq),
            ("!=", &filter.neq),
            ("<", &filter.lt),
            (">", &filter.gt),
            (">=", &filter.gte),
            ("<=", &filter.lte),
            ("LIKE", &filter.like),
        ];
        for (operator, value) in comparisons {
            if let Some(value) = value {
                if wrote {
                    acc.push(" AND ");
                }
                push_comparison(&mut acc, &column, operator, value);
                wrote = true;
            }
        }

        if let Some(values) = &filter.in_list {
            if wrote {
                acc.push(" AND ");
            }
            if values.is_empty() {
                // IN () is invalid in most dialects; an empty list can match
                // nothing
                acc.push("1 = 0");
            } else {
                acc.push_bind(ident(&column));
                acc.push(" IN (");
                acc.push_bind_list(values.iter().cloned());
                acc.push(")");
            }
            wrote = true;
        }

        if let Some(is_null) = filter.is_null {
            if wrote {
                acc.push(" AND ");
            }
            acc.push_bind(ident(&column));
            acc.push(if is_null { " IS NULL" } else { " IS NOT NULL" });
            wrote = true;
        }
    }

    if !wrote {
        acc.push("1 = 1");
    }
    Ok(acc)
}

/// Build a SET fragment from structured assignments.
///
/// Fails with a usage error if no assignment survives after dropping `None`
/// entries: an empty SET clause is invalid SQL and a caller mistake, not a
/// silent no-op.
pub fn set_clause(table: &Table, values: &Assignments) -> DbResult<Template> {
    let mut acc = Template::empty();
    let mut wrote = false;

    for (field, value) in values.entries() {
        let Some(value) = value else { continue };
        let column = table.column(field)?.to_string();

        if wrote {
            acc.push(", ");
        }
        acc.push_bind(ident(column));
        acc.push(" = ");
        acc.push_bind(value.clone());
        wrote = true;
    }

    if !wrote {
        return Err(DbError::usage(format!(
            "SET on table '{}' requires at least one column to update",
            table.name()
        )));
    }
    Ok(acc)
}

/// Build a join condition for a registered foreign-key field.
///
/// Produces `<referencedTable>.<referencedColumn> = <owningTable>.<ownColumn>`
/// with all identifiers dialect-quoted at render time. Fails with a usage
/// error if the field carries no reference.
pub fn on_clause(table: &Table, field: &str) -> DbResult<Template> {
    let reference = table.reference(field).ok_or_else(|| {
        DbError::usage(format!(
            "field '{field}' on table '{}' is not a foreign-key reference",
            table.name()
        ))
    })?;
    let own_column = table.column(field)?;

    let mut acc = Template::empty();
    acc.push_bind(ident(format!("{}.{}", reference.table, reference.column)));
    acc.push(" = ");
    acc.push_bind(ident(format!("{}.{}", table.name(), own_column)));
    Ok(acc)
}
