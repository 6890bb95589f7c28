//! Table metadata model.
//!
//! [`Table::define`] consumes field declarations and computes all derived
//! metadata (column names, requiredness, the primary key, unique/indexed
//! lists, references and compound indexes) once, at definition time.
//! [`Table::pick`] derives a fully independent projection of a table.

use std::collections::BTreeMap;

use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DbError, DbResult};
use crate::schema::field::{FieldDecl, FieldMeta, Reference};

/// Reserved separator for qualified names (`table.column`); table and field
/// names may not contain it.
pub(crate) const PATH_SEPARATOR: char = '.';

/// Column-name derivation rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Casing {
    /// Derive `snake_case` column names from field names.
    #[default]
    Snake,
    /// Use field names as column names unchanged.
    Preserve,
}

impl Casing {
    fn column_name(self, field: &str) -> String {
        match self {
            Self::Snake => field.to_snake_case(),
            Self::Preserve => field.to_string(),
        }
    }
}

/// An immutable table definition with derived metadata.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    casing: Casing,
    fields: Vec<(String, FieldMeta)>,
    columns: BTreeMap<String, String>,
    primary_key: Option<String>,
    unique: Vec<String>,
    indexed: Vec<String>,
    references: Vec<(String, Reference)>,
    indexes: Vec<Vec<String>>,
}

/// Builder returned by [`Table::define`].
pub struct TableBuilder {
    name: String,
    casing: Casing,
    fields: Vec<(String, FieldDecl)>,
    indexes: Vec<Vec<String>>,
}

impl Table {
    /// Start defining a table.
    pub fn define(name: impl Into<String>) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            casing: Casing::default(),
            fields: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// The table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The column-name derivation rule.
    pub fn casing(&self) -> Casing {
        self.casing
    }

    /// Iterate fields with their metadata, in definition order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldMeta)> {
        self.fields.iter().map(|(name, meta)| (name.as_str(), meta))
    }

    /// Metadata for a single field, if defined.
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, meta)| meta)
    }

    /// Resolve a field name to its dialect-independent column name.
    pub fn column(&self, field: &str) -> DbResult<&str> {
        self.columns.get(field).map(String::as_str).ok_or_else(|| {
            DbError::usage(format!(
                "table '{}' has no field named '{field}'",
                self.name
            ))
        })
    }

    /// The primary-key field, if any.
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// Fields carrying a unique constraint.
    pub fn unique_fields(&self) -> &[String] {
        &self.unique
    }

    /// Indexed fields.
    pub fn indexed_fields(&self) -> &[String] {
        &self.indexed
    }

    /// Iterate declared foreign-key references.
    pub fn references(&self) -> impl Iterator<Item = (&str, &Reference)> {
        self.references
            .iter()
            .map(|(field, reference)| (field.as_str(), reference))
    }

    /// The reference declared on a field, if any.
    pub fn reference(&self, field: &str) -> Option<&Reference> {
        self.references
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, reference)| reference)
    }

    /// Compound index definitions.
    pub fn indexes(&self) -> &[Vec<String>] {
        &self.indexes
    }

    /// Derive a new, independent table restricted to a field subset.
    ///
    /// Per-field metadata is filtered to the subset; a reference survives
    /// only if its owning field survives, and a compound index only if every
    /// member field survives. The derived table shares no state with the
    /// source.
    pub fn pick(&self, fields: &[&str]) -> DbResult<Table> {
        for field in fields {
            if !self.columns.contains_key(*field) {
                return Err(DbError::usage(format!(
                    "cannot pick '{field}': table '{}' has no such field",
                    self.name
                )));
            }
        }

        let keep = |name: &str| fields.contains(&name);

        let picked_fields: Vec<(String, FieldMeta)> = self
            .fields
            .iter()
            .filter(|(name, _)| keep(name))
            .cloned()
            .collect();
        let columns = self
            .columns
            .iter()
            .filter(|(field, _)| keep(field))
            .map(|(field, column)| (field.clone(), column.clone()))
            .collect();

        Ok(Table {
            name: self.name.clone(),
            casing: self.casing,
            primary_key: self.primary_key.clone().filter(|pk| keep(pk)),
            unique: self.unique.iter().filter(|f| keep(f)).cloned().collect(),
            indexed: self.indexed.iter().filter(|f| keep(f)).cloned().collect(),
            references: self
                .references
                .iter()
                .filter(|(field, _)| keep(field))
                .cloned()
                .collect(),
            indexes: self
                .indexes
                .iter()
                .filter(|index| index.iter().all(|f| keep(f)))
                .cloned()
                .collect(),
            fields: picked_fields,
            columns,
        })
    }
}

fn validate_name(kind: &str, name: &str) -> DbResult<()> {
    if name.is_empty() {
        return Err(DbError::definition(format!("{kind} name cannot be empty")));
    }
    if name.contains(PATH_SEPARATOR) {
        return Err(DbError::definition(format!(
            "{kind} name '{name}' contains '{PATH_SEPARATOR}', which is reserved for qualified names"
        )));
    }
    Ok(())
}

impl TableBuilder {
    /// Set the column-name derivation rule.
    pub fn casing(mut self, casing: Casing) -> Self {
        self.casing = casing;
        self
    }

    /// Add a field declaration.
    pub fn field(mut self, name: impl Into<String>, decl: FieldDecl) -> Self {
        self.fields.push((name.into(), decl));
        self
    }

    /// Add a compound index over the given fields.
    pub fn index(mut self, fields: &[&str]) -> Self {
        self.indexes
            .push(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Validate the definition and compute all derived metadata.
    pub fn build(self) -> DbResult<Table> {
        validate_name("table", &self.name)?;

        let mut fields = Vec::with_capacity(self.fields.len());
        let mut columns = BTreeMap::new();
        let mut primary_key: Option<String> = None;
        let mut unique = Vec::new();
        let mut indexed = Vec::new();
        let mut references = Vec::new();

        for (name, decl) in self.fields {
            validate_name("field", &name)?;
            if columns.contains_key(&name) {
                return Err(DbError::definition(format!(
                    "duplicate field '{name}' on table '{}'",
                    self.name
                )));
            }

            let meta = decl.into_meta();
            if meta.primary {
                if let Some(previous) = primary_key.replace(name.clone()) {
                    warn!(
                        table = %self.name,
                        previous = %previous,
                        replaced_by = %name,
                        "multiple fields marked primary key; keeping the last"
                    );
                }
            }
            if meta.unique {
                unique.push(name.clone());
            }
            if meta.indexed {
                indexed.push(name.clone());
            }
            if let Some(reference) = meta.reference.clone() {
                references.push((name.clone(), reference));
            }

            columns.insert(name.clone(), self.casing.column_name(&name));
            fields.push((name, meta));
        }

        let indexes = self.indexes;
        for index in &indexes {
            if index.is_empty() {
                return Err(DbError::definition(format!(
                    "empty compound index on table '{}'",
                    self.name
                )));
            }
            for field in index {
                if !columns.contains_key(field) {
                    return Err(DbError::definition(format!(
                        "index on table '{}' names unknown field '{field}'",
                        self.name
                    )));
                }
            }
        }

        Ok(Table {
            name: self.name,
            casing: self.casing,
            fields,
            columns,
            primary_key,
            unique,
            indexed,
            references,
            indexes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::{FieldType, OnDelete, integer, text};

    fn users() -> Table {
        Table::define("users")
            .field("id", integer().primary())
            .field("userName", text().unique())
            .field("bio", text().max_len(2000).optional())
            .build()
            .unwrap()
    }

    #[test]
    fn snake_case_column_derivation() {
        let t = users();
        assert_eq!(t.column("userName").unwrap(), "user_name");
        assert_eq!(t.column("id").unwrap(), "id");
    }

    #[test]
    fn preserve_casing_keeps_names() {
        let t = Table::define("users")
            .casing(Casing::Preserve)
            .field("userName", text())
            .build()
            .unwrap();
        assert_eq!(t.column("userName").unwrap(), "userName");
    }

    #[test]
    fn unknown_column_is_usage_error() {
        let err = users().column("missing").unwrap_err();
        assert!(err.is_usage());
    }

    #[test]
    fn aggregates_computed_at_build() {
        let t = users();
        assert_eq!(t.primary_key(), Some("id"));
        assert_eq!(t.unique_fields(), ["userName"]);
        assert_eq!(t.field("bio").unwrap().field_type, FieldType::Textarea);
        assert!(!t.field("bio").unwrap().required);
    }

    #[test]
    fn last_primary_key_wins() {
        let t = Table::define("t")
            .field("a", integer().primary())
            .field("b", integer().primary())
            .build()
            .unwrap();
        assert_eq!(t.primary_key(), Some("b"));
    }

    #[test]
    fn rejects_separator_in_names() {
        assert!(Table::define("bad.name").build().is_err());
        let err = Table::define("t")
            .field("bad.field", text())
            .build()
            .unwrap_err();
        assert!(matches!(err, DbError::Definition(_)));
    }

    #[test]
    fn rejects_duplicate_fields() {
        let err = Table::define("t")
            .field("a", text())
            .field("a", text())
            .build()
            .unwrap_err();
        assert!(matches!(err, DbError::Definition(_)));
    }

    #[test]
    fn rejects_index_over_unknown_field() {
        let err = Table::define("t")
            .field("a", text())
            .index(&["a", "missing"])
            .build()
            .unwrap_err();
        assert!(matches!(err, DbError::Definition(_)));
    }

    #[test]
    fn references_default_to_target_primary_key() {
        let users = users();
        let posts = Table::define("posts")
            .field("id", integer().primary())
            .field(
                "authorId",
                integer()
                    .references(&users)
                    .unwrap()
                    .join_alias("author")
                    .on_delete(OnDelete::Cascade),
            )
            .build()
            .unwrap();

        let reference = posts.reference("authorId").unwrap();
        assert_eq!(reference.table, "users");
        assert_eq!(reference.field, "id");
        assert_eq!(reference.column, "id");
        assert_eq!(reference.alias.as_deref(), Some("author"));
        assert_eq!(reference.on_delete, Some(OnDelete::Cascade));
    }

    #[test]
    fn reference_to_unknown_field_is_definition_error() {
        let users = users();
        let err = integer().references_field(&users, "missing").unwrap_err();
        assert!(matches!(err, DbError::Definition(_)));
    }

    #[test]
    fn pick_projects_fields_and_filters_metadata() {
        let users = users();
        let posts = Table::define("posts")
            .field("id", integer().primary())
            .field("title", text().indexed())
            .field("authorId", integer().references(&users).unwrap())
            .index(&["title", "authorId"])
            .index(&["title"])
            .build()
            .unwrap();

        let picked = posts.pick(&["id", "title"]).unwrap();
        let names: Vec<_> = picked.fields().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, ["id", "title"]);
        assert_eq!(picked.primary_key(), Some("id"));
        assert_eq!(picked.indexed_fields(), ["title"]);
        // reference dropped with its field, compound index dropped with a member
        assert!(picked.reference("authorId").is_none());
        assert_eq!(picked.indexes(), [vec!["title".to_string()]]);
    }

    #[test]
    fn pick_is_independent_of_source() {
        let t = users();
        let picked = t.pick(&["id"]).unwrap();
        drop(t);
        assert_eq!(picked.column("id").unwrap(), "id");
        assert!(picked.column("userName").is_err());
    }

    #[test]
    fn pick_unknown_field_is_usage_error() {
        let err = users().pick(&["missing"]).unwrap_err();
        assert!(err.is_usage());
    }
}
