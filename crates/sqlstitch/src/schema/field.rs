//! Declarative field definitions.
//!
//! Fields are declared through small constructor functions ([`text`],
//! [`integer`], ...) returning a [`FieldDecl`] builder. The builder carries
//! every externally relevant facet of a declaration (core kind, bounds,
//! optionality layers, defaults, display metadata and wrapper flags) as an
//! explicit closed structure. [`Table::define`](crate::schema::Table::define)
//! consumes declarations and computes the derived [`FieldMeta`] once, at
//! definition time.

use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult};
use crate::schema::table::Table;
use crate::value::Value;

/// String declarations longer than this classify as long-form text.
const LONG_TEXT_THRESHOLD: usize = 500;

/// The closed enumeration of derived field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Single-line text.
    Text,
    /// Long-form text (declared length above the threshold).
    Textarea,
    /// Email-formatted text.
    Email,
    /// URL-formatted text.
    Url,
    /// Floating-point number.
    Number,
    /// Integer.
    Integer,
    /// Boolean.
    Checkbox,
    /// One of an enumerated option list.
    Select,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// JSON document.
    Json,
}

/// Delete behavior for a foreign-key reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    Cascade,
    SetNull,
    Restrict,
}

impl OnDelete {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::Restrict => "RESTRICT",
        }
    }
}

/// A resolved foreign-key reference.
///
/// Target table and column are captured at declaration time, so rendering a
/// join fragment later needs no access to the target table object.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    /// Referenced table name.
    pub table: String,
    /// Referenced field name.
    pub field: String,
    /// Referenced column name (casing already applied).
    pub column: String,
    /// Relationship alias, if declared.
    pub alias: Option<String>,
    /// Delete behavior, if declared.
    pub on_delete: Option<OnDelete>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextFormat {
    Email,
    Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclKind {
    Text { format: Option<TextFormat> },
    Number { integer: bool },
    Bool,
    Date { with_time: bool },
    Json,
}

/// A field declaration under construction.
///
/// Built by the constructor functions in this module and consumed by
/// [`Table::define`](crate::schema::Table::define).
#[derive(Debug, Clone)]
pub struct FieldDecl {
    kind: DeclKind,
    optional: bool,
    nullable: bool,
    has_default: bool,
    default: Option<Value>,
    min: Option<f64>,
    max: Option<f64>,
    min_len: Option<usize>,
    max_len: Option<usize>,
    options: Option<Vec<Value>>,
    metadata: serde_json::Map<String, serde_json::Value>,
    primary: bool,
    unique: bool,
    indexed: bool,
    reference: Option<Reference>,
}

/// Declare a single-line text field.
pub fn text() -> FieldDecl {
    FieldDecl::new(DeclKind::Text { format: None })
}

/// Declare an email-formatted text field.
pub fn email() -> FieldDecl {
    FieldDecl::new(DeclKind::Text {
        format: Some(TextFormat::Email),
    })
}

/// Declare a URL-formatted text field.
pub fn url() -> FieldDecl {
    FieldDecl::new(DeclKind::Text {
        format: Some(TextFormat::Url),
    })
}

/// Declare a floating-point number field.
pub fn number() -> FieldDecl {
    FieldDecl::new(DeclKind::Number { integer: false })
}

/// Declare an integer field.
pub fn integer() -> FieldDecl {
    FieldDecl::new(DeclKind::Number { integer: true })
}

/// Declare a boolean field.
pub fn boolean() -> FieldDecl {
    FieldDecl::new(DeclKind::Bool)
}

/// Declare a calendar-date field.
pub fn date() -> FieldDecl {
    FieldDecl::new(DeclKind::Date { with_time: false })
}

/// Declare a date-and-time field.
pub fn datetime() -> FieldDecl {
    FieldDecl::new(DeclKind::Date { with_time: true })
}

/// Declare a JSON field.
pub fn json() -> FieldDecl {
    FieldDecl::new(DeclKind::Json)
}

impl FieldDecl {
    fn new(kind: DeclKind) -> Self {
        Self {
            kind,
            optional: false,
            nullable: false,
            has_default: false,
            default: None,
            min: None,
            max: None,
            min_len: None,
            max_len: None,
            options: None,
            metadata: serde_json::Map::new(),
            primary: false,
            unique: false,
            indexed: false,
            reference: None,
        }
    }

    /// Mark the field optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark the field nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Supply a default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.has_default = true;
        self.default = Some(value.into());
        self
    }

    /// Supply a computed default, evaluated once at declaration time.
    ///
    /// Evaluation failure is tolerated: the declaration still carries a
    /// default (so the field is not required), but no value is recorded.
    pub fn default_with(mut self, f: impl FnOnce() -> DbResult<Value>) -> Self {
        self.has_default = true;
        self.default = f().ok();
        self
    }

    /// Set a minimum numeric bound.
    pub fn min(mut self, bound: f64) -> Self {
        self.min = Some(bound);
        self
    }

    /// Set a maximum numeric bound.
    pub fn max(mut self, bound: f64) -> Self {
        self.max = Some(bound);
        self
    }

    /// Set a minimum length bound.
    pub fn min_len(mut self, bound: usize) -> Self {
        self.min_len = Some(bound);
        self
    }

    /// Set a maximum length bound.
    pub fn max_len(mut self, bound: usize) -> Self {
        self.max_len = Some(bound);
        self
    }

    /// Restrict the field to an enumerated option list.
    pub fn options<T>(mut self, options: impl IntoIterator<Item = T>) -> Self
    where
        T: Into<Value>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    /// Attach a display-metadata entry.
    ///
    /// Entries from later calls override earlier entries with the same key,
    /// mirroring outer declaration layers overriding inner ones.
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Mark the field as the table's primary key.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Mark the field unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark the field indexed.
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Declare a foreign-key reference to the target table's primary key.
    pub fn references(self, target: &Table) -> DbResult<Self> {
        let pk = target.primary_key().ok_or_else(|| {
            DbError::definition(format!(
                "cannot reference table '{}': it has no primary key",
                target.name()
            ))
        })?;
        let pk = pk.to_string();
        self.references_field(target, &pk)
    }

    /// Declare a foreign-key reference to a specific field on the target.
    pub fn references_field(mut self, target: &Table, field: &str) -> DbResult<Self> {
        let column = target.column(field).map_err(|_| {
            DbError::definition(format!(
                "cannot reference '{}.{}': no such field",
                target.name(),
                field
            ))
        })?;
        self.reference = Some(Reference {
            table: target.name().to_string(),
            field: field.to_string(),
            column: column.to_string(),
            alias: None,
            on_delete: None,
        });
        Ok(self)
    }

    /// Name the relationship declared by [`references`](Self::references).
    pub fn join_alias(mut self, alias: impl Into<String>) -> Self {
        if let Some(reference) = self.reference.as_mut() {
            reference.alias = Some(alias.into());
        }
        self
    }

    /// Set the delete behavior of the declared reference.
    pub fn on_delete(mut self, behavior: OnDelete) -> Self {
        if let Some(reference) = self.reference.as_mut() {
            reference.on_delete = Some(behavior);
        }
        self
    }

    /// Classify the declaration into the closed [`FieldType`] enumeration.
    fn classify(&self) -> FieldType {
        if self.options.is_some() {
            return FieldType::Select;
        }
        match self.kind {
            DeclKind::Text {
                format: Some(TextFormat::Email),
            } => FieldType::Email,
            DeclKind::Text {
                format: Some(TextFormat::Url),
            } => FieldType::Url,
            DeclKind::Text { format: None } => {
                if self.max_len.is_some_and(|len| len > LONG_TEXT_THRESHOLD) {
                    FieldType::Textarea
                } else {
                    FieldType::Text
                }
            }
            DeclKind::Number { integer: true } => FieldType::Integer,
            DeclKind::Number { integer: false } => FieldType::Number,
            DeclKind::Bool => FieldType::Checkbox,
            DeclKind::Date { with_time: true } => FieldType::DateTime,
            DeclKind::Date { with_time: false } => FieldType::Date,
            DeclKind::Json => FieldType::Json,
        }
    }

    pub(crate) fn into_meta(self) -> FieldMeta {
        let field_type = self.classify();
        FieldMeta {
            field_type,
            // required iff no layer marked the field optional, nullable or
            // defaulted
            required: !(self.optional || self.nullable || self.has_default),
            min: self.min,
            max: self.max,
            min_len: self.min_len,
            max_len: self.max_len,
            default: self.default,
            options: self.options,
            primary: self.primary,
            unique: self.unique,
            indexed: self.indexed,
            reference: self.reference,
            metadata: self.metadata,
        }
    }
}

/// Derived per-field metadata, computed once at table-definition time.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMeta {
    /// Derived field type.
    pub field_type: FieldType,
    /// Whether a value must be supplied.
    pub required: bool,
    /// Minimum numeric bound, if declared.
    pub min: Option<f64>,
    /// Maximum numeric bound, if declared.
    pub max: Option<f64>,
    /// Minimum length bound, if declared.
    pub min_len: Option<usize>,
    /// Maximum length bound, if declared.
    pub max_len: Option<usize>,
    /// Default value, if declared and successfully computed.
    pub default: Option<Value>,
    /// Enumerated option list, if declared.
    pub options: Option<Vec<Value>>,
    /// Whether this field is the primary key.
    pub primary: bool,
    /// Whether this field carries a unique constraint.
    pub unique: bool,
    /// Whether this field is indexed.
    pub indexed: bool,
    /// Foreign-key reference, if declared.
    pub reference: Option<Reference>,
    /// Merged display metadata.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_by_format() {
        assert_eq!(text().into_meta().field_type, FieldType::Text);
        assert_eq!(email().into_meta().field_type, FieldType::Email);
        assert_eq!(url().into_meta().field_type, FieldType::Url);
        assert_eq!(number().into_meta().field_type, FieldType::Number);
        assert_eq!(integer().into_meta().field_type, FieldType::Integer);
        assert_eq!(boolean().into_meta().field_type, FieldType::Checkbox);
        assert_eq!(date().into_meta().field_type, FieldType::Date);
        assert_eq!(datetime().into_meta().field_type, FieldType::DateTime);
        assert_eq!(json().into_meta().field_type, FieldType::Json);
    }

    #[test]
    fn long_text_reclassifies_as_textarea() {
        assert_eq!(text().max_len(500).into_meta().field_type, FieldType::Text);
        assert_eq!(
            text().max_len(501).into_meta().field_type,
            FieldType::Textarea
        );
    }

    #[test]
    fn option_list_classifies_as_select() {
        let meta = text().options(["draft", "published"]).into_meta();
        assert_eq!(meta.field_type, FieldType::Select);
        assert_eq!(meta.options.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn required_unless_optional_nullable_or_defaulted() {
        assert!(text().into_meta().required);
        assert!(!text().optional().into_meta().required);
        assert!(!text().nullable().into_meta().required);
        assert!(!text().default_value("x").into_meta().required);
    }

    #[test]
    fn failed_computed_default_is_tolerated() {
        let meta = integer()
            .default_with(|| Err(DbError::definition("boom")))
            .into_meta();
        assert!(meta.default.is_none());
        // the declaration still carries a default layer
        assert!(!meta.required);
    }

    #[test]
    fn later_metadata_overrides_earlier() {
        let meta = text()
            .metadata("label", serde_json::json!("inner"))
            .metadata("hint", serde_json::json!("keep"))
            .metadata("label", serde_json::json!("outer"))
            .into_meta();
        assert_eq!(meta.metadata["label"], serde_json::json!("outer"));
        assert_eq!(meta.metadata["hint"], serde_json::json!("keep"));
    }
}
