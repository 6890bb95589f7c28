//! Schema-definition statement generation.
//!
//! Turns a [`Table`] into `CREATE TABLE IF NOT EXISTS` and
//! `CREATE INDEX` templates. The resulting templates are rendered through
//! [`render_ddl`](crate::render::render_ddl), which inlines default values
//! as literals (DDL value positions do not support placeholders).

use crate::render::Dialect;
use crate::schema::{FieldType, Table};
use crate::template::{Template, bind, ident};

/// Map a field type onto a column type for a dialect.
fn column_type(field_type: FieldType, dialect: Dialect) -> &'static str {
    use FieldType::*;
    match (field_type, dialect) {
        (Text | Email | Url | Select, Dialect::MySql) => "VARCHAR(255)",
        (Text | Email | Url | Select, _) => "TEXT",
        (Textarea, _) => "TEXT",
        (Number, Dialect::Postgres) => "DOUBLE PRECISION",
        (Number, Dialect::MySql) => "DOUBLE",
        (Number, Dialect::Sqlite) => "REAL",
        (Integer, Dialect::Sqlite) => "INTEGER",
        (Integer, _) => "BIGINT",
        (Checkbox, Dialect::Sqlite) => "INTEGER",
        (Checkbox, _) => "BOOLEAN",
        (Date, Dialect::Sqlite) => "TEXT",
        (Date, _) => "DATE",
        (DateTime, Dialect::Postgres) => "TIMESTAMPTZ",
        (DateTime, Dialect::MySql) => "DATETIME",
        (DateTime, Dialect::Sqlite) => "TEXT",
        (Json, Dialect::Postgres) => "JSONB",
        (Json, Dialect::MySql) => "JSON",
        (Json, Dialect::Sqlite) => "TEXT",
    }
}

/// Build the `CREATE TABLE IF NOT EXISTS` template for a table.
pub fn create_table(table: &Table, dialect: Dialect) -> Template {
    let mut t = Template::new("CREATE TABLE IF NOT EXISTS ");
    t.push_bind(ident(table.name()));
    t.push(" (");

    for (i, (field, meta)) in table.fields().enumerate() {
        if i > 0 {
            t.push(", ");
        }
        let column = table
            .column(field)
            .expect("field listed by fields() must resolve");
        t.push_bind(ident(column));
        t.push(" ");
        t.push(column_type(meta.field_type, dialect));

        if meta.required {
            t.push(" NOT NULL");
        }
        if let Some(default) = &meta.default {
            t.push(" DEFAULT ");
            t.push_bind(bind(default.clone()));
        }
        if meta.primary {
            t.push(" PRIMARY KEY");
        }
        if meta.unique {
            t.push(" UNIQUE");
        }
        if let Some(reference) = &meta.reference {
            t.push(" REFERENCES ");
            t.push_bind(ident(&reference.table));
            t.push(" (");
            t.push_bind(ident(&reference.column));
            t.push(")");
            if let Some(on_delete) = reference.on_delete {
                t.push(" ON DELETE ");
                t.push(on_delete.as_sql());
            }
        }
    }

    t.push(")");
    t
}

/// Build `CREATE INDEX` templates for a table's indexed fields and compound
/// indexes.
///
/// `IF NOT EXISTS` is emitted where the dialect supports it on indexes
/// (Postgres, SQLite); MySQL gets the plain form.
pub fn create_indexes(table: &Table, dialect: Dialect) -> Vec<Template> {
    let prefix = match dialect {
        Dialect::MySql => "CREATE INDEX ",
        Dialect::Postgres | Dialect::Sqlite => "CREATE INDEX IF NOT EXISTS ",
    };

    let mut groups: Vec<Vec<String>> = table
        .indexed_fields()
        .iter()
        .map(|field| vec![field.clone()])
        .collect();
    groups.extend(table.indexes().iter().cloned());

    let mut statements = Vec::with_capacity(groups.len());
    for fields in groups {
        let columns: Vec<String> = fields
            .iter()
            .map(|field| {
                table
                    .column(field)
                    .expect("index member validated at build time")
                    .to_string()
            })
            .collect();

        let mut t = Template::new(prefix);
        t.push_bind(ident(format!(
            "idx_{}_{}",
            table.name(),
            columns.join("_")
        )));
        t.push(" ON ");
        t.push_bind(ident(table.name()));
        t.push(" (");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                t.push(", ");
            }
            t.push_bind(ident(column));
        }
        t.push(")");
        statements.push(t);
    }
    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_ddl;
    use crate::schema::{OnDelete, boolean, integer, text};

    fn users() -> Table {
        Table::define("users")
            .field("id", integer().primary())
            .field("userName", text().unique())
            .field("active", boolean().default_value(true))
            .build()
            .unwrap()
    }

    #[test]
    fn create_table_postgres() {
        let sql = render_ddl(&create_table(&users(), Dialect::Postgres), Dialect::Postgres);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"users\" (\
             \"id\" BIGINT NOT NULL PRIMARY KEY, \
             \"user_name\" TEXT NOT NULL UNIQUE, \
             \"active\" BOOLEAN DEFAULT TRUE)"
        );
    }

    #[test]
    fn create_table_sqlite_booleans_inline_as_numbers() {
        let sql = render_ddl(&create_table(&users(), Dialect::Sqlite), Dialect::Sqlite);
        assert!(sql.contains("\"active\" INTEGER DEFAULT 1"));
    }

    #[test]
    fn create_table_renders_references() {
        let users = users();
        let posts = Table::define("posts")
            .field("id", integer().primary())
            .field(
                "authorId",
                integer()
                    .references(&users)
                    .unwrap()
                    .on_delete(OnDelete::Cascade),
            )
            .build()
            .unwrap();

        let sql = render_ddl(&create_table(&posts, Dialect::Postgres), Dialect::Postgres);
        assert!(sql.contains(
            "\"author_id\" BIGINT NOT NULL REFERENCES \"users\" (\"id\") ON DELETE CASCADE"
        ));
    }

    #[test]
    fn create_indexes_covers_single_and_compound() {
        let t = Table::define("events")
            .field("id", integer().primary())
            .field("kind", text().indexed())
            .field("createdAt", text())
            .index(&["kind", "createdAt"])
            .build()
            .unwrap();

        let statements = create_indexes(&t, Dialect::Postgres);
        let rendered: Vec<String> = statements
            .iter()
            .map(|s| render_ddl(s, Dialect::Postgres))
            .collect();
        assert_eq!(
            rendered,
            [
                "CREATE INDEX IF NOT EXISTS \"idx_events_kind\" ON \"events\" (\"kind\")",
                "CREATE INDEX IF NOT EXISTS \"idx_events_kind_created_at\" ON \"events\" \
                 (\"kind\", \"created_at\")",
            ]
        );
    }

    #[test]
    fn mysql_indexes_omit_if_not_exists() {
        let t = Table::define("events")
            .field("kind", text().indexed())
            .build()
            .unwrap();
        let statements = create_indexes(&t, Dialect::MySql);
        let sql = render_ddl(&statements[0], Dialect::MySql);
        assert!(sql.starts_with("CREATE INDEX `idx_events_kind`"));
    }
}
