//! End-to-end composition: schema metadata through fragments and templates
//! to rendered SQL dispatched at the driver seam.

mod common;

use std::sync::Arc;

use common::{MemoryDriver, MemoryStore};
use sqlstitch::prelude::*;

fn schema() -> (Table, Table) {
    let users = Table::define("users")
        .field("id", integer().primary())
        .field("userName", text().unique())
        .field("age", integer().optional())
        .build()
        .unwrap();
    let posts = Table::define("posts")
        .field("id", integer().primary())
        .field("title", text())
        .field(
            "authorId",
            integer().references(&users).unwrap().indexed(),
        )
        .build()
        .unwrap();
    (users, posts)
}

#[tokio::test]
async fn select_with_where_reaches_driver_in_postgres_form() {
    let store = Arc::new(MemoryStore::default());
    let db = Database::new(
        Arc::new(MemoryDriver::new(Arc::clone(&store))),
        DatabaseConfig::new(Dialect::Postgres),
    );
    let (users, _) = schema();

    let mut q = sql("SELECT * FROM ");
    q.push_bind(ident("users"));
    q.push(" WHERE ");
    q.merge(
        &where_clause(
            &users,
            &Conditions::new()
                .field("userName", "alice")
                .field("age", Filter::new().gte(18).lt(65)),
        )
        .unwrap(),
    );

    db.fetch_all(&q).await.unwrap();

    let executed = store.executed_sql();
    assert_eq!(
        executed,
        [
            "SELECT * FROM \"users\" WHERE \"user_name\" = $1 \
             AND \"age\" < $2 AND \"age\" >= $3"
        ]
    );
}

#[tokio::test]
async fn update_with_set_and_join_condition() {
    let store = Arc::new(MemoryStore::default());
    let db = Database::new(
        Arc::new(MemoryDriver::new(Arc::clone(&store))),
        DatabaseConfig::new(Dialect::Sqlite),
    );
    let (users, posts) = schema();

    let mut q = sql("UPDATE ");
    q.push_bind(ident("users"));
    q.push(" SET ");
    q.merge(&set_clause(&users, &Assignments::new().set("userName", bind("bob"))).unwrap());
    q.push(" WHERE ");
    q.merge(&on_clause(&posts, "authorId").unwrap());

    let affected = db.execute(&q).await.unwrap();
    assert_eq!(affected, 1);
    assert!(db.supports_affected_rows());

    let executed = store.executed_sql();
    assert_eq!(
        executed,
        [
            "UPDATE \"users\" SET \"user_name\" = ? \
             WHERE \"users\".\"id\" = \"posts\".\"author_id\""
        ]
    );
}

#[tokio::test]
async fn picked_table_restricts_fragment_fields() {
    let (users, _) = schema();
    let picked = users.pick(&["id", "age"]).unwrap();

    // the projected table no longer resolves the dropped field
    let err = where_clause(&picked, &Conditions::new().field("userName", "alice")).unwrap_err();
    assert!(err.is_usage());

    let t = where_clause(&picked, &Conditions::new().field("age", Filter::new().gt(21))).unwrap();
    let rendered = render_sql(&t, Dialect::MySql);
    assert_eq!(rendered.sql, "`age` > ?");
}
