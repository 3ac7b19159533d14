//! Runs against a live database when `TABLEDESK_TEST_DATABASE_URL` is set;
//! otherwise every test returns immediately.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tabledesk::{
    AdminError, AdminStore, ColumnSpec, CreateTableRequest, DeleteMode, Introspector, PgStore,
    Row, RowService, TableService,
};

struct Harness {
    introspector: Introspector,
    rows: RowService,
    tables: TableService,
}

async fn harness() -> Option<Harness> {
    let url = std::env::var("TABLEDESK_TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to test database");
    let store: Arc<dyn AdminStore> = Arc::new(PgStore::new(pool, "public"));
    Some(Harness {
        introspector: Introspector::new(store.clone()),
        rows: RowService::new(store.clone()),
        tables: TableService::new(store),
    })
}

fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    format!("{prefix}_{}_{nanos}", std::process::id())
}

fn column(name: &str, ty: &str, default: Option<&str>) -> ColumnSpec {
    ColumnSpec {
        name: name.into(),
        data_type: ty.into(),
        is_nullable: true,
        is_primary_key: false,
        default_value: default.map(str::to_string),
        is_auto_increment: false,
    }
}

fn id_column() -> ColumnSpec {
    ColumnSpec {
        is_nullable: false,
        is_primary_key: true,
        is_auto_increment: true,
        ..column("id", "SERIAL", None)
    }
}

fn payload(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn designed_table_round_trips_through_the_catalog() {
    let Some(h) = harness().await else { return };
    let name = unique("td_products");
    let request = CreateTableRequest {
        table_name: name.clone(),
        columns: vec![
            id_column(),
            ColumnSpec {
                is_nullable: false,
                ..column("name", "VARCHAR", Some("100"))
            },
            column("price", "NUMERIC", Some("10,2")),
            column("status", "TEXT", Some("draft")),
        ],
    };
    h.tables.create_table(&request).await.unwrap();

    let listed = h.introspector.list_tables().await.unwrap();
    assert!(listed.iter().any(|t| t.name == name && t.schema == "public"));

    let columns = h.introspector.describe_table(&name).await.unwrap();
    let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "name", "price", "status", "created_at"]);
    assert!(columns[0].is_primary_key);
    assert_eq!(columns[1].data_type, "character varying");
    assert_eq!(columns[1].max_length, Some(100));
    assert!(!columns[1].nullable);
    assert_eq!(columns[3].default_expr.as_deref(), Some("'draft'::text"));

    h.tables.delete_table(&name).await.unwrap();
    let listed = h.introspector.list_tables().await.unwrap();
    assert!(listed.iter().all(|t| t.name != name));
}

#[tokio::test]
async fn rows_are_inserted_updated_and_deleted() {
    let Some(h) = harness().await else { return };
    let name = unique("td_posts");
    let request = CreateTableRequest {
        table_name: name.clone(),
        columns: vec![
            id_column(),
            column("title", "TEXT", None),
            column("views", "INTEGER", Some("0")),
            column("is_deleted", "TEXT", Some("false")),
        ],
    };
    h.tables.create_table(&request).await.unwrap();

    let first = h
        .rows
        .insert_row(&name, payload(json!({"id": 40, "title": "hello", "views": "3"})))
        .await
        .unwrap();
    assert_eq!(first["title"], json!("hello"));
    assert_eq!(first["views"], json!(3));
    assert_eq!(first["is_deleted"], json!("false"));
    assert!(first["created_at"].is_string());
    let id = first["id"].as_i64().unwrap();
    assert_ne!(id, 40);

    let second = h
        .rows
        .insert_row(&name, payload(json!({"title": "again"})))
        .await
        .unwrap();
    assert!(second["id"].as_i64().unwrap() > id);

    let updated = h
        .rows
        .update_row(&name, id, payload(json!({"created_at": "2001-01-01", "views": 9})))
        .await
        .unwrap();
    assert_eq!(updated["views"], json!(9));
    assert_eq!(updated["created_at"], first["created_at"]);

    let err = h
        .rows
        .update_row(&name, id, payload(json!({"id": 1})))
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::Validation(_)));

    let deletion = h.rows.delete_row(&name, id, false).await.unwrap();
    assert_eq!(deletion.mode, DeleteMode::Soft);
    let listed = h.rows.list_rows(&name).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["is_deleted"], json!("true"));

    let deletion = h.rows.delete_row(&name, id, true).await.unwrap();
    assert_eq!(deletion.mode, DeleteMode::Hard);
    assert!(deletion.removed);
    let listed = h.rows.list_rows(&name).await.unwrap();
    assert_eq!(listed, vec![second]);

    h.tables.delete_table(&name).await.unwrap();
}

#[tokio::test]
async fn constraint_violations_surface_as_query_errors() {
    let Some(h) = harness().await else { return };
    let name = unique("td_people");
    let request = CreateTableRequest {
        table_name: name.clone(),
        columns: vec![
            id_column(),
            ColumnSpec {
                is_nullable: false,
                ..column("name", "VARCHAR", Some("5"))
            },
        ],
    };
    h.tables.create_table(&request).await.unwrap();

    let err = h
        .rows
        .insert_row(&name, payload(json!({"name": "Bartholomew"})))
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::Query(_)));

    let err = h.rows.insert_row(&name, Row::new()).await.unwrap_err();
    assert!(matches!(err, AdminError::Query(_)));

    let err = h.tables.create_table(&request).await.unwrap_err();
    assert!(matches!(err, AdminError::Query(_)));

    let err = h
        .rows
        .update_row(&name, 3_000_000_000, payload(json!({"name": "Al"})))
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::NotFound(_)));
    let deletion = h.rows.delete_row(&name, 3_000_000_000, true).await.unwrap();
    assert!(!deletion.removed);

    h.tables.delete_table(&name).await.unwrap();
}

#[tokio::test]
async fn hostile_names_never_reach_the_database() {
    let Some(h) = harness().await else { return };
    let err = h
        .rows
        .list_rows("pg_class; DROP TABLE users")
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::NotFound(_)));

    let request = CreateTableRequest {
        table_name: "x\"; DROP TABLE users; --".into(),
        columns: vec![id_column(), column("a", "TEXT", None)],
    };
    let err = h.tables.create_table(&request).await.unwrap_err();
    assert!(matches!(err, AdminError::Validation(_)));

    let request = CreateTableRequest {
        table_name: unique("td_nan"),
        columns: vec![id_column(), column("ratio", "DOUBLE PRECISION", Some("NaN"))],
    };
    let err = h.tables.create_table(&request).await.unwrap_err();
    assert!(matches!(err, AdminError::Validation(_)));
}
