use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tabledesk::{AppState, InMemoryStore, build_router};
use tower::ServiceExt;

fn app() -> Router {
    build_router(AppState::new(Arc::new(InMemoryStore::default())))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("valid request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

fn products_request() -> Value {
    json!({
        "tableName": "products",
        "columns": [
            {"name": "id", "type": "SERIAL", "isNullable": false, "isPrimaryKey": true, "defaultValue": "", "isAutoIncrement": true},
            {"name": "name", "type": "VARCHAR", "isNullable": false, "isPrimaryKey": false, "defaultValue": "100", "isAutoIncrement": false},
            {"name": "price", "type": "NUMERIC", "isNullable": true, "isPrimaryKey": false, "defaultValue": "10,2", "isAutoIncrement": false},
            {"name": "is_deleted", "type": "TEXT", "isNullable": true, "isPrimaryKey": false, "defaultValue": "false", "isAutoIncrement": false}
        ]
    })
}

fn notes_request() -> Value {
    json!({
        "tableName": "notes",
        "columns": [
            {"name": "id", "type": "SERIAL", "isNullable": false, "isPrimaryKey": true, "isAutoIncrement": true},
            {"name": "body", "type": "TEXT"}
        ]
    })
}

async fn app_with_tables() -> Router {
    let app = app();
    let (status, _) = send(&app, "POST", "/api/tables/create", Some(products_request())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&app, "POST", "/api/tables/create", Some(notes_request())).await;
    assert_eq!(status, StatusCode::CREATED);
    app
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = send(&app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn lists_tables_and_schema() {
    let app = app_with_tables().await;

    let (status, tables) = send(&app, "GET", "/api/tables", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        tables,
        json!([
            {"table_name": "notes", "table_schema": "public"},
            {"table_name": "products", "table_schema": "public"}
        ])
    );

    let (status, schema) = send(&app, "GET", "/api/tables/products/schema", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = schema
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["column_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["id", "name", "price", "is_deleted", "created_at"]);
    assert_eq!(schema[1]["data_type"], "character varying");
    assert_eq!(schema[1]["is_nullable"], false);
    assert_eq!(schema[1]["max_length"], 100);

    let (status, body) = send(&app, "GET", "/api/tables/ghosts/schema", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Failed to fetch table schema");
}

#[tokio::test]
async fn form_describes_editing_affordances() {
    let app = app_with_tables().await;
    let (status, form) = send(&app, "GET", "/api/tables/products/form", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(form[0]["column_name"], "id");
    assert_eq!(form[0]["editable"], false);
    assert_eq!(form[1]["input"], "text");
    assert_eq!(form[1]["required"], true);
    assert_eq!(form[2]["input"], "decimal");
    assert_eq!(form[3]["input"], "toggle");
    assert_eq!(form[4]["input"], "datetime");
}

#[tokio::test]
async fn row_lifecycle() {
    let app = app_with_tables().await;

    let (status, created) = send(
        &app,
        "POST",
        "/api/tables/products/rows",
        Some(json!({"name": "Lamp", "price": "19.5"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 1);
    assert_eq!(created["name"], "Lamp");
    assert_eq!(created["price"], 19.5);
    assert_eq!(created["is_deleted"], "false");
    assert!(created["created_at"].is_string());

    let (_, second) = send(
        &app,
        "POST",
        "/api/tables/products/rows",
        Some(json!({"name": "Desk"})),
    )
    .await;
    assert_eq!(second["id"], 2);

    let (status, updated) = send(
        &app,
        "PUT",
        "/api/tables/products/rows/1",
        Some(json!({"id": 1, "created_at": "2000-01-01", "name": "Floor lamp"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Floor lamp");
    assert_eq!(updated["created_at"], created["created_at"]);

    let (status, rows) = send(&app, "GET", "/api/tables/products/data", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = rows.as_array().unwrap().iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, [json!(1), json!(2)]);
}

#[tokio::test]
async fn update_validation_and_not_found() {
    let app = app_with_tables().await;
    send(
        &app,
        "POST",
        "/api/tables/notes/rows",
        Some(json!({"body": "x"})),
    )
    .await;

    let (status, body) = send(
        &app,
        "PUT",
        "/api/tables/notes/rows/1",
        Some(json!({"id": 1, "created_at": "now"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Failed to update row");
    assert!(body["details"].as_str().unwrap().contains("no fields to update"));

    let (status, _) = send(
        &app,
        "PUT",
        "/api/tables/notes/rows/77",
        Some(json!({"body": "y"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/tables/notes/rows/3000000000",
        Some(json!({"body": "y"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/api/tables/notes/rows/3000000000", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/tables/notes/rows/abc",
        Some(json!({"body": "y"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/tables/notes/rows/1",
        Some(json!({"nope": "y"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn statement_failures_are_server_errors() {
    let app = app_with_tables().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/tables/products/rows",
        Some(json!({"name": "x".repeat(101)})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to insert row");
    assert!(body["details"].as_str().unwrap().contains("too long"));
}

#[tokio::test]
async fn soft_delete_toggles_and_falls_back_to_hard_delete() {
    let app = app_with_tables().await;
    send(
        &app,
        "POST",
        "/api/tables/products/rows",
        Some(json!({"name": "Lamp"})),
    )
    .await;
    send(
        &app,
        "POST",
        "/api/tables/notes/rows",
        Some(json!({"body": "x"})),
    )
    .await;

    let (status, body) = send(&app, "DELETE", "/api/tables/products/rows/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "soft");
    let (_, rows) = send(&app, "GET", "/api/tables/products/data", None).await;
    assert_eq!(rows[0]["is_deleted"], "true");

    let (_, restored) = send(
        &app,
        "PUT",
        "/api/tables/products/rows/1",
        Some(json!({"is_deleted": "false"})),
    )
    .await;
    assert_eq!(restored["is_deleted"], "false");

    let (status, body) = send(&app, "DELETE", "/api/tables/notes/rows/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "hard");
    let (_, rows) = send(&app, "GET", "/api/tables/notes/data", None).await;
    assert_eq!(rows, json!([]));

    let (status, body) = send(&app, "DELETE", "/api/tables/notes/rows/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Row not found");

    let (status, body) = send(
        &app,
        "DELETE",
        "/api/tables/products/rows/1/hard-delete",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "hard");
    let (_, rows) = send(&app, "GET", "/api/tables/products/data", None).await;
    assert_eq!(rows, json!([]));
}

#[tokio::test]
async fn create_table_rejects_malformed_requests() {
    let app = app();

    let mut request = products_request();
    request["tableName"] = json!("1abc");
    let (status, body) = send(&app, "POST", "/api/tables/create", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Failed to create table");

    let mut request = products_request();
    request["columns"][0]["isPrimaryKey"] = json!(false);
    let (status, _) = send(&app, "POST", "/api/tables/create", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/tables/create",
        Some(json!({"columns": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, tables) = send(&app, "GET", "/api/tables", None).await;
    assert_eq!(tables, json!([]));
}

#[tokio::test]
async fn delete_table_drops_it() {
    let app = app_with_tables().await;
    let (status, body) = send(&app, "DELETE", "/api/tables/notes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Table 'notes' deleted");

    let (status, _) = send(&app, "GET", "/api/tables/notes/data", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/api/tables/notes", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
