//! JSON API over the admin services.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::Serialize;
use serde_json::Value;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::libs::definition::CreateTableRequest;
use crate::libs::error::AdminError;
use crate::libs::introspector::Introspector;
use crate::libs::rows::{DeleteMode, RowService};
use crate::libs::schema::{ColumnDescriptor, FieldAffordance, Row, TableDescriptor};
use crate::libs::store::AdminStore;
use crate::libs::tables::TableService;

#[derive(Clone)]
pub struct AppState {
    pub introspector: Introspector,
    pub rows: RowService,
    pub tables: TableService,
}

impl AppState {
    pub fn new(store: Arc<dyn AdminStore>) -> Self {
        Self {
            introspector: Introspector::new(store.clone()),
            rows: RowService::new(store.clone()),
            tables: TableService::new(store),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Error body: a short summary plus the underlying message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    details: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, details: impl Into<String>) -> Self {
        Self {
            status,
            error,
            details: details.into(),
        }
    }

    /// Wraps `err` under the summary `error`, picking the status from its kind.
    pub fn from_admin(error: &'static str, err: AdminError) -> Self {
        let status = match &err {
            AdminError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
            AdminError::Validation(_) => StatusCode::BAD_REQUEST,
        };
        if status.is_server_error() {
            tracing::error!(error, details = %err, "request failed");
        }
        Self::new(status, error, err.to_string())
    }
}

fn fail(error: &'static str) -> impl FnOnce(AdminError) -> ApiError {
    move |err| ApiError::from_admin(error, err)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    details: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error.to_string(),
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub mode: DeleteMode,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn list_tables(State(state): State<AppState>) -> ApiResult<Json<Vec<TableDescriptor>>> {
    let tables = state
        .introspector
        .list_tables()
        .await
        .map_err(fail("Failed to fetch tables"))?;
    Ok(Json(tables))
}

pub async fn table_schema(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> ApiResult<Json<Vec<ColumnDescriptor>>> {
    let columns = state
        .introspector
        .require_table(&table)
        .await
        .map_err(fail("Failed to fetch table schema"))?;
    Ok(Json(columns))
}

pub async fn table_form(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> ApiResult<Json<Vec<FieldAffordance>>> {
    let form = state
        .introspector
        .form(&table)
        .await
        .map_err(fail("Failed to fetch table form"))?;
    Ok(Json(form))
}

pub async fn table_data(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> ApiResult<Json<Vec<Row>>> {
    let rows = state
        .rows
        .list_rows(&table)
        .await
        .map_err(fail("Failed to fetch table data"))?;
    Ok(Json(rows))
}

pub async fn insert_row(
    State(state): State<AppState>,
    Path(table): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Row>)> {
    const ERROR: &str = "Failed to insert row";
    let payload = into_row(payload).map_err(fail(ERROR))?;
    let row = state
        .rows
        .insert_row(&table, payload)
        .await
        .map_err(fail(ERROR))?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn update_row(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Row>> {
    const ERROR: &str = "Failed to update row";
    let id = parse_id(&id).map_err(fail(ERROR))?;
    let payload = into_row(payload).map_err(fail(ERROR))?;
    let row = state
        .rows
        .update_row(&table, id, payload)
        .await
        .map_err(fail(ERROR))?;
    Ok(Json(row))
}

pub async fn soft_delete_row(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> ApiResult<Json<DeleteResponse>> {
    remove_row(state, &table, &id, false).await
}

pub async fn hard_delete_row(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> ApiResult<Json<DeleteResponse>> {
    remove_row(state, &table, &id, true).await
}

async fn remove_row(
    state: AppState,
    table: &str,
    id: &str,
    hard: bool,
) -> ApiResult<Json<DeleteResponse>> {
    const ERROR: &str = "Failed to delete row";
    let id = parse_id(id).map_err(fail(ERROR))?;
    let deletion = state
        .rows
        .delete_row(table, id, hard)
        .await
        .map_err(fail(ERROR))?;

    if !deletion.removed {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "Row not found",
            format!("no row with id {id} in table '{table}'"),
        ));
    }

    let message = match deletion.mode {
        DeleteMode::Soft => "Row marked as deleted",
        DeleteMode::Hard => "Row permanently deleted",
    };
    Ok(Json(DeleteResponse {
        message: message.to_string(),
        mode: deletion.mode,
    }))
}

pub async fn create_table(
    State(state): State<AppState>,
    request: Result<Json<CreateTableRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    const ERROR: &str = "Failed to create table";
    let Json(request) = request.map_err(|rejection| {
        ApiError::new(StatusCode::BAD_REQUEST, ERROR, rejection.body_text())
    })?;
    let definition = state
        .tables
        .create_table(&request)
        .await
        .map_err(fail(ERROR))?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("Table '{}' created", definition.name),
        }),
    ))
}

pub async fn delete_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .tables
        .delete_table(&table)
        .await
        .map_err(fail("Failed to delete table"))?;
    Ok(Json(MessageResponse {
        message: format!("Table '{table}' deleted"),
    }))
}

fn parse_id(raw: &str) -> Result<i64, AdminError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AdminError::validation(format!("row id '{raw}' is not an integer")))
}

fn into_row(payload: Result<Json<Value>, JsonRejection>) -> Result<Row, AdminError> {
    match payload {
        Ok(Json(Value::Object(map))) => Ok(map),
        Ok(_) => Err(AdminError::validation("row payload must be a JSON object")),
        Err(rejection) => Err(AdminError::validation(rejection.body_text())),
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/api/tables", get(list_tables))
        .route("/api/tables/create", post(create_table))
        .route("/api/tables/{table}", delete(delete_table))
        .route("/api/tables/{table}/schema", get(table_schema))
        .route("/api/tables/{table}/form", get(table_form))
        .route("/api/tables/{table}/data", get(table_data))
        .route("/api/tables/{table}/rows", post(insert_row))
        .route(
            "/api/tables/{table}/rows/{id}",
            put(update_row).delete(soft_delete_row),
        )
        .route(
            "/api/tables/{table}/rows/{id}/hard-delete",
            delete(hard_delete_row),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ]),
        )
        .with_state(state)
}
