use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::libs::error::{AdminError, Result};
use crate::libs::introspector::Introspector;
use crate::libs::query_builder::Assignment;
use crate::libs::schema::{
    ColumnDescriptor, ID_COLUMN, Row, SOFT_DELETE_COLUMN, find_column, is_server_owned,
};
use crate::libs::store::AdminStore;

/// How a row was deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    /// `is_deleted` set to `'true'`; the row is still there.
    Soft,
    /// The row was physically removed.
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deletion {
    pub mode: DeleteMode,
    /// False when no row had the requested id.
    pub removed: bool,
}

/// List, insert, update and delete rows of any catalog table.
#[derive(Clone)]
pub struct RowService {
    store: Arc<dyn AdminStore>,
    introspector: Introspector,
}

impl RowService {
    pub fn new(store: Arc<dyn AdminStore>) -> Self {
        Self {
            introspector: Introspector::new(store.clone()),
            store,
        }
    }

    /// All rows of `table`, by `id` ascending when the table has one.
    #[instrument(skip(self))]
    pub async fn list_rows(&self, table: &str) -> Result<Vec<Row>> {
        let columns = self.introspector.require_table(table).await?;
        let order_by = find_column(&columns, ID_COLUMN).map(|c| c.name.as_str());
        self.store.select_rows(table, order_by).await
    }

    /// Inserts `payload` and returns the stored row with its generated fields.
    /// Server-owned keys in the payload are dropped.
    #[instrument(skip(self, payload))]
    pub async fn insert_row(&self, table: &str, payload: Row) -> Result<Row> {
        let columns = self.introspector.require_table(table).await?;
        let values = assignments(table, &columns, &strip_server_owned(payload))?;
        let row = self.store.insert_row(table, &values).await?;
        info!(table, id = ?row.get(ID_COLUMN), "row inserted");
        Ok(row)
    }

    /// Applies `payload` to the row with `id`. Server-owned keys are dropped;
    /// nothing left to set is a validation error and runs no statement.
    #[instrument(skip(self, payload))]
    pub async fn update_row(&self, table: &str, id: i64, payload: Row) -> Result<Row> {
        let payload = strip_server_owned(payload);
        if payload.is_empty() {
            return Err(AdminError::validation("no fields to update"));
        }

        let columns = self.introspector.require_table(table).await?;
        let key = id_key(table, &columns, id)?;
        let values = assignments(table, &columns, &payload)?;
        let Some(key) = key else {
            return Err(row_not_found(table, id));
        };
        self.store
            .update_row(table, &key, &values)
            .await?
            .ok_or_else(|| row_not_found(table, id))
    }

    /// Deletes the row with `id`.
    ///
    /// With `hard` unset, tables carrying an `is_deleted` column get the flag
    /// set to `'true'`; tables without it lose the row for good.
    #[instrument(skip(self))]
    pub async fn delete_row(&self, table: &str, id: i64, hard: bool) -> Result<Deletion> {
        let columns = self.introspector.require_table(table).await?;
        let key = id_key(table, &columns, id)?;
        let flag = find_column(&columns, SOFT_DELETE_COLUMN).filter(|_| !hard);

        let Some(key) = key else {
            let mode = if flag.is_some() { DeleteMode::Soft } else { DeleteMode::Hard };
            return Ok(Deletion { mode, removed: false });
        };

        if !hard {
            if let Some(flag) = flag {
                let values = [Assignment::text(flag, "true")];
                let updated = self.store.update_row(table, &key, &values).await?;
                return Ok(Deletion {
                    mode: DeleteMode::Soft,
                    removed: updated.is_some(),
                });
            }
            warn!(
                table,
                id, "table has no {SOFT_DELETE_COLUMN} column, deleting row permanently"
            );
        }

        let affected = self.store.delete_row(table, &key).await?;
        Ok(Deletion {
            mode: DeleteMode::Hard,
            removed: affected == 1,
        })
    }
}

fn strip_server_owned(mut payload: Row) -> Row {
    payload.retain(|column, _| !is_server_owned(column));
    payload
}

/// Pairs each payload key with its catalog column, keeping payload order.
fn assignments(table: &str, columns: &[ColumnDescriptor], payload: &Row) -> Result<Vec<Assignment>> {
    payload
        .iter()
        .map(|(name, value): (&String, &Value)| -> Result<Assignment> {
            let column = find_column(columns, name).ok_or_else(|| {
                AdminError::validation(format!("table '{table}' has no column '{name}'"))
            })?;
            Ok(Assignment::new(column, value))
        })
        .collect()
}

/// The key matching `id`, or `None` when `id` cannot fit the column's
/// integer type and so cannot name any row.
fn id_key(table: &str, columns: &[ColumnDescriptor], id: i64) -> Result<Option<Assignment>> {
    let column = find_column(columns, ID_COLUMN).ok_or_else(|| {
        AdminError::validation(format!("table '{table}' has no '{ID_COLUMN}' column"))
    })?;
    let fits = match column.udt_name.as_str() {
        "int2" => i16::try_from(id).is_ok(),
        "int4" => i32::try_from(id).is_ok(),
        _ => true,
    };
    Ok(fits.then(|| Assignment::text(column, id.to_string())))
}

fn row_not_found(table: &str, id: i64) -> AdminError {
    AdminError::not_found(format!("no row with id {id} in table '{table}'"))
}
