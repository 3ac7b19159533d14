use std::sync::Arc;

use tracing::instrument;

use crate::libs::error::{AdminError, Result};
use crate::libs::schema::{ColumnDescriptor, FieldAffordance, TableDescriptor};
use crate::libs::store::AdminStore;

/// Reads table structure from the catalog. Nothing is cached: every call
/// sees the schema as it is now.
#[derive(Clone)]
pub struct Introspector {
    store: Arc<dyn AdminStore>,
}

impl Introspector {
    pub fn new(store: Arc<dyn AdminStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        self.store.list_tables().await
    }

    /// Columns in physical order. An unknown table yields an empty list; use
    /// [`Introspector::require_table`] to tell the two apart.
    #[instrument(skip(self))]
    pub async fn describe_table(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        self.store.describe_table(table).await
    }

    /// Checks `table` against a fresh table list and returns its columns.
    /// Any name about to be interpolated into a row statement passes here first.
    #[instrument(skip(self))]
    pub async fn require_table(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let known = self
            .store
            .list_tables()
            .await?
            .iter()
            .any(|t| t.name == table);
        if !known {
            return Err(AdminError::not_found(format!("table '{table}' does not exist")));
        }
        self.store.describe_table(table).await
    }

    /// Editing affordances for each column of `table`.
    pub async fn form(&self, table: &str) -> Result<Vec<FieldAffordance>> {
        let columns = self.require_table(table).await?;
        Ok(columns.iter().map(ColumnDescriptor::affordance).collect())
    }
}
