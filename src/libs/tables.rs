use std::sync::Arc;

use tracing::{info, instrument};

use crate::libs::definition::{CreateTableRequest, TableDefinition};
use crate::libs::error::Result;
use crate::libs::introspector::Introspector;
use crate::libs::schema::{CREATED_AT_COLUMN, find_column};
use crate::libs::store::AdminStore;

/// Creates and drops whole tables.
#[derive(Clone)]
pub struct TableService {
    store: Arc<dyn AdminStore>,
    introspector: Introspector,
}

impl TableService {
    pub fn new(store: Arc<dyn AdminStore>) -> Self {
        Self {
            introspector: Introspector::new(store.clone()),
            store,
        }
    }

    /// Validates and creates the table, then makes sure it has a
    /// `created_at` column.
    #[instrument(skip(self, request), fields(table = %request.table_name))]
    pub async fn create_table(&self, request: &CreateTableRequest) -> Result<TableDefinition> {
        let definition = TableDefinition::from_request(request)?;
        self.store.create_table(&definition).await?;

        let columns = self.introspector.describe_table(&definition.name).await?;
        if find_column(&columns, CREATED_AT_COLUMN).is_none() {
            self.store.add_created_at(&definition.name).await?;
        }

        info!(columns = definition.columns.len(), "table created");
        Ok(definition)
    }

    /// Drops `table` and everything depending on it.
    #[instrument(skip(self))]
    pub async fn delete_table(&self, table: &str) -> Result<()> {
        self.introspector.require_table(table).await?;
        self.store.drop_table(table).await?;
        info!("table dropped");
        Ok(())
    }
}
