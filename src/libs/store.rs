use async_trait::async_trait;

use crate::libs::definition::TableDefinition;
use crate::libs::error::Result;
use crate::libs::query_builder::Assignment;
use crate::libs::schema::{ColumnDescriptor, Row, TableDescriptor};

/// The SQL-executing collaborator behind the admin services.
///
/// Table and column names handed to a store have already been checked
/// against its own catalog (row operations) or validated as identifiers
/// (table creation). Stores quote them; values are always bound.
#[async_trait]
pub trait AdminStore: Send + Sync {
    /// Short label for logs.
    fn kind(&self) -> &'static str;

    async fn list_tables(&self) -> Result<Vec<TableDescriptor>>;

    /// Columns in physical order; empty when the table does not exist.
    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    async fn select_rows(&self, table: &str, order_by: Option<&str>) -> Result<Vec<Row>>;

    async fn insert_row(&self, table: &str, values: &[Assignment]) -> Result<Row>;

    /// Returns the updated row, or `None` when no row matched `key`.
    async fn update_row(
        &self,
        table: &str,
        key: &Assignment,
        values: &[Assignment],
    ) -> Result<Option<Row>>;

    /// Returns the number of rows removed.
    async fn delete_row(&self, table: &str, key: &Assignment) -> Result<u64>;

    async fn create_table(&self, definition: &TableDefinition) -> Result<()>;

    /// Adds a `created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP` column.
    async fn add_created_at(&self, table: &str) -> Result<()>;

    /// Drops the table and everything depending on it.
    async fn drop_table(&self, table: &str) -> Result<()>;
}
