use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Row as _, query, query_as};
use tracing::debug;

use crate::libs::config::AppConfig;
use crate::libs::definition::TableDefinition;
use crate::libs::error::Result;
use crate::libs::ident::QualifiedTable;
use crate::libs::query_builder::{self, Assignment, ROW_ALIAS, Statement};
use crate::libs::schema::{ColumnDescriptor, Row, TableDescriptor};
use crate::libs::store::AdminStore;

/// [`AdminStore`] backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool, config.schema.clone()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn table<'a>(&'a self, name: &'a str) -> QualifiedTable<'a> {
        QualifiedTable::new(&self.schema, name)
    }

    async fn fetch_rows(&self, stmt: Statement) -> Result<Vec<Row>> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "fetching rows");
        let mut q = query(&stmt.sql);
        for param in stmt.params {
            q = q.bind(param);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn fetch_optional_row(&self, stmt: Statement) -> Result<Option<Row>> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "fetching row");
        let mut q = query(&stmt.sql);
        for param in stmt.params {
            q = q.bind(param);
        }
        let row = q.fetch_optional(&self.pool).await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        debug!(sql, "executing");
        let done = query(sql).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }
}

fn decode_row(row: &PgRow) -> Result<Row> {
    let Json(map) = row.try_get::<Json<Row>, _>(ROW_ALIAS)?;
    Ok(map)
}

#[async_trait]
impl AdminStore for PgStore {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        let tables = query_as::<_, TableDescriptor>(query_builder::LIST_TABLES_SQL)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;
        Ok(tables)
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let columns = query_as::<_, ColumnDescriptor>(query_builder::DESCRIBE_TABLE_SQL)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        Ok(columns)
    }

    async fn select_rows(&self, table: &str, order_by: Option<&str>) -> Result<Vec<Row>> {
        self.fetch_rows(query_builder::select_rows(&self.table(table), order_by))
            .await
    }

    async fn insert_row(&self, table: &str, values: &[Assignment]) -> Result<Row> {
        let stmt = query_builder::insert_row(&self.table(table), values);
        debug!(sql = %stmt.sql, params = stmt.params.len(), "inserting row");
        let mut q = query(&stmt.sql);
        for param in stmt.params {
            q = q.bind(param);
        }
        let row = q.fetch_one(&self.pool).await?;
        decode_row(&row)
    }

    async fn update_row(
        &self,
        table: &str,
        key: &Assignment,
        values: &[Assignment],
    ) -> Result<Option<Row>> {
        self.fetch_optional_row(query_builder::update_row(&self.table(table), key, values))
            .await
    }

    async fn delete_row(&self, table: &str, key: &Assignment) -> Result<u64> {
        let stmt = query_builder::delete_row(&self.table(table), key);
        debug!(sql = %stmt.sql, "deleting row");
        let mut q = query(&stmt.sql);
        for param in stmt.params {
            q = q.bind(param);
        }
        let done = q.execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn create_table(&self, definition: &TableDefinition) -> Result<()> {
        self.execute(&query_builder::create_table(&self.schema, definition))
            .await?;
        Ok(())
    }

    async fn add_created_at(&self, table: &str) -> Result<()> {
        self.execute(&query_builder::add_created_at(&self.table(table)))
            .await?;
        Ok(())
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        self.execute(&query_builder::drop_table(&self.table(table)))
            .await?;
        Ok(())
    }
}
