use serde_json::Value;

use crate::libs::definition::TableDefinition;
use crate::libs::ident::{Ident, QualifiedTable};
use crate::libs::schema::{CREATED_AT_COLUMN, ColumnDescriptor};

/// Lists base tables of one schema. Binds: `$1` schema.
pub const LIST_TABLES_SQL: &str = r#"
SELECT table_name::text AS table_name, table_schema::text AS table_schema
FROM information_schema.tables
WHERE table_schema = $1 AND table_type = 'BASE TABLE'
ORDER BY table_name ASC
"#;

/// Lists a table's columns in physical order. Binds: `$1` schema, `$2` table.
pub const DESCRIBE_TABLE_SQL: &str = r#"
SELECT
    c.column_name::text AS column_name,
    c.data_type::text AS data_type,
    c.udt_name::text AS udt_name,
    (c.is_nullable = 'YES') AS is_nullable,
    c.column_default::text AS column_default,
    c.character_maximum_length::int4 AS max_length,
    EXISTS (
        SELECT 1
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
          ON kcu.constraint_schema = tc.constraint_schema
         AND kcu.constraint_name = tc.constraint_name
        WHERE tc.constraint_type = 'PRIMARY KEY'
          AND tc.table_schema = c.table_schema
          AND tc.table_name = c.table_name
          AND kcu.column_name = c.column_name
    ) AS is_primary_key
FROM information_schema.columns c
WHERE c.table_schema = $1 AND c.table_name = $2
ORDER BY c.ordinal_position ASC
"#;

/// Column holding each returned row as JSON.
pub const ROW_ALIAS: &str = "row";

/// A column paired with the value to bind for it.
///
/// Values travel as text and are cast to the column's catalog type inside
/// the statement, so one binding path serves every column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub column: String,
    pub udt_name: String,
    pub value: Option<String>,
}

impl Assignment {
    pub fn new(column: &ColumnDescriptor, value: &Value) -> Self {
        Self {
            column: column.name.clone(),
            udt_name: column.udt_name.clone(),
            value: bind_text(value),
        }
    }

    pub fn text(column: &ColumnDescriptor, value: impl Into<String>) -> Self {
        Self {
            column: column.name.clone(),
            udt_name: column.udt_name.clone(),
            value: Some(value.into()),
        }
    }

    fn placeholder(&self, index: usize) -> String {
        format!("CAST(${} AS {})", index, Ident(&self.udt_name))
    }
}

/// Text form of a JSON value for binding. Null stays SQL NULL.
pub fn bind_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// SQL text plus its positional parameters (`$1`, `$2`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Option<String>>,
}

impl Statement {
    fn new(sql: String) -> Self {
        Self {
            sql,
            params: Vec::new(),
        }
    }

    fn bind(&mut self, assignment: &Assignment) -> String {
        self.params.push(assignment.value.clone());
        assignment.placeholder(self.params.len())
    }
}

pub fn select_rows(table: &QualifiedTable<'_>, order_by: Option<&str>) -> Statement {
    let mut sql = format!("SELECT row_to_json(t) AS {ROW_ALIAS} FROM {table} AS t");
    if let Some(column) = order_by {
        sql.push_str(&format!(" ORDER BY t.{} ASC", Ident(column)));
    }
    Statement::new(sql)
}

pub fn insert_row(table: &QualifiedTable<'_>, values: &[Assignment]) -> Statement {
    let mut stmt = Statement::new(String::new());
    if values.is_empty() {
        stmt.sql = format!(
            "INSERT INTO {table} AS t DEFAULT VALUES RETURNING row_to_json(t) AS {ROW_ALIAS}"
        );
        return stmt;
    }

    let columns: Vec<String> = values.iter().map(|a| Ident(&a.column).to_string()).collect();
    let placeholders: Vec<String> = values.iter().map(|a| stmt.bind(a)).collect();
    stmt.sql = format!(
        "INSERT INTO {table} AS t ({}) VALUES ({}) RETURNING row_to_json(t) AS {ROW_ALIAS}",
        columns.join(", "),
        placeholders.join(", ")
    );
    stmt
}

/// Builds an update of `values` on the row matching `key`.
/// `values` must be non-empty.
pub fn update_row(table: &QualifiedTable<'_>, key: &Assignment, values: &[Assignment]) -> Statement {
    let mut stmt = Statement::new(String::new());
    let sets: Vec<String> = values
        .iter()
        .map(|a| format!("{} = {}", Ident(&a.column), stmt.bind(a)))
        .collect();
    let key_placeholder = stmt.bind(key);
    stmt.sql = format!(
        "UPDATE {table} AS t SET {} WHERE t.{} = {} RETURNING row_to_json(t) AS {ROW_ALIAS}",
        sets.join(", "),
        Ident(&key.column),
        key_placeholder
    );
    stmt
}

pub fn delete_row(table: &QualifiedTable<'_>, key: &Assignment) -> Statement {
    let mut stmt = Statement::new(String::new());
    let key_placeholder = stmt.bind(key);
    stmt.sql = format!(
        "DELETE FROM {table} WHERE {} = {}",
        Ident(&key.column),
        key_placeholder
    );
    stmt
}

pub fn create_table(schema: &str, definition: &TableDefinition) -> String {
    let table = QualifiedTable::new(schema, &definition.name);
    let columns: Vec<String> = definition.columns.iter().map(|c| c.to_string()).collect();
    format!("CREATE TABLE {table} ({})", columns.join(", "))
}

pub fn add_created_at(table: &QualifiedTable<'_>) -> String {
    format!(
        "ALTER TABLE {table} ADD COLUMN IF NOT EXISTS {} TIMESTAMP DEFAULT CURRENT_TIMESTAMP",
        Ident(CREATED_AT_COLUMN)
    )
}

pub fn drop_table(table: &QualifiedTable<'_>) -> String {
    format!("DROP TABLE {table} CASCADE")
}
