// schema.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A row: column name to scalar value, in the table's column order.
pub type Row = Map<String, Value>;

/// Generated identifier column; never client-specified.
pub const ID_COLUMN: &str = "id";
/// Server-generated audit column.
pub const CREATED_AT_COLUMN: &str = "created_at";
pub const UPDATED_AT_COLUMN: &str = "updated_at";
/// Text column holding `'true'`/`'false'`; its presence makes a table soft-deletable.
pub const SOFT_DELETE_COLUMN: &str = "is_deleted";

/// Keys the server owns and silently drops from insert/update payloads.
pub const SERVER_OWNED_COLUMNS: [&str; 3] = [ID_COLUMN, CREATED_AT_COLUMN, UPDATED_AT_COLUMN];

pub fn is_server_owned(column: &str) -> bool {
    SERVER_OWNED_COLUMNS.contains(&column)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TableDescriptor {
    #[serde(rename = "table_name")]
    #[sqlx(rename = "table_name")]
    pub name: String,
    #[serde(rename = "table_schema")]
    #[sqlx(rename = "table_schema")]
    pub schema: String,
}

/// One column of a table, as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ColumnDescriptor {
    #[serde(rename = "column_name")]
    #[sqlx(rename = "column_name")]
    pub name: String,
    pub data_type: String,
    /// Underlying type name (`int4`, `varchar`, ...); bound values are cast to it.
    pub udt_name: String,
    #[serde(rename = "is_nullable")]
    #[sqlx(rename = "is_nullable")]
    pub nullable: bool,
    #[serde(rename = "column_default")]
    #[sqlx(rename = "column_default")]
    pub default_expr: Option<String>,
    pub max_length: Option<i32>,
    pub is_primary_key: bool,
}

/// The input control an editor should offer for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Number,
    Decimal,
    Toggle,
    Datetime,
    Date,
    Time,
    Json,
    Text,
}

/// How a column should be presented in an edit form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAffordance {
    pub column_name: String,
    pub input: InputKind,
    pub editable: bool,
    pub required: bool,
    pub max_length: Option<i32>,
    pub default_expr: Option<String>,
}

impl ColumnDescriptor {
    pub fn input_kind(&self) -> InputKind {
        if self.name == SOFT_DELETE_COLUMN {
            return InputKind::Toggle;
        }
        match self.udt_name.as_str() {
            "int2" | "int4" | "int8" => InputKind::Number,
            "numeric" | "float4" | "float8" | "money" => InputKind::Decimal,
            "bool" => InputKind::Toggle,
            "timestamp" | "timestamptz" => InputKind::Datetime,
            "date" => InputKind::Date,
            "time" | "timetz" => InputKind::Time,
            "json" | "jsonb" => InputKind::Json,
            _ => InputKind::Text,
        }
    }

    pub fn affordance(&self) -> FieldAffordance {
        let editable = !is_server_owned(&self.name);
        FieldAffordance {
            column_name: self.name.clone(),
            input: self.input_kind(),
            editable,
            required: editable && !self.nullable && self.default_expr.is_none(),
            max_length: self.max_length,
            default_expr: self.default_expr.clone(),
        }
    }
}

/// Finds a column by name.
pub fn find_column<'a>(columns: &'a [ColumnDescriptor], name: &str) -> Option<&'a ColumnDescriptor> {
    columns.iter().find(|c| c.name == name)
}
