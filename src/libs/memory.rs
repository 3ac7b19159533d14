//! An in-process [`AdminStore`].
//!
//! Mirrors what the Postgres store observably does for the statements the
//! admin services issue: sequences for serial and identity columns,
//! `CURRENT_TIMESTAMP` defaults, NOT NULL and length checks, primary-key
//! uniqueness, and typed coercion of bound text. Rows come back in the same
//! JSON shape `row_to_json` produces.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Number, Value};
use tokio::sync::RwLock;

use crate::libs::definition::{ColumnDefinition, DefaultValue, TableDefinition};
use crate::libs::error::{AdminError, Result};
use crate::libs::query_builder::Assignment;
use crate::libs::schema::{CREATED_AT_COLUMN, ColumnDescriptor, Row, TableDescriptor};
use crate::libs::store::AdminStore;

#[derive(Debug, Clone)]
enum Fill {
    Sequence,
    Now,
    Today,
    Literal(String),
    Null,
}

#[derive(Debug, Clone)]
struct MemColumn {
    descriptor: ColumnDescriptor,
    fill: Fill,
    /// Last value handed out by this column's own sequence.
    last_value: i64,
}

#[derive(Debug, Clone, Default)]
struct MemTable {
    columns: Vec<MemColumn>,
    rows: Vec<Row>,
}

impl MemTable {
    fn column(&self, name: &str) -> Result<&MemColumn> {
        self.columns
            .iter()
            .find(|c| c.descriptor.name == name)
            .ok_or_else(|| AdminError::query(format!("column \"{name}\" does not exist")))
    }

    fn fill(&mut self, column: usize) -> Result<Value> {
        match self.columns[column].fill.clone() {
            Fill::Sequence => {
                let col = &mut self.columns[column];
                col.last_value += 1;
                Ok(Value::from(col.last_value))
            }
            Fill::Now => Ok(Value::String(now_timestamp())),
            Fill::Today => Ok(Value::String(Utc::now().date_naive().to_string())),
            Fill::Literal(text) => coerce(&self.columns[column].descriptor, Some(&text)),
            Fill::Null => Ok(Value::Null),
        }
    }

    fn check(&self, row: &Row, skip: Option<usize>) -> Result<()> {
        for col in &self.columns {
            let name = &col.descriptor.name;
            let value = row.get(name).unwrap_or(&Value::Null);
            if value.is_null() && !col.descriptor.nullable {
                return Err(AdminError::query(format!(
                    "null value in column \"{name}\" violates not-null constraint"
                )));
            }
            if col.descriptor.is_primary_key && !value.is_null() {
                let duplicate = self
                    .rows
                    .iter()
                    .enumerate()
                    .any(|(i, other)| Some(i) != skip && other.get(name) == Some(value));
                if duplicate {
                    return Err(AdminError::query(format!(
                        "duplicate key value violates unique constraint on \"{name}\""
                    )));
                }
            }
        }
        Ok(())
    }

    fn position(&self, key: &Assignment) -> Result<Option<usize>> {
        let column = self.column(&key.column)?;
        let wanted = coerce(&column.descriptor, key.value.as_deref())?;
        Ok(self
            .rows
            .iter()
            .position(|row| !wanted.is_null() && row.get(&key.column) == Some(&wanted)))
    }
}

/// [`AdminStore`] holding tables in memory, reported under one schema name.
pub struct InMemoryStore {
    schema: String,
    tables: RwLock<BTreeMap<String, MemTable>>,
}

impl InMemoryStore {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            tables: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new("public")
    }
}

fn missing_relation(table: &str) -> AdminError {
    AdminError::query(format!("relation \"{table}\" does not exist"))
}

fn now_timestamp() -> String {
    Utc::now()
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Converts bound text to the JSON value Postgres would report for the
/// column, enforcing the same input rules the cast would.
fn coerce(column: &ColumnDescriptor, text: Option<&str>) -> Result<Value> {
    let Some(text) = text else {
        return Ok(Value::Null);
    };
    let invalid = || {
        AdminError::query(format!(
            "invalid input syntax for type {}: \"{text}\"",
            column.data_type
        ))
    };
    let value = match column.udt_name.as_str() {
        udt @ ("int2" | "int4" | "int8") => {
            let number = text.trim().parse::<i64>().map_err(|_| invalid())?;
            let fits = match udt {
                "int2" => i16::try_from(number).is_ok(),
                "int4" => i32::try_from(number).is_ok(),
                _ => true,
            };
            if !fits {
                return Err(AdminError::query(format!(
                    "value \"{number}\" is out of range for type {}",
                    column.data_type
                )));
            }
            Value::from(number)
        }
        "float4" | "float8" | "numeric" => {
            let number = text.trim().parse::<f64>().map_err(|_| invalid())?;
            Number::from_f64(number).map(Value::Number).ok_or_else(invalid)?
        }
        "bool" => match text.trim().to_ascii_lowercase().as_str() {
            "t" | "true" | "yes" | "on" | "1" => Value::Bool(true),
            "f" | "false" | "no" | "off" | "0" => Value::Bool(false),
            _ => return Err(invalid()),
        },
        "json" | "jsonb" => serde_json::from_str(text).map_err(|_| invalid())?,
        _ => Value::String(text.to_string()),
    };

    if let (Some(limit), Value::String(s)) = (column.max_length, &value) {
        if s.chars().count() > usize::try_from(limit).unwrap_or(usize::MAX) {
            return Err(AdminError::query(format!(
                "value too long for type {}({limit})",
                column.data_type
            )));
        }
    }
    Ok(value)
}

fn mem_column(table: &str, def: &ColumnDefinition) -> MemColumn {
    let (data_type, udt_name) = def.ty.catalog_names();
    let (fill, default_expr) = if def.ty.is_serial() {
        (
            Fill::Sequence,
            Some(format!("nextval('{}_{}_seq'::regclass)", table, def.name)),
        )
    } else if def.auto_increment {
        // Identity columns report no default in the catalog.
        (Fill::Sequence, None)
    } else {
        match &def.default {
            Some(DefaultValue::CurrentTimestamp) => {
                (Fill::Now, Some("CURRENT_TIMESTAMP".to_string()))
            }
            Some(DefaultValue::CurrentDate) => (Fill::Today, Some("CURRENT_DATE".to_string())),
            Some(DefaultValue::Text(text)) => (Fill::Literal(text.clone()), Some(def_expr(def))),
            Some(DefaultValue::Number(n)) => (Fill::Literal(n.clone()), Some(n.clone())),
            Some(DefaultValue::Boolean(b)) => (Fill::Literal(b.to_string()), Some(b.to_string())),
            None => (Fill::Null, None),
        }
    };

    MemColumn {
        descriptor: ColumnDescriptor {
            name: def.name.clone(),
            data_type: data_type.to_string(),
            udt_name: udt_name.to_string(),
            nullable: def.nullable && !def.primary_key,
            default_expr,
            max_length: def.ty.max_length().and_then(|l| i32::try_from(l).ok()),
            is_primary_key: def.primary_key,
        },
        fill,
        last_value: 0,
    }
}

fn def_expr(def: &ColumnDefinition) -> String {
    let (data_type, _) = def.ty.catalog_names();
    match &def.default {
        Some(default) => format!("{default}::{data_type}"),
        None => String::new(),
    }
}

#[async_trait]
impl AdminStore for InMemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        Ok(self
            .tables
            .read()
            .await
            .keys()
            .map(|name| TableDescriptor {
                name: name.clone(),
                schema: self.schema.clone(),
            })
            .collect())
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        Ok(self
            .tables
            .read()
            .await
            .get(table)
            .map(|t| t.columns.iter().map(|c| c.descriptor.clone()).collect())
            .unwrap_or_default())
    }

    async fn select_rows(&self, table: &str, order_by: Option<&str>) -> Result<Vec<Row>> {
        let tables = self.tables.read().await;
        let t = tables.get(table).ok_or_else(|| missing_relation(table))?;
        let mut rows = t.rows.clone();
        if let Some(column) = order_by {
            t.column(column)?;
            rows.sort_by_key(|row| row.get(column).and_then(Value::as_i64).unwrap_or(i64::MAX));
        }
        Ok(rows)
    }

    async fn insert_row(&self, table: &str, values: &[Assignment]) -> Result<Row> {
        let mut tables = self.tables.write().await;
        let t = tables.get_mut(table).ok_or_else(|| missing_relation(table))?;

        let mut assigned = BTreeMap::new();
        for assignment in values {
            let column = t.column(&assignment.column)?;
            let value = coerce(&column.descriptor, assignment.value.as_deref())?;
            assigned.insert(assignment.column.clone(), value);
        }

        let mut row = Row::new();
        for index in 0..t.columns.len() {
            let name = t.columns[index].descriptor.name.clone();
            let value = match assigned.remove(&name) {
                Some(value) => value,
                None => t.fill(index)?,
            };
            row.insert(name, value);
        }

        t.check(&row, None)?;
        t.rows.push(row.clone());
        Ok(row)
    }

    async fn update_row(
        &self,
        table: &str,
        key: &Assignment,
        values: &[Assignment],
    ) -> Result<Option<Row>> {
        let mut tables = self.tables.write().await;
        let t = tables.get_mut(table).ok_or_else(|| missing_relation(table))?;
        let Some(index) = t.position(key)? else {
            return Ok(None);
        };

        let mut row = t.rows[index].clone();
        for assignment in values {
            let column = t.column(&assignment.column)?;
            let value = coerce(&column.descriptor, assignment.value.as_deref())?;
            row.insert(assignment.column.clone(), value);
        }

        t.check(&row, Some(index))?;
        t.rows[index] = row.clone();
        Ok(Some(row))
    }

    async fn delete_row(&self, table: &str, key: &Assignment) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let t = tables.get_mut(table).ok_or_else(|| missing_relation(table))?;
        match t.position(key)? {
            Some(index) => {
                t.rows.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn create_table(&self, definition: &TableDefinition) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(&definition.name) {
            return Err(AdminError::query(format!(
                "relation \"{}\" already exists",
                definition.name
            )));
        }
        let columns = definition
            .columns
            .iter()
            .map(|def| mem_column(&definition.name, def))
            .collect();
        tables.insert(
            definition.name.clone(),
            MemTable {
                columns,
                ..MemTable::default()
            },
        );
        Ok(())
    }

    async fn add_created_at(&self, table: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        let t = tables.get_mut(table).ok_or_else(|| missing_relation(table))?;
        if t.columns.iter().any(|c| c.descriptor.name == CREATED_AT_COLUMN) {
            return Ok(());
        }
        t.columns.push(MemColumn {
            descriptor: ColumnDescriptor {
                name: CREATED_AT_COLUMN.to_string(),
                data_type: "timestamp without time zone".to_string(),
                udt_name: "timestamp".to_string(),
                nullable: true,
                default_expr: Some("CURRENT_TIMESTAMP".to_string()),
                max_length: None,
                is_primary_key: false,
            },
            fill: Fill::Now,
            last_value: 0,
        });
        let now = now_timestamp();
        for row in &mut t.rows {
            row.insert(CREATED_AT_COLUMN.to_string(), Value::String(now.clone()));
        }
        Ok(())
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        self.tables
            .write()
            .await
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| missing_relation(table))
    }
}
