//! Table designer input and its typed form.
//!
//! The designer posts [`CreateTableRequest`] with one free-text
//! `defaultValue` per column, which doubles as the length of VARCHAR/CHAR
//! columns and the precision/scale of NUMERIC columns. That overload is
//! resolved once, in [`TableDefinition::from_request`], into a
//! [`ColumnType`] carrying its own sizing and an optional [`DefaultValue`].

use std::collections::HashSet;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::libs::error::{AdminError, Result};
use crate::libs::ident::{Ident, Lit, validate_identifier};

pub const DEFAULT_VARCHAR_LENGTH: u32 = 255;
pub const DEFAULT_NUMERIC_PRECISION: u32 = 10;
pub const DEFAULT_NUMERIC_SCALE: u32 = 2;
const MAX_NUMERIC_PRECISION: u32 = 1000;

lazy_static! {
    static ref NUMBER_LITERAL_REGEX: Regex =
        Regex::new(r"^[+-]?\d+(\.\d+)?([eE][+-]?\d+)?$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_true")]
    pub is_nullable: bool,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub is_auto_increment: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequest {
    pub table_name: String,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Serial,
    BigSerial,
    SmallInt,
    Integer,
    BigInt,
    Numeric { precision: u32, scale: u32 },
    Real,
    Double,
    Boolean,
    Text,
    VarChar { length: u32 },
    Char { length: u32 },
    Date,
    Timestamp,
    TimestampTz,
    Uuid,
    Json,
    Jsonb,
}

impl ColumnType {
    /// Parses a designer type name. `sizing` is the overloaded default-value
    /// field; inline sizing such as `VARCHAR(100)` takes precedence over it.
    pub fn parse(raw: &str, sizing: Option<&str>) -> Result<Self> {
        let upper = raw.trim().to_ascii_uppercase();
        let (base, inline) = match upper.split_once('(') {
            Some((base, rest)) => {
                let args = rest.strip_suffix(')').ok_or_else(|| {
                    AdminError::validation(format!("malformed column type '{raw}'"))
                })?;
                (base.trim().to_string(), Some(args.trim().to_string()))
            }
            None => (upper, None),
        };
        let sizing = inline
            .as_deref()
            .or(sizing)
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let ty = match base.as_str() {
            "SERIAL" | "SERIAL4" => Self::Serial,
            "BIGSERIAL" | "SERIAL8" => Self::BigSerial,
            "SMALLINT" | "INT2" => Self::SmallInt,
            "INTEGER" | "INT" | "INT4" => Self::Integer,
            "BIGINT" | "INT8" => Self::BigInt,
            "REAL" | "FLOAT4" => Self::Real,
            "DOUBLE PRECISION" | "DOUBLE" | "FLOAT8" => Self::Double,
            "BOOLEAN" | "BOOL" => Self::Boolean,
            "TEXT" => Self::Text,
            "DATE" => Self::Date,
            "TIMESTAMP" => Self::Timestamp,
            "TIMESTAMPTZ" => Self::TimestampTz,
            "UUID" => Self::Uuid,
            "JSON" => Self::Json,
            "JSONB" => Self::Jsonb,
            "VARCHAR" | "CHARACTER VARYING" => Self::VarChar {
                length: parse_length(raw, sizing)?,
            },
            "CHAR" | "CHARACTER" => Self::Char {
                length: parse_length(raw, sizing)?,
            },
            "NUMERIC" | "DECIMAL" => {
                let (precision, scale) = parse_precision(raw, sizing)?;
                Self::Numeric { precision, scale }
            }
            _ => {
                return Err(AdminError::validation(format!(
                    "unsupported column type '{raw}'"
                )));
            }
        };
        Ok(ty)
    }

    /// Whether the default-value field is spent on sizing for this type.
    pub fn is_sized(raw: &str) -> bool {
        let upper = raw.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or_default().trim();
        matches!(
            base,
            "VARCHAR" | "CHARACTER VARYING" | "CHAR" | "CHARACTER" | "NUMERIC" | "DECIMAL"
        )
    }

    pub fn is_serial(self) -> bool {
        matches!(self, Self::Serial | Self::BigSerial)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Self::SmallInt | Self::Integer | Self::BigInt)
    }

    pub fn is_textual(self) -> bool {
        matches!(
            self,
            Self::Text | Self::VarChar { .. } | Self::Char { .. } | Self::Uuid | Self::Json | Self::Jsonb
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, Self::Numeric { .. } | Self::Real | Self::Double)
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::Timestamp | Self::TimestampTz)
    }

    /// The `information_schema` `(data_type, udt_name)` pair Postgres reports.
    pub fn catalog_names(self) -> (&'static str, &'static str) {
        match self {
            Self::Serial | Self::Integer => ("integer", "int4"),
            Self::BigSerial | Self::BigInt => ("bigint", "int8"),
            Self::SmallInt => ("smallint", "int2"),
            Self::Numeric { .. } => ("numeric", "numeric"),
            Self::Real => ("real", "float4"),
            Self::Double => ("double precision", "float8"),
            Self::Boolean => ("boolean", "bool"),
            Self::Text => ("text", "text"),
            Self::VarChar { .. } => ("character varying", "varchar"),
            Self::Char { .. } => ("character", "bpchar"),
            Self::Date => ("date", "date"),
            Self::Timestamp => ("timestamp without time zone", "timestamp"),
            Self::TimestampTz => ("timestamp with time zone", "timestamptz"),
            Self::Uuid => ("uuid", "uuid"),
            Self::Json => ("json", "json"),
            Self::Jsonb => ("jsonb", "jsonb"),
        }
    }

    pub fn max_length(self) -> Option<u32> {
        match self {
            Self::VarChar { length } | Self::Char { length } => Some(length),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => f.write_str("SERIAL"),
            Self::BigSerial => f.write_str("BIGSERIAL"),
            Self::SmallInt => f.write_str("SMALLINT"),
            Self::Integer => f.write_str("INTEGER"),
            Self::BigInt => f.write_str("BIGINT"),
            Self::Numeric { precision, scale } => write!(f, "NUMERIC({precision},{scale})"),
            Self::Real => f.write_str("REAL"),
            Self::Double => f.write_str("DOUBLE PRECISION"),
            Self::Boolean => f.write_str("BOOLEAN"),
            Self::Text => f.write_str("TEXT"),
            Self::VarChar { length } => write!(f, "VARCHAR({length})"),
            Self::Char { length } => write!(f, "CHAR({length})"),
            Self::Date => f.write_str("DATE"),
            Self::Timestamp => f.write_str("TIMESTAMP"),
            Self::TimestampTz => f.write_str("TIMESTAMPTZ"),
            Self::Uuid => f.write_str("UUID"),
            Self::Json => f.write_str("JSON"),
            Self::Jsonb => f.write_str("JSONB"),
        }
    }
}

fn parse_length(raw: &str, sizing: Option<&str>) -> Result<u32> {
    let Some(sizing) = sizing else {
        return Ok(DEFAULT_VARCHAR_LENGTH);
    };
    match sizing.parse::<u32>() {
        Ok(length) if length > 0 => Ok(length),
        _ => Err(AdminError::validation(format!(
            "{raw} columns need a positive length, got '{sizing}'"
        ))),
    }
}

fn parse_precision(raw: &str, sizing: Option<&str>) -> Result<(u32, u32)> {
    let Some(sizing) = sizing else {
        return Ok((DEFAULT_NUMERIC_PRECISION, DEFAULT_NUMERIC_SCALE));
    };
    let invalid = || {
        AdminError::validation(format!(
            "{raw} columns need 'precision' or 'precision,scale', got '{sizing}'"
        ))
    };
    let (precision, scale) = match sizing.split_once(',') {
        Some((p, s)) => (p.trim(), s.trim()),
        None => (sizing, "0"),
    };
    let precision = precision.parse::<u32>().map_err(|_| invalid())?;
    let scale = scale.parse::<u32>().map_err(|_| invalid())?;
    if precision == 0 || precision > MAX_NUMERIC_PRECISION || scale > precision {
        return Err(invalid());
    }
    Ok((precision, scale))
}

/// A column default, kept apart from any sizing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    /// Rendered as a quoted string literal.
    Text(String),
    /// A numeric literal, already checked to parse as a number.
    Number(String),
    Boolean(bool),
    CurrentTimestamp,
    CurrentDate,
}

impl DefaultValue {
    pub fn parse(ty: ColumnType, raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if ty.is_numeric() {
            if !NUMBER_LITERAL_REGEX.is_match(trimmed) {
                return Err(AdminError::validation(format!(
                    "default '{raw}' is not a number"
                )));
            }
            return Ok(Self::Number(trimmed.to_string()));
        }
        if ty == ColumnType::Boolean {
            return match trimmed.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Ok(Self::Boolean(true)),
                "false" | "f" | "0" => Ok(Self::Boolean(false)),
                _ => Err(AdminError::validation(format!(
                    "default '{raw}' is not a boolean"
                ))),
            };
        }
        if ty.is_temporal() {
            match trimmed.to_ascii_uppercase().as_str() {
                "CURRENT_TIMESTAMP" | "NOW()" if ty != ColumnType::Date => {
                    return Ok(Self::CurrentTimestamp);
                }
                "CURRENT_DATE" | "NOW()" | "CURRENT_TIMESTAMP" => return Ok(Self::CurrentDate),
                _ => {}
            }
        }
        Ok(Self::Text(raw.to_string()))
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{}", Lit(text)),
            Self::Number(number) => f.write_str(number),
            Self::Boolean(true) => f.write_str("TRUE"),
            Self::Boolean(false) => f.write_str("FALSE"),
            Self::CurrentTimestamp => f.write_str("CURRENT_TIMESTAMP"),
            Self::CurrentDate => f.write_str("CURRENT_DATE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub default: Option<DefaultValue>,
}

impl ColumnDefinition {
    pub fn from_spec(spec: &ColumnSpec) -> Result<Self> {
        validate_identifier("column", spec.name.trim())?;
        let sized = ColumnType::is_sized(&spec.data_type);
        let sizing = if sized { spec.default_value.as_deref() } else { None };
        let ty = ColumnType::parse(&spec.data_type, sizing)?;

        // An auto-increment flag on a non-integer type has nothing to attach to.
        let auto_increment = spec.is_auto_increment && (ty.is_integer() || ty.is_serial());
        let default = match spec.default_value.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() && !sized && !auto_increment && !ty.is_serial() => {
                Some(DefaultValue::parse(ty, raw)?)
            }
            _ => None,
        };

        Ok(Self {
            name: spec.name.trim().to_string(),
            ty,
            nullable: spec.is_nullable,
            primary_key: spec.is_primary_key,
            auto_increment,
            default,
        })
    }

    /// Whether the database fills this column from a sequence.
    pub fn is_generated(&self) -> bool {
        self.ty.is_serial() || self.auto_increment
    }
}

impl fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", Ident(&self.name), self.ty)?;
        if !self.nullable {
            f.write_str(" NOT NULL")?;
        }
        if self.primary_key {
            f.write_str(" PRIMARY KEY")?;
        }
        if self.auto_increment && self.ty.is_integer() {
            f.write_str(" GENERATED BY DEFAULT AS IDENTITY")?;
        } else if let Some(default) = &self.default {
            write!(f, " DEFAULT {default}")?;
        }
        Ok(())
    }
}

/// A validated table definition, ready to render as DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    pub fn from_request(request: &CreateTableRequest) -> Result<Self> {
        let name = request.table_name.trim();
        validate_identifier("table", name)?;

        if request.columns.len() < 2 {
            return Err(AdminError::validation(
                "a table needs at least 2 columns",
            ));
        }

        let columns = request
            .columns
            .iter()
            .map(ColumnDefinition::from_spec)
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(AdminError::validation(format!(
                    "column '{}' is declared more than once",
                    column.name
                )));
            }
        }

        match columns.iter().filter(|c| c.primary_key).count() {
            1 => {}
            0 => {
                return Err(AdminError::validation(
                    "exactly one column must be marked as primary key",
                ));
            }
            _ => {
                return Err(AdminError::validation(
                    "composite primary keys are not supported",
                ));
            }
        }

        Ok(Self {
            name: name.to_string(),
            columns,
        })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}
