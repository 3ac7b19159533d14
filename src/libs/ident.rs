//! Identifier and literal handling for dynamically assembled SQL.
//!
//! Table and column names are the only text ever interpolated into a
//! statement. Names discovered through the catalog are quoted with [`Ident`];
//! names supplied by a caller (new tables and columns) must also pass
//! [`validate_identifier`] first.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::libs::error::{AdminError, Result};

/// Postgres truncates identifiers longer than this (NAMEDATALEN - 1).
pub const MAX_IDENTIFIER_LEN: usize = 63;

lazy_static! {
    static ref IDENTIFIER_REGEX: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Returns true if `name` is a plain identifier: a letter or underscore,
/// then letters, digits or underscores.
pub fn is_valid_identifier(name: &str) -> bool {
    name.len() <= MAX_IDENTIFIER_LEN && IDENTIFIER_REGEX.is_match(name)
}

/// Validates a caller-supplied identifier, naming `kind` ("table", "column")
/// in the error.
pub fn validate_identifier(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AdminError::validation(format!("{kind} name is required")));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(AdminError::validation(format!(
            "{kind} name '{name}' is longer than {MAX_IDENTIFIER_LEN} characters"
        )));
    }
    if !IDENTIFIER_REGEX.is_match(name) {
        return Err(AdminError::validation(format!(
            "{kind} name '{name}' must start with a letter or underscore and contain only letters, digits and underscores"
        )));
    }
    Ok(())
}

/// A Postgres identifier.
///
/// Display writes the value double-quoted, doubling any embedded quotes.
///
/// ```
/// use tabledesk::Ident;
/// assert_eq!(Ident("user").to_string(), "\"user\"");
/// assert_eq!(Ident("we\"ird").to_string(), "\"we\"\"ird\"");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.as_ref().replace('"', "\"\""))
    }
}

/// A Postgres string literal, single-quoted with embedded quotes doubled.
pub struct Lit<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Lit<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.0.as_ref().replace('\'', "''"))
    }
}

/// A schema-qualified table name, e.g. `"public"."users"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedTable<'a> {
    pub schema: &'a str,
    pub name: &'a str,
}

impl<'a> QualifiedTable<'a> {
    pub fn new(schema: &'a str, name: &'a str) -> Self {
        Self { schema, name }
    }
}

impl fmt::Display for QualifiedTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", Ident(self.schema), Ident(self.name))
    }
}
