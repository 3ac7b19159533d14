use thiserror::Error;

/// Errors raised by the catalog, row and table services.
#[derive(Debug, Error)]
pub enum AdminError {
    /// A statement failed: connectivity, syntax or a constraint violation.
    #[error("query failed: {0}")]
    Query(String),
    /// The table is not in the catalog, or an id-scoped statement touched no row.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
}

impl AdminError {
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<sqlx::Error> for AdminError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::Database(db_error) => match db_error.code() {
                Some(code) => Self::Query(format!("{} (SQLSTATE {})", db_error.message(), code)),
                None => Self::Query(db_error.message().to_string()),
            },
            other => Self::Query(other.to_string()),
        }
    }
}

pub type Result<T, E = AdminError> = std::result::Result<T, E>;
