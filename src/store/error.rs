use thiserror::Error;

use crate::db::SchemaError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid store response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("No {table} row with id {id}")]
    NotFound { table: &'static str, id: String },

    #[error("Store error: {code} - {message}")]
    BackendError { code: String, message: String },

    #[error("Lock poisoned: {0}")]
    LockError(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

impl From<SchemaError> for StoreError {
    fn from(err: SchemaError) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::ParseError(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        StoreError::LockError(err.to_string())
    }
}
