//! Catalog error types.

use thiserror::Error;

/// Errors that can occur during catalog operations.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// No document row exists for the requested identity.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// A query failed to execute.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Failed to reach the catalog database.
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl CatalogError {
    /// Create a not-found error for a `(site_id, path)` lookup.
    pub fn not_found(site_id: &str, path: &str) -> Self {
        Self::DocumentNotFound(format!("site_id={}, path={}", site_id, path))
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::DocumentNotFound(err.to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::ConnectionError(err.to_string())
            }
            other => Self::QueryError(other.to_string()),
        }
    }
}
