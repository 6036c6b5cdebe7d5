//! Search index error types.

use thiserror::Error;

/// Errors that can occur during search index operations.
///
/// The pipeline treats every variant as best-effort: failures are logged and
/// never promoted into catalog status or acknowledgement decisions. The
/// variants exist so the logs can distinguish an expected miss (a delete for
/// a document that was never indexed) from a real failure.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g. an empty site identifier).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to reach the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to upsert a document.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Failed to delete a document.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Document not present in the index. Expected during deletes.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create a delete error.
    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    /// Whether this error is an ordinary expected miss rather than a fault.
    pub fn is_expected_miss(&self) -> bool {
        matches!(self, Self::DocumentNotFound(_))
    }
}
