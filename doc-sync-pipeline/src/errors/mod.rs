//! Error types for the document sync pipeline.

use doc_sync_repository::CatalogError;
use thiserror::Error;

/// Errors that can occur in the document sync pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The storage key does not match `{siteId}/{branch}/raw/{path}`.
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// The site or branch segment carries disallowed characters.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The object's reported size exceeds the processing ceiling.
    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    /// The object does not exist in storage.
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Storage access failed for a reason other than a missing object.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// The document could not be parsed. A normal outcome for
    /// non-conforming input, not a defect.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Error from the catalog store.
    #[error("Catalog error: {0}")]
    CatalogError(#[from] CatalogError),

    /// Kafka-related error.
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl PipelineError {
    /// Create an invalid-key-format error.
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKeyFormat(msg.into())
    }

    /// Create an invalid-identifier error.
    pub fn invalid_identifier(msg: impl Into<String>) -> Self {
        Self::InvalidIdentifier(msg.into())
    }

    /// Create an object-not-found error.
    pub fn object_not_found(key: impl Into<String>) -> Self {
        Self::ObjectNotFound(key.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for PipelineError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}
