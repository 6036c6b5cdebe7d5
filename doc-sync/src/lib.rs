//! # Doc Sync
//!
//! Main library for the document sync worker.
//!
//! This crate provides the entry point and configuration for running the
//! document sync pipeline.

pub mod config;

pub use config::Dependencies;

use thiserror::Error;

/// Errors that can occur during worker initialization or execution.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] doc_sync_pipeline::PipelineError),

    /// Catalog error.
    #[error("Catalog error: {0}")]
    CatalogError(#[from] doc_sync_repository::CatalogError),

    /// Search index error.
    #[error("Search index error: {0}")]
    SearchError(#[from] doc_sync_repository::SearchIndexError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl WorkerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
