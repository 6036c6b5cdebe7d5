//! # Doc Sync Repository
//!
//! Repository interfaces and concrete implementations for the document sync
//! worker:
//!
//! - [`CatalogStore`] with a Postgres implementation ([`PgCatalogStore`])
//!   for document lookup and status transitions.
//! - [`SearchIndexClient`] with an OpenSearch implementation
//!   ([`OpenSearchIndexClient`]) for best-effort search index maintenance.
//!
//! Both traits are object-safe and `Send + Sync` so a single shared handle
//! can serve all concurrent per-batch tasks.

pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod postgres;

pub use errors::{CatalogError, SearchIndexError};
pub use interfaces::{CatalogStore, SearchIndexClient};
pub use opensearch::OpenSearchIndexClient;
pub use postgres::PgCatalogStore;
