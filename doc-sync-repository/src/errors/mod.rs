//! Error types for repository operations.

mod catalog_error;
mod search_index_error;

pub use catalog_error::CatalogError;
pub use search_index_error::SearchIndexError;
