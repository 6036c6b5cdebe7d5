//! Abstract repository interfaces.
//!
//! These traits define the operations the pipeline needs from the document
//! catalog and the search index, decoupled from the concrete backends so
//! tests can substitute in-memory implementations.

mod catalog_store;
mod search_index_client;

pub use catalog_store::CatalogStore;
pub use search_index_client::SearchIndexClient;
