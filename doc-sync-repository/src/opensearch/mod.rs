//! OpenSearch implementation of the search index client.

mod client;
mod index_config;

pub use client::OpenSearchIndexClient;
pub use index_config::{document_index_settings, index_name};
