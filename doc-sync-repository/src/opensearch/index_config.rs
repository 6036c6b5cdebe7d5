//! OpenSearch index configuration and mappings.
//!
//! Each site gets its own index so a tenant's documents can be searched and
//! dropped in isolation.

use serde_json::{json, Value};

/// Prefix for all per-site document indices.
pub const INDEX_PREFIX: &str = "documents";

/// The index name for a site's document collection.
pub fn index_name(site_id: &str) -> String {
    format!("{}-{}", INDEX_PREFIX, site_id)
}

/// Get the index settings and mappings for a site's document index.
///
/// `title` and `description` use `search_as_you_type` for autocomplete;
/// `content` is a plain analyzed text field; `path` and `authors` are
/// keywords for filtering; `date` is stored as epoch seconds.
pub fn document_index_settings() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "properties": {
                "id": {
                    "type": "keyword"
                },
                "title": {
                    "type": "search_as_you_type",
                    "fields": {
                        "raw": {
                            "type": "keyword"
                        }
                    }
                },
                "content": {
                    "type": "text"
                },
                "path": {
                    "type": "keyword"
                },
                "description": {
                    "type": "search_as_you_type"
                },
                "authors": {
                    "type": "keyword"
                },
                "date": {
                    "type": "date",
                    "format": "epoch_second"
                }
            }
        }
    })
}
