//! Search index client trait definition.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::SearchIndexError;
use doc_sync_shared::SearchDocument;

/// Abstract interface for search index maintenance.
///
/// Each site gets its own collection; the document id within a collection is
/// the catalog document id. Implementations can be swapped for different
/// backends (OpenSearch, mock, etc.) enabling easy testing.
///
/// The search index is a derived, eventually-consistent view: callers treat
/// every operation as best-effort and must not let index failures affect
/// catalog state.
#[async_trait]
pub trait SearchIndexClient: Send + Sync {
    /// Insert or replace a document in the site's collection.
    async fn upsert(&self, site_id: &str, doc: &SearchDocument) -> Result<(), SearchIndexError>;

    /// Remove a document from the site's collection.
    ///
    /// Removing a document that was never indexed is reported as
    /// [`SearchIndexError::DocumentNotFound`] so callers can log it as an
    /// expected miss rather than a failure.
    async fn remove(&self, site_id: &str, id: Uuid) -> Result<(), SearchIndexError>;

    /// Ensure the site's collection exists with proper mappings.
    async fn ensure_index(&self, site_id: &str) -> Result<(), SearchIndexError>;

    /// Check if the search engine is healthy and reachable.
    async fn health_check(&self) -> Result<bool, SearchIndexError>;
}
