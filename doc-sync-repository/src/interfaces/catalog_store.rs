//! Catalog store trait definition.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::CatalogError;
use doc_sync_shared::DocumentMetadata;

/// Abstract interface for document catalog operations.
///
/// The catalog owns one row per tracked file. The pipeline never creates
/// rows; it resolves them, drives their sync-status state machine, and
/// deletes them when publication is suppressed.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`; one shared handle serves all
/// concurrent per-batch tasks, so the underlying connection pool must
/// tolerate concurrent use.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Resolve the most recently created document id for `(site_id, path)`.
    ///
    /// # Returns
    ///
    /// * `Ok(Uuid)` - The id of the newest matching row by creation time
    /// * `Err(CatalogError::DocumentNotFound)` - If no row matches
    async fn find_latest_id_by_path(
        &self,
        site_id: &str,
        path: &str,
    ) -> Result<Uuid, CatalogError>;

    /// Claim the document: transition it to `PROCESSING`.
    async fn mark_processing(&self, id: Uuid) -> Result<(), CatalogError>;

    /// Record a successful sync: persist the metadata bag and normalized
    /// permalink, set `SUCCESS`, and clear `sync_error`.
    ///
    /// The permalink is normalized by stripping leading and trailing
    /// slashes before storage.
    async fn mark_success(
        &self,
        id: Uuid,
        metadata: &DocumentMetadata,
        permalink: Option<&str>,
    ) -> Result<(), CatalogError>;

    /// Record a failed sync: set `ERROR` and store the failure message.
    async fn mark_error(&self, id: Uuid, message: &str) -> Result<(), CatalogError>;

    /// Remove the document row from the catalog.
    async fn delete_document(&self, id: Uuid) -> Result<(), CatalogError>;
}
