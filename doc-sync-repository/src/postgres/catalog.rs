//! Postgres catalog store implementation.
//!
//! Backed by a shared `sqlx::PgPool`; one pool serves all concurrent
//! per-batch tasks.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::errors::CatalogError;
use crate::interfaces::CatalogStore;
use doc_sync_shared::{DocumentMetadata, SyncStatus};

/// Maximum connections held by the catalog pool.
const MAX_CONNECTIONS: u32 = 10;

/// Catalog store over a Postgres `documents` table.
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Connect to the catalog database.
    ///
    /// # Arguments
    ///
    /// * `database_url` - Postgres connection string
    ///
    /// # Returns
    ///
    /// * `Ok(PgCatalogStore)` - A connected store
    /// * `Err(CatalogError)` - If the connection cannot be established
    pub async fn connect(database_url: &str) -> Result<Self, CatalogError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(|e| CatalogError::connection(e.to_string()))?;

        info!("Connected to catalog database");

        Ok(Self { pool })
    }

    /// Wrap an existing pool (shared with other components or tests).
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Strip leading and trailing slashes from a permalink before storage.
pub(crate) fn normalize_permalink(permalink: &str) -> String {
    permalink.trim_matches('/').to_string()
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    #[instrument(skip(self))]
    async fn find_latest_id_by_path(
        &self,
        site_id: &str,
        path: &str,
    ) -> Result<Uuid, CatalogError> {
        let id: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM documents \
             WHERE site_id = $1 AND path = $2 \
             ORDER BY created_at DESC \
             LIMIT 1",
        )
        .bind(site_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;

        id.ok_or_else(|| CatalogError::not_found(site_id, path))
    }

    #[instrument(skip(self))]
    async fn mark_processing(&self, id: Uuid) -> Result<(), CatalogError> {
        sqlx::query(
            "UPDATE documents \
             SET sync_status = $2, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(SyncStatus::Processing.as_str())
        .execute(&self.pool)
        .await?;

        debug!(document_id = %id, "Document claimed for processing");
        Ok(())
    }

    #[instrument(skip(self, metadata))]
    async fn mark_success(
        &self,
        id: Uuid,
        metadata: &DocumentMetadata,
        permalink: Option<&str>,
    ) -> Result<(), CatalogError> {
        let metadata_json = serde_json::to_value(metadata)
            .map_err(|e| CatalogError::query(format!("Failed to serialize metadata: {}", e)))?;
        let permalink = permalink.map(normalize_permalink);

        sqlx::query(
            "UPDATE documents \
             SET sync_status = $2, sync_error = NULL, metadata = $3, permalink = $4, \
                 updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(SyncStatus::Success.as_str())
        .bind(metadata_json)
        .bind(permalink)
        .execute(&self.pool)
        .await?;

        debug!(document_id = %id, "Document marked SUCCESS");
        Ok(())
    }

    #[instrument(skip(self, message))]
    async fn mark_error(&self, id: Uuid, message: &str) -> Result<(), CatalogError> {
        sqlx::query(
            "UPDATE documents \
             SET sync_status = $2, sync_error = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(SyncStatus::Error.as_str())
        .bind(message)
        .execute(&self.pool)
        .await?;

        debug!(document_id = %id, error = %message, "Document marked ERROR");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_document(&self, id: Uuid) -> Result<(), CatalogError> {
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(document_id = %id, "Document row deleted");
        Ok(())
    }
}
