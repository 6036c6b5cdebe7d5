//! OpenSearch client implementation.
//!
//! Concrete [`SearchIndexClient`] backed by the OpenSearch Rust client.
//! Upserts use `doc_as_upsert` so a re-delivered notification converges on
//! the same document; deletes treat 404 as an expected miss.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    DeleteParts, OpenSearch, UpdateParts,
};
use serde_json::json;
use tracing::{debug, error, info, instrument};
use url::Url;
use uuid::Uuid;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexClient;
use crate::opensearch::index_config::{document_index_settings, index_name};
use doc_sync_shared::SearchDocument;

/// OpenSearch-backed search index client.
///
/// # Example
///
/// ```ignore
/// let client = OpenSearchIndexClient::new("http://localhost:9200")?;
/// client.ensure_index("site1").await?;
/// client.upsert("site1", &doc).await?;
/// ```
pub struct OpenSearchIndexClient {
    client: OpenSearch,
}

impl OpenSearchIndexClient {
    /// Create a new client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g. "http://localhost:9200")
    pub fn new(url: &str) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        info!(url = %url, "Created OpenSearch client");

        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }

    fn validate_site_id(site_id: &str) -> Result<(), SearchIndexError> {
        if site_id.is_empty() {
            return Err(SearchIndexError::validation("site_id must not be empty"));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndexClient for OpenSearchIndexClient {
    /// Insert or replace a document in the site's index.
    ///
    /// Uses the update API with `doc_as_upsert` so the operation is
    /// idempotent: re-processing the same notification writes an identical
    /// document.
    #[instrument(skip(self, doc), fields(document_id = %doc.id))]
    async fn upsert(&self, site_id: &str, doc: &SearchDocument) -> Result<(), SearchIndexError> {
        Self::validate_site_id(site_id)?;

        let index = index_name(site_id);
        let doc_id = doc.id.to_string();
        let body = serde_json::to_value(doc)
            .map_err(|e| SearchIndexError::validation(e.to_string()))?;

        let response = self
            .client
            .update(UpdateParts::IndexId(&index, &doc_id))
            .body(json!({
                "doc": body,
                "doc_as_upsert": true
            }))
            .send()
            .await
            .map_err(|e| SearchIndexError::index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Upsert request failed");
            return Err(SearchIndexError::index(format!(
                "Upsert failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(index = %index, doc_id = %doc_id, "Search document upserted");
        Ok(())
    }

    /// Delete a document from the site's index.
    ///
    /// A 404 is reported as [`SearchIndexError::DocumentNotFound`] so the
    /// caller can log it as an expected miss; any other non-success status
    /// is a delete failure.
    #[instrument(skip(self))]
    async fn remove(&self, site_id: &str, id: Uuid) -> Result<(), SearchIndexError> {
        Self::validate_site_id(site_id)?;

        let index = index_name(site_id);
        let doc_id = id.to_string();

        let response = self
            .client
            .delete(DeleteParts::IndexId(&index, &doc_id))
            .send()
            .await
            .map_err(|e| SearchIndexError::delete(e.to_string()))?;

        let status = response.status_code();

        if status.as_u16() == 404 {
            return Err(SearchIndexError::DocumentNotFound(format!(
                "index={}, id={}",
                index, doc_id
            )));
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Delete request failed");
            return Err(SearchIndexError::delete(format!(
                "Delete failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(index = %index, doc_id = %doc_id, "Search document deleted");
        Ok(())
    }

    /// Create the site's index with mappings if it does not already exist.
    #[instrument(skip(self))]
    async fn ensure_index(&self, site_id: &str) -> Result<(), SearchIndexError> {
        Self::validate_site_id(site_id)?;

        let index = index_name(site_id);

        let exists = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[&index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if exists.status_code().is_success() {
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&index))
            .body(document_index_settings())
            .send()
            .await
            .map_err(|e| SearchIndexError::index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            // Lost a creation race with a concurrent task; the index exists.
            if error_body.contains("resource_already_exists_exception") {
                return Ok(());
            }
            return Err(SearchIndexError::index(format!(
                "Index creation failed with status {}: {}",
                status, error_body
            )));
        }

        info!(index = %index, "Created search index");
        Ok(())
    }

    /// Check cluster health.
    async fn health_check(&self) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            return Ok(false);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = body["status"].as_str().unwrap_or("red");
        Ok(status == "green" || status == "yellow")
    }
}
