//! Per-notification processing pipeline.
//!
//! Owns the document status state machine: claim the catalog row, fetch and
//! parse the content, then persist metadata (SUCCESS), record the failure
//! (ERROR), or unpublish the document entirely when frontmatter suppresses
//! publication. Search-index writes are best-effort throughout and never
//! affect catalog status.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::content::ContentStore;
use crate::errors::PipelineError;
use crate::extract::{extract, is_markdown, strip_markdown_suffix};
use doc_sync_repository::{CatalogStore, SearchIndexClient};
use doc_sync_shared::{DocumentMetadata, ObjectKey, SearchDocument};

/// Shared handles for one batch invocation.
///
/// One explicit context value is constructed per batch (holding the
/// storage, catalog, and index handles) and passed to each concurrent task;
/// nothing is ambient or global. All handles tolerate concurrent use.
#[derive(Clone)]
pub struct BatchContext {
    /// Object storage gateway.
    pub content: Arc<dyn ContentStore>,
    /// Document catalog.
    pub catalog: Arc<dyn CatalogStore>,
    /// Search index (best-effort).
    pub search: Arc<dyn SearchIndexClient>,
}

impl BatchContext {
    /// Bundle the three store handles into a context.
    pub fn new(
        content: Arc<dyn ContentStore>,
        catalog: Arc<dyn CatalogStore>,
        search: Arc<dyn SearchIndexClient>,
    ) -> Self {
        Self {
            content,
            catalog,
            search,
        }
    }
}

/// Terminal outcome of processing one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Metadata persisted and search document upserted.
    Indexed,
    /// Path carried no markdown suffix; marked SUCCESS without content
    /// access.
    SkippedNonMarkdown,
    /// Frontmatter suppressed publication; object, catalog row, and search
    /// document removed.
    Unpublished,
}

/// Pipeline that processes decoded storage notifications.
pub struct ProcessingPipeline {
    ctx: BatchContext,
}

impl ProcessingPipeline {
    /// Create a pipeline over the given batch context.
    pub fn new(ctx: BatchContext) -> Self {
        Self { ctx }
    }

    /// Process one decoded notification.
    ///
    /// Resolves the catalog row for `(site_id, path)` and drives it to a
    /// terminal state. Non-markdown paths go to SUCCESS directly; markdown
    /// paths are claimed first, and any failure after the claim transitions
    /// the document to ERROR with the failure's message and is re-raised so
    /// the caller can decide redelivery.
    ///
    /// # Returns
    ///
    /// * `Ok(Outcome)` - The terminal state reached
    /// * `Err(PipelineError)` - The failure that left the document in ERROR
    ///   (or, for `DocumentNotFound`, aborted processing before any claim)
    #[instrument(skip(self), fields(site_id = %key.site_id, path = %key.path))]
    pub async fn process(&self, key: &ObjectKey) -> Result<Outcome, PipelineError> {
        let id = self
            .ctx
            .catalog
            .find_latest_id_by_path(&key.site_id, &key.path)
            .await?;

        if !is_markdown(&key.path) {
            // Nothing to extract, not an error: straight to SUCCESS with no
            // claim and no content access.
            self.ctx
                .catalog
                .mark_success(id, &DocumentMetadata::default(), None)
                .await?;
            info!(document_id = %id, "Non-markdown object, marked SUCCESS");
            return Ok(Outcome::SkippedNonMarkdown);
        }

        self.ctx.catalog.mark_processing(id).await?;

        match self.process_claimed(id, key).await {
            Ok(outcome) => {
                info!(document_id = %id, outcome = ?outcome, "Notification processed");
                Ok(outcome)
            }
            Err(e) => {
                // Best-effort: the original error is what the caller needs
                // to see even if recording it fails.
                if let Err(mark_err) = self.ctx.catalog.mark_error(id, &e.to_string()).await {
                    warn!(
                        document_id = %id,
                        error = %mark_err,
                        "Failed to record ERROR status"
                    );
                }
                Err(e)
            }
        }
    }

    /// Steps that run after the document has been claimed.
    async fn process_claimed(
        &self,
        id: uuid::Uuid,
        key: &ObjectKey,
    ) -> Result<Outcome, PipelineError> {
        let storage_key = key.storage_key();
        let object = self.ctx.content.fetch(&storage_key).await?;
        let text = String::from_utf8_lossy(&object.bytes);

        let extracted = extract(&text, &key.path)?;

        if extracted.metadata.publish_suppressed() {
            return self.unpublish(id, key, &storage_key).await;
        }

        let permalink = extracted
            .metadata
            .permalink()
            .map(str::to_string)
            .unwrap_or_else(|| strip_markdown_suffix(&key.path).to_string());

        self.ctx
            .catalog
            .mark_success(id, &extracted.metadata, Some(&permalink))
            .await?;

        let doc = SearchDocument::from_extracted(id, &key.path, &extracted.metadata, extracted.body);
        self.upsert_best_effort(&key.site_id, &doc).await;

        Ok(Outcome::Indexed)
    }

    /// Remove a document whose frontmatter suppresses publication: storage
    /// object (best-effort), catalog row, and search document (best-effort).
    /// SUCCESS/ERROR is never observed on this path.
    async fn unpublish(
        &self,
        id: uuid::Uuid,
        key: &ObjectKey,
        storage_key: &str,
    ) -> Result<Outcome, PipelineError> {
        if let Err(e) = self.ctx.content.delete(storage_key).await {
            // A deletion failure is logged but does not abort the
            // remaining steps.
            warn!(document_id = %id, error = %e, "Failed to delete storage object");
        }

        self.ctx.catalog.delete_document(id).await?;
        self.remove_best_effort(&key.site_id, id).await;

        info!(document_id = %id, "Document unpublished");
        Ok(Outcome::Unpublished)
    }

    /// Upsert into the search index without letting failures propagate.
    ///
    /// Indices are per site and created lazily on the first write.
    async fn upsert_best_effort(&self, site_id: &str, doc: &SearchDocument) {
        if let Err(e) = self.ctx.search.ensure_index(site_id).await {
            warn!(site_id = %site_id, error = %e, "Failed to ensure search index");
            return;
        }
        if let Err(e) = self.ctx.search.upsert(site_id, doc).await {
            warn!(
                site_id = %site_id,
                document_id = %doc.id,
                error = %e,
                "Search index upsert failed"
            );
        }
    }

    /// Remove from the search index without letting failures propagate.
    ///
    /// An expected miss (document never indexed) logs at debug; anything
    /// else is a warning.
    async fn remove_best_effort(&self, site_id: &str, id: uuid::Uuid) {
        match self.ctx.search.remove(site_id, id).await {
            Ok(()) => {}
            Err(e) if e.is_expected_miss() => {
                debug!(site_id = %site_id, document_id = %id, "Document not in search index");
            }
            Err(e) => {
                warn!(
                    site_id = %site_id,
                    document_id = %id,
                    error = %e,
                    "Search index removal failed"
                );
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory store implementations shared by pipeline and consumer
    //! tests.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::content::{check_size, ContentStore, FetchedObject};
    use crate::errors::PipelineError;
    use doc_sync_repository::{
        CatalogError, CatalogStore, SearchIndexClient, SearchIndexError,
    };
    use doc_sync_shared::{DocumentMetadata, SearchDocument, SyncStatus};

    /// Mutable state of one in-memory catalog row.
    #[derive(Debug, Clone)]
    pub struct RowState {
        pub site_id: String,
        pub path: String,
        pub status: SyncStatus,
        pub sync_error: Option<String>,
        pub metadata: Option<DocumentMetadata>,
        pub permalink: Option<String>,
    }

    /// In-memory catalog store.
    #[derive(Default)]
    pub struct MemoryCatalog {
        pub rows: Mutex<HashMap<Uuid, RowState>>,
        pub claim_count: AtomicUsize,
        pub fail_mark_success: AtomicBool,
    }

    impl MemoryCatalog {
        pub fn with_document(site_id: &str, path: &str) -> (Self, Uuid) {
            let catalog = Self::default();
            let id = Uuid::new_v4();
            catalog.rows.lock().unwrap().insert(
                id,
                RowState {
                    site_id: site_id.to_string(),
                    path: path.to_string(),
                    status: SyncStatus::Pending,
                    sync_error: None,
                    metadata: None,
                    permalink: None,
                },
            );
            (catalog, id)
        }

        pub fn row(&self, id: Uuid) -> Option<RowState> {
            self.rows.lock().unwrap().get(&id).cloned()
        }
    }

    #[async_trait]
    impl CatalogStore for MemoryCatalog {
        async fn find_latest_id_by_path(
            &self,
            site_id: &str,
            path: &str,
        ) -> Result<Uuid, CatalogError> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|(_, row)| row.site_id == site_id && row.path == path)
                .map(|(id, _)| *id)
                .ok_or_else(|| CatalogError::not_found(site_id, path))
        }

        async fn mark_processing(&self, id: Uuid) -> Result<(), CatalogError> {
            self.claim_count.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .get_mut(&id)
                .ok_or_else(|| CatalogError::DocumentNotFound(id.to_string()))?;
            row.status = SyncStatus::Processing;
            Ok(())
        }

        async fn mark_success(
            &self,
            id: Uuid,
            metadata: &DocumentMetadata,
            permalink: Option<&str>,
        ) -> Result<(), CatalogError> {
            if self.fail_mark_success.load(Ordering::SeqCst) {
                return Err(CatalogError::query("simulated write failure"));
            }
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .get_mut(&id)
                .ok_or_else(|| CatalogError::DocumentNotFound(id.to_string()))?;
            row.status = SyncStatus::Success;
            row.sync_error = None;
            row.metadata = Some(metadata.clone());
            row.permalink = permalink.map(|p| p.trim_matches('/').to_string());
            Ok(())
        }

        async fn mark_error(&self, id: Uuid, message: &str) -> Result<(), CatalogError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .get_mut(&id)
                .ok_or_else(|| CatalogError::DocumentNotFound(id.to_string()))?;
            row.status = SyncStatus::Error;
            row.sync_error = Some(message.to_string());
            Ok(())
        }

        async fn delete_document(&self, id: Uuid) -> Result<(), CatalogError> {
            self.rows.lock().unwrap().remove(&id);
            Ok(())
        }
    }

    /// In-memory content store.
    #[derive(Default)]
    pub struct MemoryContent {
        pub objects: Mutex<HashMap<String, Vec<u8>>>,
        pub fetch_count: AtomicUsize,
        pub fail_fetch: AtomicBool,
        pub fail_delete: AtomicBool,
        /// When set, fetch reports this size instead of the body length.
        pub reported_size: Mutex<Option<u64>>,
    }

    impl MemoryContent {
        pub fn with_object(key: &str, bytes: &[u8]) -> Self {
            let store = Self::default();
            store
                .objects
                .lock()
                .unwrap()
                .insert(key.to_string(), bytes.to_vec());
            store
        }
    }

    #[async_trait]
    impl ContentStore for MemoryContent {
        async fn fetch(&self, key: &str) -> Result<FetchedObject, PipelineError> {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(PipelineError::storage("simulated fetch failure"));
            }
            let bytes = self
                .objects
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| PipelineError::object_not_found(key))?;
            let size = self
                .reported_size
                .lock()
                .unwrap()
                .unwrap_or(bytes.len() as u64);
            check_size(size)?;
            Ok(FetchedObject { bytes, size })
        }

        async fn delete(&self, key: &str) -> Result<(), PipelineError> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(PipelineError::storage("simulated delete failure"));
            }
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }
    }

    /// In-memory search index.
    #[derive(Default)]
    pub struct MemorySearch {
        pub docs: Mutex<HashMap<(String, Uuid), SearchDocument>>,
        pub fail_upsert: AtomicBool,
    }

    #[async_trait]
    impl SearchIndexClient for MemorySearch {
        async fn upsert(
            &self,
            site_id: &str,
            doc: &SearchDocument,
        ) -> Result<(), SearchIndexError> {
            if self.fail_upsert.load(Ordering::SeqCst) {
                return Err(SearchIndexError::index("simulated index failure"));
            }
            self.docs
                .lock()
                .unwrap()
                .insert((site_id.to_string(), doc.id), doc.clone());
            Ok(())
        }

        async fn remove(&self, site_id: &str, id: Uuid) -> Result<(), SearchIndexError> {
            match self.docs.lock().unwrap().remove(&(site_id.to_string(), id)) {
                Some(_) => Ok(()),
                None => Err(SearchIndexError::DocumentNotFound(id.to_string())),
            }
        }

        async fn ensure_index(&self, _site_id: &str) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn health_check(&self) -> Result<bool, SearchIndexError> {
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use super::testing::{MemoryCatalog, MemoryContent, MemorySearch};
    use super::*;
    use doc_sync_shared::SyncStatus;

    const DOC: &str = "---\ntitle: \"Test Article\"\ndescription: \"A test markdown file\"\ndate: 2024-03-20\n---\nBody text.";

    fn key(path: &str) -> ObjectKey {
        ObjectKey {
            site_id: "site1".to_string(),
            branch: "main".to_string(),
            path: path.to_string(),
        }
    }

    fn pipeline(
        catalog: MemoryCatalog,
        content: MemoryContent,
        search: MemorySearch,
    ) -> (
        ProcessingPipeline,
        Arc<MemoryCatalog>,
        Arc<MemoryContent>,
        Arc<MemorySearch>,
    ) {
        let catalog = Arc::new(catalog);
        let content = Arc::new(content);
        let search = Arc::new(search);
        let ctx = BatchContext::new(content.clone(), catalog.clone(), search.clone());
        (ProcessingPipeline::new(ctx), catalog, content, search)
    }

    #[tokio::test]
    async fn test_full_success_path() {
        let (catalog, id) = MemoryCatalog::with_document("site1", "articles/test.md");
        let content = MemoryContent::with_object("site1/main/raw/articles/test.md", DOC.as_bytes());
        let (pipeline, catalog, _, search) = pipeline(catalog, content, MemorySearch::default());

        let outcome = pipeline.process(&key("articles/test.md")).await.unwrap();
        assert_eq!(outcome, Outcome::Indexed);

        let row = catalog.row(id).unwrap();
        assert_eq!(row.status, SyncStatus::Success);
        assert_eq!(row.sync_error, None);

        let metadata = row.metadata.unwrap();
        assert_eq!(metadata.title, "Test Article");
        assert_eq!(metadata.description, "A test markdown file");
        assert_eq!(
            metadata.extra["date"],
            serde_json::json!("2024-03-20T00:00:00.000Z")
        );
        // Permalink derived from the path, suffix stripped.
        assert_eq!(row.permalink.as_deref(), Some("articles/test"));

        let docs = search.docs.lock().unwrap();
        let doc = docs.get(&("site1".to_string(), id)).unwrap();
        assert_eq!(doc.title, "Test Article");
        assert_eq!(doc.content, "Body text.");
    }

    #[tokio::test]
    async fn test_processing_is_idempotent() {
        let (catalog, id) = MemoryCatalog::with_document("site1", "articles/test.md");
        let content = MemoryContent::with_object("site1/main/raw/articles/test.md", DOC.as_bytes());
        let (pipeline, catalog, _, search) = pipeline(catalog, content, MemorySearch::default());

        pipeline.process(&key("articles/test.md")).await.unwrap();
        let first_row = catalog.row(id).unwrap();
        let first_doc = search
            .docs
            .lock()
            .unwrap()
            .get(&("site1".to_string(), id))
            .cloned()
            .unwrap();

        pipeline.process(&key("articles/test.md")).await.unwrap();
        let second_row = catalog.row(id).unwrap();
        let second_doc = search
            .docs
            .lock()
            .unwrap()
            .get(&("site1".to_string(), id))
            .cloned()
            .unwrap();

        assert_eq!(first_row.status, second_row.status);
        assert_eq!(
            serde_json::to_value(first_row.metadata).unwrap(),
            serde_json::to_value(second_row.metadata).unwrap()
        );
        assert_eq!(first_doc, second_doc);
    }

    #[tokio::test]
    async fn test_unknown_document_aborts() {
        let (pipeline, _, content, _) = pipeline(
            MemoryCatalog::default(),
            MemoryContent::default(),
            MemorySearch::default(),
        );

        let err = pipeline.process(&key("articles/test.md")).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::CatalogError(doc_sync_repository::CatalogError::DocumentNotFound(_))
        ));
        assert_eq!(content.fetch_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_markdown_shortcut() {
        let (catalog, id) = MemoryCatalog::with_document("site1", "images/photo.png");
        let (pipeline, catalog, content, _) = pipeline(
            catalog,
            MemoryContent::default(),
            MemorySearch::default(),
        );

        let outcome = pipeline.process(&key("images/photo.png")).await.unwrap();
        assert_eq!(outcome, Outcome::SkippedNonMarkdown);

        let row = catalog.row(id).unwrap();
        assert_eq!(row.status, SyncStatus::Success);
        // Straight to SUCCESS: no storage fetch and no PROCESSING claim.
        assert_eq!(content.fetch_count.load(Ordering::SeqCst), 0);
        assert_eq!(catalog.claim_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_marks_error() {
        let (catalog, id) = MemoryCatalog::with_document("site1", "articles/test.md");
        let content = MemoryContent::default();
        content.fail_fetch.store(true, Ordering::SeqCst);
        let (pipeline, catalog, _, _) = pipeline(catalog, content, MemorySearch::default());

        let err = pipeline.process(&key("articles/test.md")).await.unwrap_err();

        let row = catalog.row(id).unwrap();
        assert_eq!(row.status, SyncStatus::Error);
        assert_eq!(row.sync_error.as_deref(), Some(err.to_string().as_str()));
        // Metadata untouched by the failed attempt.
        assert!(row.metadata.is_none());
    }

    #[tokio::test]
    async fn test_missing_object_marks_error() {
        let (catalog, id) = MemoryCatalog::with_document("site1", "articles/test.md");
        let (pipeline, catalog, _, _) = pipeline(
            catalog,
            MemoryContent::default(),
            MemorySearch::default(),
        );

        let err = pipeline.process(&key("articles/test.md")).await.unwrap_err();
        assert!(matches!(err, PipelineError::ObjectNotFound(_)));
        assert_eq!(catalog.row(id).unwrap().status, SyncStatus::Error);
    }

    #[tokio::test]
    async fn test_oversized_object_marks_error() {
        let (catalog, id) = MemoryCatalog::with_document("site1", "articles/test.md");
        let content = MemoryContent::with_object("site1/main/raw/articles/test.md", DOC.as_bytes());
        *content.reported_size.lock().unwrap() = Some(6 * 1024 * 1024);
        let (pipeline, catalog, _, _) = pipeline(catalog, content, MemorySearch::default());

        let err = pipeline.process(&key("articles/test.md")).await.unwrap_err();
        assert!(matches!(err, PipelineError::FileTooLarge { .. }));

        let row = catalog.row(id).unwrap();
        assert_eq!(row.status, SyncStatus::Error);
        assert!(row.metadata.is_none());
    }

    #[tokio::test]
    async fn test_suppressed_publication_removes_everything() {
        let doc = "---\npublish: false\n---\nHidden draft.";
        let (catalog, id) = MemoryCatalog::with_document("site1", "drafts/secret.md");
        let content = MemoryContent::with_object("site1/main/raw/drafts/secret.md", doc.as_bytes());
        let (pipeline, catalog, content, search) =
            pipeline(catalog, content, MemorySearch::default());

        // Seed a stale search document to verify removal.
        search.docs.lock().unwrap().insert(
            ("site1".to_string(), id),
            doc_sync_shared::SearchDocument {
                id,
                title: "stale".to_string(),
                content: String::new(),
                path: "drafts/secret.md".to_string(),
                description: String::new(),
                authors: Vec::new(),
                date: None,
            },
        );

        let outcome = pipeline.process(&key("drafts/secret.md")).await.unwrap();
        assert_eq!(outcome, Outcome::Unpublished);

        // Row, object, and search document all gone; no SUCCESS/ERROR state.
        assert!(catalog.row(id).is_none());
        assert!(content.objects.lock().unwrap().is_empty());
        assert!(search.docs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_suppressed_publication_survives_storage_delete_failure() {
        let doc = "---\npublish: false\n---\nHidden.";
        let (catalog, id) = MemoryCatalog::with_document("site1", "drafts/secret.md");
        let content = MemoryContent::with_object("site1/main/raw/drafts/secret.md", doc.as_bytes());
        content.fail_delete.store(true, Ordering::SeqCst);
        let (pipeline, catalog, _, _) = pipeline(catalog, content, MemorySearch::default());

        let outcome = pipeline.process(&key("drafts/secret.md")).await.unwrap();
        assert_eq!(outcome, Outcome::Unpublished);
        assert!(catalog.row(id).is_none());
    }

    #[tokio::test]
    async fn test_index_failure_does_not_affect_status() {
        let (catalog, id) = MemoryCatalog::with_document("site1", "articles/test.md");
        let content = MemoryContent::with_object("site1/main/raw/articles/test.md", DOC.as_bytes());
        let search = MemorySearch::default();
        search.fail_upsert.store(true, Ordering::SeqCst);
        let (pipeline, catalog, _, _) = pipeline(catalog, content, search);

        let outcome = pipeline.process(&key("articles/test.md")).await.unwrap();
        assert_eq!(outcome, Outcome::Indexed);
        assert_eq!(catalog.row(id).unwrap().status, SyncStatus::Success);
    }

    #[tokio::test]
    async fn test_parse_error_marks_error() {
        let doc = "---\nnot a map\n---\nBody.";
        let (catalog, id) = MemoryCatalog::with_document("site1", "articles/test.md");
        let content = MemoryContent::with_object("site1/main/raw/articles/test.md", doc.as_bytes());
        let (pipeline, catalog, _, _) = pipeline(catalog, content, MemorySearch::default());

        let err = pipeline.process(&key("articles/test.md")).await.unwrap_err();
        assert!(matches!(err, PipelineError::ParseError(_)));
        assert_eq!(catalog.row(id).unwrap().status, SyncStatus::Error);
    }

    #[tokio::test]
    async fn test_frontmatter_permalink_wins() {
        let doc = "---\ntitle: \"T\"\npermalink: /custom/place/\n---\nBody.";
        let (catalog, id) = MemoryCatalog::with_document("site1", "articles/test.md");
        let content = MemoryContent::with_object("site1/main/raw/articles/test.md", doc.as_bytes());
        let (pipeline, catalog, _, _) = pipeline(catalog, content, MemorySearch::default());

        pipeline.process(&key("articles/test.md")).await.unwrap();
        assert_eq!(
            catalog.row(id).unwrap().permalink.as_deref(),
            Some("custom/place")
        );
    }
}
