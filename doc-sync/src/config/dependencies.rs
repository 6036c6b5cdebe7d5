//! Dependency initialization and wiring for the document sync worker.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::WorkerError;
use doc_sync_pipeline::{
    consumer::QueueConsumer,
    content::{ContentStore, FsContentStore, S3Config, S3ContentStore},
    orchestrator::Orchestrator,
    pipeline::BatchContext,
};
use doc_sync_repository::{OpenSearchIndexClient, PgCatalogStore, SearchIndexClient};

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default Kafka broker address.
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default Kafka consumer group ID.
const DEFAULT_KAFKA_GROUP_ID: &str = "doc-sync";

/// Default notification topic.
const DEFAULT_KAFKA_TOPIC: &str = "storage.notifications";

/// Default S3 region.
const DEFAULT_S3_REGION: &str = "us-east-1";

/// Default batch size.
const DEFAULT_BATCH_SIZE: usize = 32;

/// Default batch collection window in milliseconds.
const DEFAULT_BATCH_WINDOW_MS: u64 = 1000;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: Postgres connection string (required)
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
    /// - `KAFKA_GROUP_ID`: Consumer group ID (default: doc-sync)
    /// - `KAFKA_TOPIC`: Notification topic (default: storage.notifications)
    /// - `STORAGE_MODE`: `s3` or `fs` (default: s3)
    /// - `S3_BUCKET`: Bucket name (required in s3 mode)
    /// - `S3_REGION`: Signing region (default: us-east-1)
    /// - `S3_ENDPOINT`: Custom endpoint for S3-compatible services (optional)
    /// - `CONTENT_DIR`: Content root directory (required in fs mode)
    /// - `BATCH_SIZE`: Maximum messages per batch (default: 32)
    /// - `BATCH_WINDOW_MS`: Batch collection window (default: 1000)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(WorkerError)` - If initialization fails
    pub async fn new() -> Result<Self, WorkerError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| WorkerError::config("DATABASE_URL environment variable not set"))?;
        let opensearch_url =
            env::var("OPENSEARCH_URL").unwrap_or_else(|_| DEFAULT_OPENSEARCH_URL.to_string());
        let kafka_broker =
            env::var("KAFKA_BROKER").unwrap_or_else(|_| DEFAULT_KAFKA_BROKER.to_string());
        let kafka_group_id =
            env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| DEFAULT_KAFKA_GROUP_ID.to_string());
        let kafka_topic =
            env::var("KAFKA_TOPIC").unwrap_or_else(|_| DEFAULT_KAFKA_TOPIC.to_string());
        let batch_size = parse_env("BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        let batch_window_ms = parse_env("BATCH_WINDOW_MS", DEFAULT_BATCH_WINDOW_MS)?;

        info!(
            opensearch_url = %opensearch_url,
            kafka_broker = %kafka_broker,
            kafka_group_id = %kafka_group_id,
            kafka_topic = %kafka_topic,
            batch_size = batch_size,
            "Initializing dependencies"
        );

        // Catalog connectivity is verified by the connection pool itself.
        let catalog = PgCatalogStore::connect(&database_url).await?;

        let search = OpenSearchIndexClient::new(&opensearch_url)?;
        let healthy = search.health_check().await?;
        if !healthy {
            return Err(WorkerError::config("OpenSearch cluster is unhealthy"));
        }
        info!("OpenSearch connection verified");

        let content = content_store_from_env()?;

        let consumer = QueueConsumer::new(
            &kafka_broker,
            &kafka_group_id,
            &kafka_topic,
            batch_size,
            Duration::from_millis(batch_window_ms),
        )?;
        info!("Kafka consumer created");

        let ctx = BatchContext::new(content, Arc::new(catalog), Arc::new(search));
        let orchestrator = Orchestrator::new(consumer, ctx);

        Ok(Self { orchestrator })
    }
}

/// Select the storage backend from `STORAGE_MODE`.
fn content_store_from_env() -> Result<Arc<dyn ContentStore>, WorkerError> {
    let mode = env::var("STORAGE_MODE").unwrap_or_else(|_| "s3".to_string());

    match mode.as_str() {
        "s3" => {
            let bucket = env::var("S3_BUCKET")
                .map_err(|_| WorkerError::config("S3_BUCKET is required when STORAGE_MODE=s3"))?;
            let region = env::var("S3_REGION").unwrap_or_else(|_| DEFAULT_S3_REGION.to_string());
            let endpoint_url = env::var("S3_ENDPOINT").ok();

            info!(bucket = %bucket, region = %region, "Using S3 content store");

            let store = S3ContentStore::new(S3Config {
                bucket,
                region,
                endpoint_url,
            })?;
            Ok(Arc::new(store))
        }
        "fs" => {
            let root = env::var("CONTENT_DIR")
                .map_err(|_| WorkerError::config("CONTENT_DIR is required when STORAGE_MODE=fs"))?;

            info!(root = %root, "Using filesystem content store");

            Ok(Arc::new(FsContentStore::new(root)))
        }
        other => Err(WorkerError::config(format!(
            "Unknown STORAGE_MODE: {} (expected s3 or fs)",
            other
        ))),
    }
}

/// Parse an optional numeric environment variable.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, WorkerError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| WorkerError::config(format!("Invalid value for {}: {}", name, raw))),
        Err(_) => Ok(default),
    }
}
