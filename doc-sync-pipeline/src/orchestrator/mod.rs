//! Orchestrator for the document sync pipeline.
//!
//! Owns the consumer lifecycle: startup health checks, the shutdown
//! broadcast channel, and the wait for a clean drain on exit.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};

use crate::consumer::QueueConsumer;
use crate::errors::PipelineError;
use crate::pipeline::{BatchContext, ProcessingPipeline};
use doc_sync_repository::SearchIndexClient;

/// Orchestrator that runs the consumer against the processing pipeline.
///
/// The orchestrator:
/// - Verifies the search cluster is reachable at startup
/// - Runs the consumer loop in a background task
/// - Propagates `ctrl_c` as a broadcast shutdown signal
/// - Waits for the consumer to drain before returning
pub struct Orchestrator {
    consumer: Arc<QueueConsumer>,
    pipeline: Arc<ProcessingPipeline>,
    search: Arc<dyn SearchIndexClient>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Orchestrator {
    /// Create a new orchestrator over the consumer and batch context.
    pub fn new(consumer: QueueConsumer, ctx: BatchContext) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let search = ctx.search.clone();

        Self {
            consumer: Arc::new(consumer),
            pipeline: Arc::new(ProcessingPipeline::new(ctx)),
            search,
            shutdown_tx,
        }
    }

    /// Run until the consumer stops or a shutdown signal arrives.
    ///
    /// Blocks for the lifetime of the worker. An unreachable search cluster
    /// is logged but does not prevent startup; index writes are best-effort
    /// anyway.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), PipelineError> {
        info!("Starting document sync orchestrator");

        match self.search.health_check().await {
            Ok(true) => info!("Search cluster healthy"),
            Ok(false) => warn!("Search cluster reachable but not healthy"),
            Err(e) => warn!(error = %e, "Search cluster health check failed"),
        }

        self.consumer.subscribe()?;

        let consumer = self.consumer.clone();
        let pipeline = self.pipeline.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();

        let mut consumer_handle = tokio::spawn(async move {
            if let Err(e) = consumer.run(pipeline, shutdown_rx).await {
                error!(error = %e, "Consumer error");
            }
        });

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                let _ = self.shutdown_tx.send(());
                // Let the consumer finish its in-flight batch.
                let _ = (&mut consumer_handle).await;
            }
            _ = &mut consumer_handle => {
                info!("Consumer stopped");
            }
        }

        info!("Orchestrator shutdown complete");
        Ok(())
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
