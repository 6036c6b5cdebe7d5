//! Kafka consumer for storage-change notifications.
//!
//! Collects notifications into small batches, fans each batch out to the
//! processing pipeline concurrently, and commits offsets per message only
//! after that message's processing succeeded. Auto-commit is disabled so an
//! unacknowledged message is redelivered by the broker.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    message::{BorrowedMessage, Message as KafkaMessage},
    TopicPartitionList,
};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::messages::QueuedMessage;
use crate::errors::PipelineError;
use crate::key;
use crate::pipeline::ProcessingPipeline;
use doc_sync_shared::Notification;

/// Top-level directory whose objects are internal bookkeeping, never
/// documents. Notifications for it are acknowledged without processing.
const RESERVED_DIR: &str = "_internal";

/// Kafka consumer for storage notifications.
pub struct QueueConsumer {
    consumer: StreamConsumer,
    topic: String,
    batch_size: usize,
    batch_window: Duration,
}

impl QueueConsumer {
    /// Create a new consumer.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Kafka broker addresses (comma-separated)
    /// * `group_id` - Consumer group ID
    /// * `topic` - Notification topic to subscribe to
    /// * `batch_size` - Maximum messages handled per batch
    /// * `batch_window` - How long to wait for a batch to fill
    ///
    /// # Returns
    ///
    /// * `Ok(QueueConsumer)` - A new consumer instance
    /// * `Err(PipelineError)` - If consumer creation fails
    pub fn new(
        brokers: &str,
        group_id: &str,
        topic: &str,
        batch_size: usize,
        batch_window: Duration,
    ) -> Result<Self, PipelineError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()?;

        info!(brokers = %brokers, group_id = %group_id, topic = %topic, "Created Kafka consumer");

        Ok(Self {
            consumer,
            topic: topic.to_string(),
            batch_size,
            batch_window,
        })
    }

    /// Subscribe to the notification topic.
    pub fn subscribe(&self) -> Result<(), PipelineError> {
        self.consumer.subscribe(&[self.topic.as_str()])?;
        info!(topic = %self.topic, "Subscribed to Kafka topic");
        Ok(())
    }

    /// Consume until shutdown, handing batches to the pipeline.
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Pipeline that processes each decoded notification
    /// * `shutdown` - Shutdown signal receiver
    #[instrument(skip(self, pipeline, shutdown))]
    pub async fn run(
        &self,
        pipeline: Arc<ProcessingPipeline>,
        mut shutdown: tokio::sync::broadcast::Receiver<()>,
    ) -> Result<(), PipelineError> {
        let mut stream = self.consumer.stream();

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal");
                    break;
                }
                first = stream.next() => {
                    match first {
                        Some(Ok(msg)) => {
                            let mut batch = vec![Self::detach(&msg)];
                            self.fill_batch(&mut stream, &mut batch).await;
                            self.handle_batch(batch, &pipeline).await;
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Kafka error");
                        }
                        None => {
                            info!("Kafka stream ended");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Collect further messages until the batch is full or the window
    /// elapses.
    async fn fill_batch<'a>(
        &self,
        stream: &mut (impl futures::Stream<Item = rdkafka::error::KafkaResult<BorrowedMessage<'a>>>
                  + Unpin),
        batch: &mut Vec<QueuedMessage>,
    ) {
        let deadline = tokio::time::Instant::now() + self.batch_window;

        while batch.len() < self.batch_size {
            match tokio::time::timeout_at(deadline, stream.next()).await {
                Ok(Some(Ok(msg))) => batch.push(Self::detach(&msg)),
                Ok(Some(Err(e))) => {
                    error!(error = %e, "Kafka error while filling batch");
                }
                // Stream ended; the outer loop will observe it too.
                Ok(None) => break,
                // Window elapsed.
                Err(_) => break,
            }
        }
    }

    /// Handle one batch: fan out concurrently, then advance each
    /// partition's committed offset up to its first failure.
    ///
    /// Messages in a batch are independent; nothing orders two messages
    /// that reference the same document.
    async fn handle_batch(&self, batch: Vec<QueuedMessage>, pipeline: &Arc<ProcessingPipeline>) {
        debug!(size = batch.len(), "Handling notification batch");

        let tasks = batch.into_iter().map(|message| {
            let pipeline = pipeline.clone();
            async move {
                let ack = handle_payload(&pipeline, &message.payload).await;
                (message, ack)
            }
        });

        let outcomes = futures::future::join_all(tasks).await;

        for (topic, partition, offset) in commit_watermarks(&outcomes) {
            if let Err(e) = self.commit(&topic, partition, offset) {
                error!(
                    partition = partition,
                    offset = offset,
                    error = %e,
                    "Failed to commit offset"
                );
            }
        }
    }

    /// Commit a partition's watermark.
    fn commit(&self, topic: &str, partition: i32, offset: i64) -> Result<(), PipelineError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(topic, partition, rdkafka::Offset::Offset(offset))?;
        self.consumer.commit(&tpl, CommitMode::Async)?;
        Ok(())
    }

    /// Copy the broker-owned message into an owned representation.
    fn detach(msg: &BorrowedMessage<'_>) -> QueuedMessage {
        QueuedMessage {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            payload: msg.payload().unwrap_or_default().to_vec(),
        }
    }
}

/// Handle one raw notification payload, returning whether to acknowledge.
///
/// An undecodable payload or invalid key is left unacknowledged; the broker
/// will redeliver it. Reserved-directory objects are acknowledged without
/// touching the pipeline.
pub(crate) async fn handle_payload(pipeline: &ProcessingPipeline, payload: &[u8]) -> bool {
    let notification: Notification = match serde_json::from_slice(payload) {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "Undecodable notification payload");
            return false;
        }
    };

    let decoded = match key::decode(&notification.object.key) {
        Ok(k) => k,
        Err(e) => {
            warn!(key = %notification.object.key, error = %e, "Invalid storage key");
            return false;
        }
    };

    if decoded.path.split('/').next() == Some(RESERVED_DIR) {
        debug!(key = %notification.object.key, "Skipping reserved directory object");
        return true;
    }

    match pipeline.process(&decoded).await {
        Ok(outcome) => {
            debug!(key = %notification.object.key, outcome = ?outcome, "Notification handled");
            true
        }
        Err(e) => {
            error!(key = %notification.object.key, error = %e, "Notification processing failed");
            false
        }
    }
}

/// Compute the offset to commit per partition after a batch.
///
/// A Kafka commit is a per-partition watermark, not a per-message receipt:
/// committing offset N acknowledges everything below N. So each partition
/// advances only to one past its highest offset in the contiguous run of
/// successes at the start of the batch; a failed message holds back every
/// later offset of its partition, leaving them all for redelivery.
/// Reprocessing a message that already succeeded is idempotent.
fn commit_watermarks(outcomes: &[(QueuedMessage, bool)]) -> Vec<(String, i32, i64)> {
    let mut per_partition: std::collections::HashMap<(String, i32), Vec<(i64, bool)>> =
        std::collections::HashMap::new();
    for (message, ack) in outcomes {
        per_partition
            .entry((message.topic.clone(), message.partition))
            .or_default()
            .push((message.offset, *ack));
    }

    let mut watermarks = Vec::new();
    for ((topic, partition), mut entries) in per_partition {
        entries.sort_by_key(|(offset, _)| *offset);

        let mut next = None;
        for (offset, ack) in entries {
            if !ack {
                break;
            }
            next = Some(offset + 1);
        }
        if let Some(next) = next {
            watermarks.push((topic, partition, next));
        }
    }
    watermarks
}
