//! Queue message types carried between the consumer loop and batch handling.

/// A queue message detached from the underlying Kafka borrow.
///
/// Batches outlive the poll that produced them, so the payload and offset
/// coordinates are copied out of the broker-owned buffer up front.
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    /// Topic the message arrived on.
    pub topic: String,
    /// Partition within the topic.
    pub partition: i32,
    /// Offset of this message within the partition.
    pub offset: i64,
    /// Raw notification payload.
    pub payload: Vec<u8>,
}
