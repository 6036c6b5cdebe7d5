//! Queue consumer for the document sync pipeline.
//!
//! Receives storage-change notifications from Kafka and drives them through
//! the processing pipeline with per-message acknowledgement.

mod kafka_consumer;
mod messages;

pub use kafka_consumer::QueueConsumer;
pub use messages::QueuedMessage;
