//! # Doc Sync Pipeline
//!
//! This crate provides the event-processing pipeline for the document sync
//! worker: it consumes storage-change notifications from Kafka, fetches the
//! changed markdown content from object storage, extracts metadata, drives
//! the per-document sync-status state machine in the catalog, and maintains
//! a best-effort search index.
//!
//! ## Architecture
//!
//! 1. **Consumer**: receives notification batches from Kafka
//! 2. **KeyCodec**: decodes storage keys into `(site, branch, path)`
//! 3. **ContentStore**: fetches/deletes objects (S3-compatible or local)
//! 4. **Extractor**: splits frontmatter and derives title/description
//! 5. **Pipeline**: orchestrates the above per notification
//! 6. **Orchestrator**: coordinates lifecycle and shutdown

pub mod consumer;
pub mod content;
pub mod errors;
pub mod extract;
pub mod key;
pub mod orchestrator;
pub mod pipeline;

pub use errors::PipelineError;
