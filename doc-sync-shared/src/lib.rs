//! # Doc Sync Shared
//!
//! Shared types and data structures for the document sync worker.
//!
//! This crate defines the catalog document record, the extracted metadata
//! bag, the derived search document, and the storage notification envelope
//! that flow between the pipeline, repository, and binary crates.

pub mod document;
pub mod metadata;
pub mod notification;
pub mod search;

pub use document::{DocumentRecord, SyncStatus};
pub use metadata::DocumentMetadata;
pub use notification::{Notification, NotificationObject, ObjectKey};
pub use search::SearchDocument;
