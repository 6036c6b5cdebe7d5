//! Catalog document record and sync status types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-document synchronization status, as stored in the catalog.
///
/// Serialized as SCREAMING_SNAKE strings (`PENDING`, `PROCESSING`, ...)
/// both in JSON and in the catalog column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    /// Record created, no notification processed yet.
    Pending,
    /// A pipeline task has claimed the document and is working on it.
    Processing,
    /// Metadata persisted and `sync_error` cleared.
    Success,
    /// Processing failed; the failure message is in `sync_error`.
    Error,
}

impl SyncStatus {
    /// The catalog column representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "PENDING",
            SyncStatus::Processing => "PROCESSING",
            SyncStatus::Success => "SUCCESS",
            SyncStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SyncStatus::Pending),
            "PROCESSING" => Ok(SyncStatus::Processing),
            "SUCCESS" => Ok(SyncStatus::Success),
            "ERROR" => Ok(SyncStatus::Error),
            other => Err(format!("unknown sync status: {}", other)),
        }
    }
}

/// A catalog row representing one tracked file and its extracted metadata.
///
/// Rows are created by an external collaborator when the file first lands in
/// storage; the sync pipeline only updates or deletes them. `(site_id, path)`
/// and `(site_id, app_path)` are each unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Primary key.
    pub id: Uuid,
    /// Owning tenant.
    pub site_id: String,
    /// Repository-relative file path.
    pub path: String,
    /// Derived routing path.
    pub app_path: String,
    /// Object size in bytes.
    pub size: i64,
    /// Content hash of the stored object.
    pub content_hash: String,
    /// File extension (e.g. `md`, `mdx`, `png`).
    pub extension: String,
    /// Arbitrary JSON bag of extracted metadata.
    pub metadata: serde_json::Value,
    /// Normalized permalink (no leading/trailing slash).
    pub permalink: Option<String>,
    /// Current pipeline status for this document.
    pub sync_status: SyncStatus,
    /// Failure message from the last attempt, if any.
    pub sync_error: Option<String>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}
