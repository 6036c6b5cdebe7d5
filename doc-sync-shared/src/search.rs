//! Derived search document.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metadata::DocumentMetadata;

/// The index-only projection of a document's searchable fields.
///
/// Fully owned by the search indexer and rebuildable at any time from the
/// catalog record plus the stored content; it has no independent lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    /// Same as the catalog document id.
    pub id: Uuid,
    /// Resolved title.
    pub title: String,
    /// Document body with frontmatter stripped.
    pub content: String,
    /// Repository-relative path.
    pub path: String,
    /// Resolved description.
    pub description: String,
    /// Author names.
    pub authors: Vec<String>,
    /// Publication date in seconds since epoch, when known.
    pub date: Option<i64>,
}

impl SearchDocument {
    /// Project a search document from extracted metadata and body.
    pub fn from_extracted(
        id: Uuid,
        path: impl Into<String>,
        metadata: &DocumentMetadata,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: metadata.title.clone(),
            content: body.into(),
            path: path.into(),
            description: metadata.description.clone(),
            authors: metadata.authors(),
            date: metadata.date_epoch(),
        }
    }
}
