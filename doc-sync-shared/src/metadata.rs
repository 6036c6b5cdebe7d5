//! Extracted document metadata.
//!
//! The extractor produces a `title`, a `description`, and a pass-through map
//! of every frontmatter field it does not itself interpret. The whole bag is
//! persisted verbatim into the catalog's `metadata` JSON column.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata extracted from a markdown document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Resolved document title (may be empty).
    pub title: String,
    /// Resolved document description (may be empty).
    pub description: String,
    /// Frontmatter fields passed through verbatim (`authors`, `date`,
    /// `permalink`, `publish`, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl DocumentMetadata {
    /// Whether frontmatter explicitly suppresses publication.
    ///
    /// Only an explicit `publish: false` suppresses; absent or any other
    /// value publishes.
    pub fn publish_suppressed(&self) -> bool {
        matches!(self.extra.get("publish"), Some(Value::Bool(false)))
    }

    /// The frontmatter `permalink` field, if present and a string.
    pub fn permalink(&self) -> Option<&str> {
        self.extra.get("permalink").and_then(Value::as_str)
    }

    /// Author names from the frontmatter `authors` field.
    ///
    /// Accepts either a list of strings or a single string.
    pub fn authors(&self) -> Vec<String> {
        match self.extra.get("authors") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// The frontmatter `date` as seconds since epoch, if parseable.
    ///
    /// Expects the normalized `YYYY-MM-DDTHH:MM:SS.mmmZ` form the extractor
    /// writes, but tolerates any RFC 3339 timestamp or a bare date.
    pub fn date_epoch(&self) -> Option<i64> {
        let raw = self.extra.get("date").and_then(Value::as_str)?;
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
            return Some(dt.timestamp());
        }
        chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp())
    }
}
