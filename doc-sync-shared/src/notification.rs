//! Storage-change notification envelope and decoded object key.

use serde::{Deserialize, Serialize};

/// A message describing a single object-storage change, delivered via the
/// queue. Ephemeral; not persisted by this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// The changed object.
    pub object: NotificationObject,
}

/// The object portion of a storage notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationObject {
    /// Raw storage key, shaped `{siteId}/{branch}/raw/{relativePath}`.
    pub key: String,
}

impl Notification {
    /// Build a notification for the given raw key.
    pub fn for_key(key: impl Into<String>) -> Self {
        Self {
            object: NotificationObject { key: key.into() },
        }
    }
}

/// A storage object key decoded into its constituent parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    /// Owning tenant identifier.
    pub site_id: String,
    /// Branch name.
    pub branch: String,
    /// Repository-relative path within the branch.
    pub path: String,
}

impl ObjectKey {
    /// Reassemble the raw storage key for this object.
    pub fn storage_key(&self) -> String {
        format!("{}/{}/raw/{}", self.site_id, self.branch, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_deserializes_envelope() {
        let json = r#"{ "object": { "key": "site1/main/raw/articles/test.md" } }"#;
        let n: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(n.object.key, "site1/main/raw/articles/test.md");
    }

    #[test]
    fn test_storage_key_round_trip() {
        let key = ObjectKey {
            site_id: "site1".to_string(),
            branch: "main".to_string(),
            path: "articles/test.md".to_string(),
        };
        assert_eq!(key.storage_key(), "site1/main/raw/articles/test.md");
    }
}
