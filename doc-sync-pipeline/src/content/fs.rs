//! Local filesystem content store.
//!
//! Dev-mode backend: a local directory acts as the bucket, with object keys
//! mapped to relative paths beneath it. Used when the worker runs against a
//! local content tree instead of object storage.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::content::{check_size, ContentStore, FetchedObject};
use crate::errors::PipelineError;

/// Content store over a local directory.
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to a path under the root, rejecting traversal.
    fn resolve(&self, key: &str) -> Result<PathBuf, PipelineError> {
        let relative = Path::new(key);
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(PipelineError::storage(format!(
                        "key escapes content root: {}",
                        key
                    )))
                }
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    #[instrument(skip(self))]
    async fn fetch(&self, key: &str) -> Result<FetchedObject, PipelineError> {
        let path = self.resolve(key)?;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::object_not_found(key));
            }
            Err(e) => return Err(PipelineError::storage(format!("stat {}: {}", key, e))),
        };

        if !metadata.is_file() {
            return Err(PipelineError::object_not_found(key));
        }

        // Size check from metadata before the file is read.
        let size = metadata.len();
        check_size(size)?;

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| PipelineError::storage(format!("read {}: {}", key, e)))?;

        debug!(key = %key, size = size, "Fetched object from local store");

        Ok(FetchedObject { bytes, size })
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<(), PipelineError> {
        let path = self.resolve(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key = %key, "Deleted object from local store");
                Ok(())
            }
            // Deleting an absent object is not an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PipelineError::storage(format!("remove {}: {}", key, e))),
        }
    }
}
