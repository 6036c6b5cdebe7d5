//! Content store abstraction over the two storage backends.
//!
//! The pipeline reads and deletes objects through the [`ContentStore`]
//! trait; deployment configuration selects the S3-compatible backend or the
//! local filesystem bucket at construction time, so no call site branches on
//! the deployment mode.

mod fs;
mod s3;

use async_trait::async_trait;

use crate::errors::PipelineError;

pub use fs::FsContentStore;
pub use s3::{S3Config, S3ContentStore};

/// Maximum object size the pipeline will materialize into memory (5 MiB).
///
/// The reported size is checked before the body is read so an unexpectedly
/// large upload cannot balloon memory use.
pub const MAX_OBJECT_BYTES: u64 = 5 * 1024 * 1024;

/// An object fetched from storage.
#[derive(Debug, Clone)]
pub struct FetchedObject {
    /// The object's content.
    pub bytes: Vec<u8>,
    /// The object's size as reported by the backend.
    pub size: u64,
}

/// Uniform gateway over the storage backends.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one store handle is shared across
/// all concurrent per-batch tasks.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch an object's content.
    ///
    /// The implementation obtains the object's size before materializing the
    /// body and fails with [`PipelineError::FileTooLarge`] when it exceeds
    /// [`MAX_OBJECT_BYTES`], without reading the full body.
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedObject)` - The object's content and reported size
    /// * `Err(PipelineError::ObjectNotFound)` - If the object is missing
    /// * `Err(PipelineError::FileTooLarge)` - If the size ceiling is exceeded
    /// * `Err(PipelineError::StorageError)` - On any other access failure
    async fn fetch(&self, key: &str) -> Result<FetchedObject, PipelineError>;

    /// Delete an object. Idempotent: deleting an absent object is `Ok(())`.
    async fn delete(&self, key: &str) -> Result<(), PipelineError>;
}

/// Check a reported size against the ceiling before the body is read.
pub(crate) fn check_size(size: u64) -> Result<(), PipelineError> {
    if size > MAX_OBJECT_BYTES {
        return Err(PipelineError::FileTooLarge {
            size,
            limit: MAX_OBJECT_BYTES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_size_at_and_over_limit() {
        assert!(check_size(0).is_ok());
        assert!(check_size(MAX_OBJECT_BYTES).is_ok());

        let err = check_size(MAX_OBJECT_BYTES + 1).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::FileTooLarge { size, limit }
                if size == MAX_OBJECT_BYTES + 1 && limit == MAX_OBJECT_BYTES
        ));
    }
}
