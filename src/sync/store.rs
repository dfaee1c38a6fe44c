//! Bucket store trait
//!
//! The mirror only needs a handful of bucket operations. [`BucketStore`]
//! names them so the deploy flow runs the same against the S3 client and the
//! in-memory store used by tests.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Operations on one bucket of an S3-compatible object store.
///
/// Implementations report failures as [`DeployError::Remote`]; callers wrap
/// them with provisioning or transfer context.
///
/// [`DeployError::Remote`]: crate::error::DeployError::Remote
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Bucket this store writes to
    fn bucket(&self) -> &str;

    /// Whether the bucket exists
    async fn bucket_exists(&self) -> Result<bool>;

    /// Create the bucket. Returns `false` when it already existed.
    async fn create_bucket(&self, region: Option<&str>) -> Result<bool>;

    /// Every key starting with `prefix`, across all listing pages
    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>>;

    /// Upload a local file to `key`, overwriting any existing object.
    /// Returns the number of bytes sent.
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<u64>;

    /// Delete one batch of keys
    async fn delete_keys(&self, keys: &[String]) -> Result<()>;
}
