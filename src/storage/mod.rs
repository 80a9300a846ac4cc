use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::operation::delete_objects::DeleteObjectsOutput;
use aws_sdk_s3::operation::list_object_versions::ListObjectVersionsOutput;
use aws_sdk_s3::types::ObjectIdentifier;
use dyn_clone::DynClone;

use crate::config::{ClientConfig, Config};

pub mod s3;

/// Type alias for a boxed Storage trait object.
///
/// Every worker owns its own clone (`dyn_clone::clone_box`); S3 clones share
/// one SDK client and therefore one connection pool.
pub type Storage = Box<dyn StorageTrait + Send + Sync>;

/// Factory trait for creating Storage instances.
#[async_trait]
pub trait StorageFactory {
    async fn create(bucket: String, client_config: Option<ClientConfig>) -> Storage;
}

/// Bucket-level operations needed to wipe a bucket.
///
/// All object keys passed in and out are full keys; there is no prefix
/// scoping at this level.
#[async_trait]
pub trait StorageTrait: DynClone {
    /// The bucket this storage operates on.
    fn bucket(&self) -> &str;

    /// Check that the bucket exists and is accessible.
    ///
    /// Fails with [`S3WipeError::BucketNotFound`](crate::types::error::S3WipeError::BucketNotFound)
    /// or [`S3WipeError::BucketInaccessible`](crate::types::error::S3WipeError::BucketInaccessible).
    async fn head_bucket(&self) -> Result<()>;

    /// Check if versioning is enabled on the bucket.
    async fn is_versioning_enabled(&self) -> Result<bool>;

    /// Turn bucket versioning on.
    async fn enable_versioning(&self) -> Result<()>;

    /// Fetch one ListObjectVersions page.
    ///
    /// With a `delimiter`, keys below the delimiter are rolled up into
    /// common prefixes instead of being returned as versions.
    async fn list_object_versions(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        key_marker: Option<String>,
        version_id_marker: Option<String>,
        max_keys: i32,
    ) -> Result<ListObjectVersionsOutput>;

    /// Delete up to 1000 object versions in one DeleteObjects call.
    ///
    /// Returns the per-key outcome; a partially failed batch is not an error.
    async fn delete_objects(&self, objects: Vec<ObjectIdentifier>) -> Result<DeleteObjectsOutput>;

    /// Delete the (now empty) bucket.
    ///
    /// Fails with [`S3WipeError::BucketDeletion`](crate::types::error::S3WipeError::BucketDeletion).
    async fn delete_bucket(&self) -> Result<()>;
}

dyn_clone::clone_trait_object!(StorageTrait);

/// Create the S3 storage for the configured bucket.
pub async fn create_storage(config: &Config) -> Storage {
    s3::S3StorageFactory::create(config.bucket.clone(), config.target_client_config.clone()).await
}
