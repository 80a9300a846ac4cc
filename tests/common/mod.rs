//! Shared E2E test infrastructure for s3wipe-rs.
//!
//! Provides `TestHelper` for bucket setup, object uploads and pipeline
//! execution against real AWS S3. All helpers use the `s3wipe-e2e-test` AWS profile.

#![allow(dead_code)]

use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::types::{
    BucketLocationConstraint, BucketVersioningStatus, CreateBucketConfiguration, Delete,
    ObjectIdentifier, VersioningConfiguration,
};
use s3wipe_rs::config::args::build_config_from_args;
use s3wipe_rs::{
    Config, PipelineCancellationToken, ProgressSnapshot, WipePipeline,
    create_pipeline_cancellation_token,
};
use uuid::Uuid;

/// AWS profile used for all E2E tests.
const AWS_PROFILE: &str = "s3wipe-e2e-test";

/// Region used for the bucket location constraint when the profile has none.
const DEFAULT_REGION: &str = "us-east-1";

/// Result of running a wipe pipeline.
#[derive(Debug)]
pub struct PipelineResult {
    pub progress: ProgressSnapshot,
    pub has_error: bool,
    pub has_panic: bool,
    pub has_warning: bool,
    pub bucket_deleted: bool,
    /// Error messages collected from the pipeline (empty if no errors).
    pub errors: Vec<String>,
}

/// RAII guard that removes the bucket and everything in it when dropped.
///
/// Most tests expect the pipeline to delete the bucket; the guard only does
/// real work when a test fails half-way.
pub struct BucketGuard {
    helper: Arc<TestHelper>,
    bucket: String,
    cleaned: bool,
}

impl BucketGuard {
    /// Explicit async cleanup; preferred over relying on `Drop`.
    pub async fn cleanup(mut self) {
        self.helper.delete_bucket_cascade(&self.bucket).await;
        self.cleaned = true;
    }
}

impl Drop for BucketGuard {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        let helper = self.helper.clone();
        let bucket = self.bucket.clone();
        // block_on panics inside a runtime that is shutting down; never double-panic.
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tokio::task::block_in_place(|| {
                tokio::runtime::Handle::current().block_on(async move {
                    helper.delete_bucket_cascade(&bucket).await;
                });
            });
        }));
    }
}

/// Shared test helper for E2E tests.
pub struct TestHelper {
    client: Client,
    region: String,
}

impl TestHelper {
    pub async fn new() -> Arc<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(AWS_PROFILE)
            .load()
            .await;

        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let client = Client::new(&sdk_config);

        Arc::new(Self { client, region })
    }

    pub fn bucket_guard(self: &Arc<Self>, bucket: &str) -> BucketGuard {
        BucketGuard {
            helper: Arc::clone(self),
            bucket: bucket.to_string(),
            cleaned: false,
        }
    }

    /// Unique bucket name, e.g. `s3wipe-e2e-<uuid>`.
    pub fn generate_bucket_name(&self) -> String {
        format!("s3wipe-e2e-{}", Uuid::new_v4())
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    // -----------------------------------------------------------------------
    // Bucket management
    // -----------------------------------------------------------------------

    /// Create a bucket without versioning.
    pub async fn create_bucket(&self, bucket: &str) {
        let mut builder = self.client.create_bucket().bucket(bucket);

        // us-east-1 must NOT specify a location constraint
        if self.region != "us-east-1" {
            let constraint = BucketLocationConstraint::from(self.region.as_str());
            let config = CreateBucketConfiguration::builder()
                .location_constraint(constraint)
                .build();
            builder = builder.create_bucket_configuration(config);
        }

        builder
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to create bucket {bucket}: {e}"));
    }

    pub async fn create_versioned_bucket(&self, bucket: &str) {
        self.create_bucket(bucket).await;

        let versioning_config = VersioningConfiguration::builder()
            .status(BucketVersioningStatus::Enabled)
            .build();

        self.client
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(versioning_config)
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to enable versioning on {bucket}: {e}"));
    }

    pub async fn bucket_exists(&self, bucket: &str) -> bool {
        self.client.head_bucket().bucket(bucket).send().await.is_ok()
    }

    pub async fn is_versioning_enabled(&self, bucket: &str) -> bool {
        let output = self
            .client
            .get_bucket_versioning()
            .bucket(bucket)
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to get versioning of {bucket}: {e}"));
        output.status() == Some(&BucketVersioningStatus::Enabled)
    }

    /// Remove every version, every delete marker and the bucket itself.
    pub async fn delete_bucket_cascade(&self, bucket: &str) {
        let _ = self.client.delete_bucket_policy().bucket(bucket).send().await;

        let mut key_marker: Option<String> = None;
        let mut version_id_marker: Option<String> = None;

        loop {
            let resp = match self
                .client
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.clone())
                .set_version_id_marker(version_id_marker.clone())
                .send()
                .await
            {
                Ok(r) => r,
                // Already gone, or not accessible.
                Err(_) => return,
            };

            let mut objects_to_delete: Vec<ObjectIdentifier> = Vec::new();
            let versions = resp
                .versions()
                .iter()
                .map(|v| (v.key(), v.version_id()))
                .chain(
                    resp.delete_markers()
                        .iter()
                        .map(|m| (m.key(), m.version_id())),
                );
            for (key, version_id) in versions {
                if let Some(key) = key {
                    objects_to_delete.push(
                        ObjectIdentifier::builder()
                            .key(key)
                            .set_version_id(version_id.map(String::from))
                            .build()
                            .unwrap(),
                    );
                }
            }

            for chunk in objects_to_delete.chunks(1000) {
                let delete = Delete::builder()
                    .set_objects(Some(chunk.to_vec()))
                    .quiet(true)
                    .build()
                    .unwrap();
                let _ = self
                    .client
                    .delete_objects()
                    .bucket(bucket)
                    .delete(delete)
                    .send()
                    .await;
            }

            if resp.is_truncated() == Some(true) {
                key_marker = resp.next_key_marker().map(|s| s.to_string());
                version_id_marker = resp.next_version_id_marker().map(|s| s.to_string());
            } else {
                break;
            }
        }

        let _ = self.client.delete_bucket().bucket(bucket).send().await;
    }

    // -----------------------------------------------------------------------
    // Object operations
    // -----------------------------------------------------------------------

    pub async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body.into())
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to put object {key} in {bucket}: {e}"));
    }

    /// Upload many objects concurrently.
    pub async fn put_objects_parallel(&self, bucket: &str, keys: Vec<String>) {
        let mut set = tokio::task::JoinSet::new();

        for key in keys {
            let client = self.client.clone();
            let bucket = bucket.to_string();
            set.spawn(async move {
                client
                    .put_object()
                    .bucket(&bucket)
                    .key(&key)
                    .body(key.as_bytes().to_vec().into())
                    .send()
                    .await
                    .unwrap_or_else(|e| panic!("Failed to put object {key} in {bucket}: {e}"));
            });
        }

        while let Some(result) = set.join_next().await {
            result.expect("Upload task panicked");
        }
    }

    /// Delete a key without a version id, leaving a delete marker on versioned buckets.
    pub async fn delete_object(&self, bucket: &str, key: &str) {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to delete object {key} in {bucket}: {e}"));
    }

    /// Count object versions plus delete markers in a bucket.
    pub async fn count_object_versions(&self, bucket: &str) -> usize {
        let mut count = 0;
        let mut key_marker: Option<String> = None;
        let mut version_id_marker: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.clone())
                .set_version_id_marker(version_id_marker.clone())
                .send()
                .await
                .unwrap_or_else(|e| panic!("Failed to list object versions in {bucket}: {e}"));

            count += resp.versions().len() + resp.delete_markers().len();

            if resp.is_truncated() == Some(true) {
                key_marker = resp.next_key_marker().map(|s| s.to_string());
                version_id_marker = resp.next_version_id_marker().map(|s| s.to_string());
            } else {
                break;
            }
        }

        count
    }

    /// Deny version deletion under `prefix` so DeleteObjects reports AccessDenied for those keys.
    pub async fn deny_delete_on_prefix(&self, bucket: &str, prefix: &str) {
        let policy = format!(
            r#"{{
  "Version": "2012-10-17",
  "Statement": [
    {{
      "Sid": "DenyDeleteOnPrefix",
      "Effect": "Deny",
      "Principal": "*",
      "Action": ["s3:DeleteObject", "s3:DeleteObjectVersion"],
      "Resource": "arn:aws:s3:::{bucket}/{prefix}*"
    }}
  ]
}}"#
        );

        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to put deny policy on {bucket}/{prefix}: {e}"));
    }

    // -----------------------------------------------------------------------
    // Pipeline helpers
    // -----------------------------------------------------------------------

    /// Build a `Config` from CLI-style arguments.
    ///
    /// Prepends the binary name and appends `--profile s3wipe-e2e-test`
    /// unless credentials are already given.
    pub fn build_config(args: Vec<&str>) -> Config {
        let mut full_args: Vec<String> = vec!["s3wipe".to_string()];
        full_args.extend(args.iter().map(|s| s.to_string()));

        let has_credentials = full_args
            .iter()
            .any(|a| a.starts_with("--profile") || a.starts_with("--access-key"));
        if !has_credentials {
            full_args.push("--profile".to_string());
            full_args.push(AWS_PROFILE.to_string());
        }

        build_config_from_args(full_args)
            .unwrap_or_else(|e| panic!("Failed to build config from args: {e}"))
    }

    pub async fn run_pipeline(config: Config) -> PipelineResult {
        Self::run_pipeline_with_token(config, create_pipeline_cancellation_token()).await
    }

    pub async fn run_pipeline_with_token(
        config: Config,
        token: PipelineCancellationToken,
    ) -> PipelineResult {
        let mut pipeline = WipePipeline::new(config, token).await;
        pipeline.run().await;

        let errors = pipeline
            .get_errors_and_consume()
            .unwrap_or_default()
            .into_iter()
            .map(|e| format!("{e:?}"))
            .collect();

        PipelineResult {
            progress: pipeline.progress(),
            has_error: pipeline.has_error(),
            has_panic: pipeline.has_panic(),
            has_warning: pipeline.has_warning(),
            bucket_deleted: pipeline.is_bucket_deleted(),
            errors,
        }
    }
}

/// Default timeout for E2E tests.
pub const E2E_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(300);

/// Wraps an async E2E test body with a timeout.
#[macro_export]
macro_rules! e2e_timeout {
    ($body:expr) => {
        tokio::time::timeout(common::E2E_TIMEOUT, $body)
            .await
            .expect("E2E test timed out")
    };
}
