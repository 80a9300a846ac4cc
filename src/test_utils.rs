//! Shared test utilities for the s3wipe library crate.
//!
//! Besides the tracing and config helpers this provides [`MockStorage`], an
//! in-memory versioned bucket implementing [`StorageTrait`] that records
//! every call and lets tests inject failures.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::operation::delete_objects::DeleteObjectsOutput;
use aws_sdk_s3::operation::list_object_versions::ListObjectVersionsOutput;
use aws_sdk_s3::types::{
    CommonPrefix, DeleteMarkerEntry, DeletedObject, ObjectIdentifier, ObjectVersion,
};

use crate::config::{
    CLITimeoutConfig, ClientConfig, Config, ForceRetryConfig, RetryConfig,
};
use crate::storage::StorageTrait;
use crate::types::error::S3WipeError;
use crate::types::{AccessKeys, ClientConfigLocation, ObjectIdentity, S3Credentials};

/// Initialise a dummy tracing subscriber for tests.
///
/// Uses `try_init` so that only the first call in a process actually
/// installs the subscriber; subsequent calls are silently ignored.
pub(crate) fn init_dummy_tracing_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dummy=trace")
        .try_init();
}

/// Client configuration pointing at a local endpoint with static keys.
pub(crate) fn make_test_client_config() -> ClientConfig {
    ClientConfig {
        client_config_location: ClientConfigLocation::default(),
        credential: S3Credentials::Credentials {
            access_keys: AccessKeys {
                access_key: "test_key".to_string(),
                secret_access_key: "test_secret".to_string(),
                session_token: None,
            },
        },
        region: Some("us-east-1".to_string()),
        endpoint_url: Some("http://localhost:9000".to_string()),
        force_path_style: true,
        retry_config: RetryConfig {
            aws_max_attempts: 1,
            initial_backoff_milliseconds: 10,
        },
        cli_timeout_config: CLITimeoutConfig::default(),
    }
}

/// Create a [`Config`] suitable for most unit tests.
///
/// Key defaults: `batch_size=20`, `max_queue_size=100`, no force retries.
pub(crate) fn make_test_config(bucket: &str) -> Config {
    Config {
        bucket: bucket.to_string(),
        target_client_config: Some(make_test_client_config()),
        force_retry_config: ForceRetryConfig {
            force_retry_count: 0,
            force_retry_interval_milliseconds: 0,
        },
        tracing_config: None,
        batch_size: 20,
        max_queue_size: 100,
        max_keys: 1000,
        progress_interval_seconds: 1,
        auto_complete_shell: None,
    }
}

#[derive(Default)]
struct MockState {
    // (key, version_id) -> is_delete_marker
    objects: Mutex<BTreeMap<(String, String), bool>>,
    bucket_missing: AtomicBool,
    versioning_enabled: AtomicBool,
    enable_versioning_calls: AtomicUsize,
    delete_bucket_calls: AtomicUsize,
    listing_calls: Mutex<Vec<(String, Option<String>)>>,
    delete_objects_calls: Mutex<Vec<Vec<ObjectIdentifier>>>,
    failing_listing_prefix: Mutex<Option<String>>,
    failing_batch_key: Mutex<Option<String>>,
    failed_batches: Mutex<Vec<Vec<ObjectIdentifier>>>,
    transient_call_failures: AtomicU32,
    key_errors: Mutex<HashMap<String, String>>,
    transient_key_errors: Mutex<HashMap<String, (String, u32)>>,
    delete_delay: Mutex<Option<Duration>>,
    list_delay: Mutex<Option<Duration>>,
}

/// In-memory versioned bucket.
///
/// Clones share state, so a test keeps one handle for assertions and gives
/// a clone to the pipeline.
#[derive(Clone)]
pub(crate) struct MockStorage {
    bucket: String,
    state: Arc<MockState>,
}

enum ListingRow {
    Entry(ObjectIdentity, bool),
    Prefix(String),
}

impl ListingRow {
    fn sort_key(&self) -> (String, String) {
        match self {
            ListingRow::Entry(identity, _) => (
                identity.key.clone(),
                identity.version_id.clone().unwrap_or_default(),
            ),
            ListingRow::Prefix(prefix) => (prefix.clone(), String::new()),
        }
    }
}

impl MockStorage {
    pub(crate) fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            state: Arc::new(MockState::default()),
        }
    }

    pub(crate) fn add_object(&self, key: &str, version_id: &str) {
        self.state
            .objects
            .lock()
            .unwrap()
            .insert((key.to_string(), version_id.to_string()), false);
    }

    pub(crate) fn add_delete_marker(&self, key: &str, version_id: &str) {
        self.state
            .objects
            .lock()
            .unwrap()
            .insert((key.to_string(), version_id.to_string()), true);
    }

    /// Add `count` objects named `{prefix}object{i}` with one version each.
    pub(crate) fn add_objects(&self, prefix: &str, count: usize) {
        for i in 0..count {
            self.add_object(&format!("{prefix}object{i:04}"), &format!("v{i}"));
        }
    }

    pub(crate) fn set_bucket_missing(&self) {
        self.state.bucket_missing.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_versioning_enabled(&self, enabled: bool) {
        self.state.versioning_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Make every ListObjectVersions call for `prefix` fail.
    pub(crate) fn fail_listing_for_prefix(&self, prefix: &str) {
        *self.state.failing_listing_prefix.lock().unwrap() = Some(prefix.to_string());
    }

    /// Make every DeleteObjects call that contains `key` fail as a whole.
    pub(crate) fn fail_batch_containing(&self, key: &str) {
        *self.state.failing_batch_key.lock().unwrap() = Some(key.to_string());
    }

    /// Make the next `n` DeleteObjects calls fail as a whole.
    pub(crate) fn fail_next_delete_objects_calls(&self, n: u32) {
        self.state.transient_call_failures.store(n, Ordering::SeqCst);
    }

    /// Report `code` for `key` in every DeleteObjects response.
    pub(crate) fn set_key_error(&self, key: &str, code: &str) {
        self.state
            .key_errors
            .lock()
            .unwrap()
            .insert(key.to_string(), code.to_string());
    }

    /// Report `code` for `key` in the next `times` DeleteObjects responses.
    pub(crate) fn set_transient_key_error(&self, key: &str, code: &str, times: u32) {
        self.state
            .transient_key_errors
            .lock()
            .unwrap()
            .insert(key.to_string(), (code.to_string(), times));
    }

    pub(crate) fn set_delete_delay(&self, delay: Duration) {
        *self.state.delete_delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn set_list_delay(&self, delay: Duration) {
        *self.state.list_delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn remaining_objects(&self) -> usize {
        self.state.objects.lock().unwrap().len()
    }

    pub(crate) fn is_versioning_on(&self) -> bool {
        self.state.versioning_enabled.load(Ordering::SeqCst)
    }

    pub(crate) fn enable_versioning_calls(&self) -> usize {
        self.state.enable_versioning_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_bucket_calls(&self) -> usize {
        self.state.delete_bucket_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_objects_calls(&self) -> Vec<Vec<ObjectIdentifier>> {
        self.state.delete_objects_calls.lock().unwrap().clone()
    }

    pub(crate) fn failed_batches(&self) -> Vec<Vec<ObjectIdentifier>> {
        self.state.failed_batches.lock().unwrap().clone()
    }

    /// Distinct `(prefix, delimiter)` pairs ListObjectVersions was called with.
    pub(crate) fn listed_shards(&self) -> BTreeSet<(String, Option<String>)> {
        self.state
            .listing_calls
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .collect()
    }

    fn listing_rows(&self, prefix: &str, delimiter: Option<&str>) -> Vec<ListingRow> {
        let objects = self.state.objects.lock().unwrap();
        let mut rows = Vec::new();
        let mut seen_prefixes = BTreeSet::new();

        for ((key, version_id), is_delete_marker) in objects.iter() {
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };

            if let Some(delimiter) = delimiter {
                if let Some(pos) = rest.find(delimiter) {
                    let common_prefix = format!("{prefix}{}", &rest[..pos + delimiter.len()]);
                    if seen_prefixes.insert(common_prefix.clone()) {
                        rows.push(ListingRow::Prefix(common_prefix));
                    }
                    continue;
                }
            }

            rows.push(ListingRow::Entry(
                ObjectIdentity::new(key.clone(), Some(version_id.clone())),
                *is_delete_marker,
            ));
        }

        rows.sort_by_key(|row| row.sort_key());
        rows
    }
}

#[async_trait]
impl StorageTrait for MockStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn head_bucket(&self) -> Result<()> {
        if self.state.bucket_missing.load(Ordering::SeqCst) {
            return Err(anyhow!(S3WipeError::BucketNotFound(self.bucket.clone())));
        }
        Ok(())
    }

    async fn is_versioning_enabled(&self) -> Result<bool> {
        Ok(self.state.versioning_enabled.load(Ordering::SeqCst))
    }

    async fn enable_versioning(&self) -> Result<()> {
        self.state
            .enable_versioning_calls
            .fetch_add(1, Ordering::SeqCst);
        self.state.versioning_enabled.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn list_object_versions(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        key_marker: Option<String>,
        version_id_marker: Option<String>,
        max_keys: i32,
    ) -> Result<ListObjectVersionsOutput> {
        self.state
            .listing_calls
            .lock()
            .unwrap()
            .push((prefix.to_string(), delimiter.map(String::from)));

        let delay = *self.state.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.state.failing_listing_prefix.lock().unwrap().as_deref() == Some(prefix) {
            return Err(anyhow!("InternalError: listing of {prefix} failed"));
        }

        let marker = key_marker.map(|key| (key, version_id_marker.unwrap_or_default()));
        let rows: Vec<ListingRow> = self
            .listing_rows(prefix, delimiter)
            .into_iter()
            .filter(|row| match &marker {
                Some(marker) => row.sort_key() > *marker,
                None => true,
            })
            .collect();

        let page_size = max_keys.max(1) as usize;
        let is_truncated = rows.len() > page_size;

        let mut builder = ListObjectVersionsOutput::builder().is_truncated(is_truncated);
        let mut last = None;
        for row in rows.into_iter().take(page_size) {
            last = Some(row.sort_key());
            builder = match row {
                ListingRow::Entry(identity, true) => builder.delete_markers(
                    DeleteMarkerEntry::builder()
                        .key(identity.key)
                        .set_version_id(identity.version_id)
                        .build(),
                ),
                ListingRow::Entry(identity, false) => builder.versions(
                    ObjectVersion::builder()
                        .key(identity.key)
                        .set_version_id(identity.version_id)
                        .build(),
                ),
                ListingRow::Prefix(common_prefix) => {
                    builder.common_prefixes(CommonPrefix::builder().prefix(common_prefix).build())
                }
            };
        }

        if is_truncated {
            if let Some((key, version_id)) = last {
                builder = builder.next_key_marker(key).next_version_id_marker(version_id);
            }
        }

        Ok(builder.build())
    }

    async fn delete_objects(&self, objects: Vec<ObjectIdentifier>) -> Result<DeleteObjectsOutput> {
        let delay = *self.state.delete_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.state
            .delete_objects_calls
            .lock()
            .unwrap()
            .push(objects.clone());

        let failing_batch_key = self.state.failing_batch_key.lock().unwrap().clone();
        if let Some(failing_key) = failing_batch_key {
            if objects.iter().any(|o| o.key() == failing_key) {
                self.state
                    .failed_batches
                    .lock()
                    .unwrap()
                    .push(objects.clone());
                return Err(anyhow!("ServiceUnavailable: batch containing {failing_key} failed"));
            }
        }

        if self
            .state
            .transient_call_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(anyhow!("dispatch failure"));
        }

        let key_errors = self.state.key_errors.lock().unwrap().clone();
        let mut transient_key_errors = self.state.transient_key_errors.lock().unwrap();
        let mut stored = self.state.objects.lock().unwrap();

        let mut builder = DeleteObjectsOutput::builder();
        for ident in &objects {
            let key = ident.key();
            let version_id = ident.version_id();

            let mut error_code = key_errors.get(key).cloned();
            if error_code.is_none() {
                if let Some((code, remaining)) = transient_key_errors.get_mut(key) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        error_code = Some(code.clone());
                    }
                }
            }

            if let Some(error_code) = error_code {
                let err = aws_sdk_s3::types::Error::builder()
                    .key(key)
                    .set_version_id(version_id.map(String::from))
                    .code(error_code.as_str())
                    .message(format!("{error_code} error"))
                    .build();
                builder = builder.errors(err);
            } else {
                stored.remove(&(key.to_string(), version_id.unwrap_or_default().to_string()));
                let deleted = DeletedObject::builder()
                    .key(key)
                    .set_version_id(version_id.map(String::from))
                    .build();
                builder = builder.deleted(deleted);
            }
        }

        Ok(builder.build())
    }

    async fn delete_bucket(&self) -> Result<()> {
        self.state.delete_bucket_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.remaining_objects();
        if remaining > 0 {
            return Err(anyhow!(S3WipeError::BucketDeletion(format!(
                "BucketNotEmpty ({remaining} object versions remain)"
            ))));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_listing_paginates_with_markers() {
        let storage = MockStorage::new("test-bucket");
        storage.add_objects("a/", 5);

        let first = storage
            .list_object_versions("a/", None, None, None, 3)
            .await
            .unwrap();
        assert_eq!(first.versions().len(), 3);
        assert_eq!(first.is_truncated(), Some(true));

        let second = storage
            .list_object_versions(
                "a/",
                None,
                first.next_key_marker().map(String::from),
                first.next_version_id_marker().map(String::from),
                3,
            )
            .await
            .unwrap();
        assert_eq!(second.versions().len(), 2);
        assert_eq!(second.is_truncated(), Some(false));
    }

    #[tokio::test]
    async fn mock_listing_rolls_up_common_prefixes() {
        let storage = MockStorage::new("test-bucket");
        storage.add_objects("a/", 3);
        storage.add_objects("b/c/", 2);
        storage.add_object("root.txt", "v1");

        let output = storage
            .list_object_versions("", Some("/"), None, None, 1000)
            .await
            .unwrap();
        let prefixes: Vec<&str> = output
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix())
            .collect();
        assert_eq!(prefixes, vec!["a/", "b/"]);
        assert_eq!(output.versions().len(), 1);
    }
}
