use anyhow::Result;
use tracing::{debug, trace};

use crate::queue::SendResult;
use crate::stage::Stage;
use crate::storage::Storage;
use crate::types::error::S3WipeError;
use crate::types::{ListingShard, ObjectIdentity, PREFIX_DELIMITER};

/// Discover the listing shards of a bucket.
///
/// Lists the bucket root with the `/` delimiter. Every common prefix becomes
/// a shard; if any version or delete marker sits directly at the root, the
/// root shard is appended so those keys are listed too. An empty result
/// means the bucket holds nothing.
pub async fn discover_shards(target: &Storage, max_keys: i32) -> Result<Vec<ListingShard>> {
    let mut shards = Vec::new();
    let mut has_root_entries = false;
    let mut key_marker: Option<String> = None;
    let mut version_id_marker: Option<String> = None;

    loop {
        let output = target
            .list_object_versions(
                "",
                Some(PREFIX_DELIMITER),
                key_marker.clone(),
                version_id_marker.clone(),
                max_keys,
            )
            .await
            .map_err(|e| e.context(S3WipeError::ListingFailed("<root>".to_string())))?;

        shards.extend(
            output
                .common_prefixes()
                .iter()
                .filter_map(|p| p.prefix())
                .map(ListingShard::prefix),
        );
        if !output.versions().is_empty() || !output.delete_markers().is_empty() {
            has_root_entries = true;
        }

        if output.is_truncated() == Some(true) {
            key_marker = output.next_key_marker().map(String::from);
            version_id_marker = output.next_version_id_marker().map(String::from);
        } else {
            break;
        }
    }

    if has_root_entries {
        shards.push(ListingShard::root());
    }

    debug!(shards = shards.len(), "listing shards discovered.");
    Ok(shards)
}

/// Lists every version and delete marker of one shard onto the work queue.
///
/// One `ObjectLister` runs per shard. Listing errors are not retried here
/// (the SDK retry policy applies to each page request); they end the worker
/// with [`S3WipeError::ListingFailed`].
pub struct ObjectLister {
    worker_index: usize,
    shard: ListingShard,
    stage: Stage,
}

impl ObjectLister {
    pub fn new(stage: Stage, shard: ListingShard, worker_index: usize) -> Self {
        Self {
            worker_index,
            shard,
            stage,
        }
    }

    pub async fn list_target(&self) -> Result<()> {
        debug!(
            worker_index = self.worker_index,
            shard = %self.shard,
            "list target objects has started."
        );

        let mut key_marker: Option<String> = None;
        let mut version_id_marker: Option<String> = None;
        let mut listed: u64 = 0;

        loop {
            let page = self.stage.target.list_object_versions(
                &self.shard.prefix,
                self.shard.delimiter.as_deref(),
                key_marker.clone(),
                version_id_marker.clone(),
                self.stage.config.max_keys,
            );
            let output = tokio::select! {
                biased;
                _ = self.stage.cancellation_token.cancelled() => {
                    debug!(worker_index = self.worker_index, "listing cancelled.");
                    return Ok(());
                }
                result = page => result
                    .map_err(|e| e.context(S3WipeError::ListingFailed(self.shard.to_string())))?,
            };

            let identities = output
                .versions()
                .iter()
                .filter_map(ObjectIdentity::from_object_version)
                .chain(
                    output
                        .delete_markers()
                        .iter()
                        .filter_map(ObjectIdentity::from_delete_marker),
                );

            for identity in identities {
                trace!(
                    key = identity.key,
                    version_id = identity.version_id,
                    "enqueue object version."
                );

                // Counted before it becomes visible so deleted never exceeds found.
                self.stage.counters.increment_found(1);
                if self.stage.send(identity).await? == SendResult::Closed {
                    debug!(worker_index = self.worker_index, "work queue closed.");
                    return Ok(());
                }
                listed += 1;
            }

            if output.is_truncated() == Some(true) {
                key_marker = output.next_key_marker().map(String::from);
                version_id_marker = output.next_version_id_marker().map(String::from);
            } else {
                break;
            }
        }

        debug!(
            worker_index = self.worker_index,
            shard = %self.shard,
            listed = listed,
            "list target objects has been completed."
        );
        Ok(())
    }
}
