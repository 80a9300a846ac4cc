//! Deletion workers.
//!
//! An [`ObjectDeleter`] drains the work queue into a local batch and hands
//! full batches to a [`Deleter`] backend. [`BatchDeleter`] is the
//! DeleteObjects implementation.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::stage::Stage;
use crate::types::ObjectIdentity;

pub mod batch;

pub use batch::BatchDeleter;

/// Result of a deletion operation, reporting which keys succeeded and which failed.
#[derive(Debug, Clone, Default)]
pub struct DeleteResult {
    /// Versions the store confirmed as deleted.
    pub deleted: Vec<ObjectIdentity>,
    /// Versions given up on, with the last error seen for each.
    pub failed: Vec<FailedKey>,
}

/// A version that could not be deleted.
#[derive(Debug, Clone)]
pub struct FailedKey {
    pub identity: ObjectIdentity,
    pub error_code: String,
    pub error_message: String,
}

/// Trait for deletion backends.
#[async_trait]
pub trait Deleter: Send + Sync {
    /// Delete the given object versions.
    ///
    /// Returns detailed results indicating which versions were deleted and which failed.
    async fn delete(&self, objects: &[ObjectIdentity], config: &Config) -> Result<DeleteResult>;
}

/// Deletion worker.
///
/// Each worker keeps its own batch. It only blocks on the queue while the
/// batch is empty; with items in hand it polls, and flushes as soon as the
/// queue runs dry, so a partial batch is never held while the listers are
/// still producing.
pub struct ObjectDeleter {
    worker_index: usize,
    base: Stage,
    deleter: Box<dyn Deleter>,
    buffer: Vec<ObjectIdentity>,
    effective_batch_size: usize,
}

impl ObjectDeleter {
    pub fn new(base: Stage, worker_index: usize) -> Self {
        let deleter: Box<dyn Deleter> = Box::new(BatchDeleter::new(
            base.target.clone(),
            base.cancellation_token.clone(),
        ));
        Self::with_deleter(base, worker_index, deleter)
    }

    pub fn with_deleter(base: Stage, worker_index: usize, deleter: Box<dyn Deleter>) -> Self {
        let effective_batch_size = (base.config.batch_size as usize).clamp(1, batch::MAX_BATCH_SIZE);

        Self {
            worker_index,
            base,
            deleter,
            // Allocated on first use; wide buckets run tens of thousands of idle workers.
            buffer: Vec::new(),
            effective_batch_size,
        }
    }

    /// Main entry point: drain the queue until it is closed or the pipeline is cancelled.
    pub async fn delete(&mut self) -> Result<()> {
        debug!(worker_index = self.worker_index, "delete worker started.");

        loop {
            let next = if self.buffer.is_empty() {
                tokio::select! {
                    item = self.base.queue.dequeue() => item,
                    _ = self.base.cancellation_token.cancelled() => {
                        info!(worker_index = self.worker_index, "delete worker has been cancelled.");
                        return Ok(());
                    }
                }
            } else {
                self.base.queue.try_dequeue()
            };

            match next {
                Some(identity) => {
                    self.buffer.push(identity);
                    if self.buffer.len() >= self.effective_batch_size || self.base.queue.is_empty()
                    {
                        self.delete_buffered_objects().await?;
                    }
                }
                None if self.buffer.is_empty() => {
                    // Queue closed and drained.
                    break;
                }
                None => self.delete_buffered_objects().await?,
            }

            if self.base.cancellation_token.is_cancelled() {
                info!(worker_index = self.worker_index, "delete worker has been cancelled.");
                return Ok(());
            }
        }

        debug!(worker_index = self.worker_index, "delete worker has been completed.");
        Ok(())
    }

    async fn delete_buffered_objects(&mut self) -> Result<()> {
        if self.buffer.is_empty() || self.base.cancellation_token.is_cancelled() {
            return Ok(());
        }

        let batch = std::mem::take(&mut self.buffer);
        let batch_count = batch.len() as u64;

        let outcome = tokio::select! {
            biased;
            _ = self.base.cancellation_token.cancelled() => {
                debug!(
                    worker_index = self.worker_index,
                    batch_size = batch_count,
                    "in-flight batch abandoned on cancellation."
                );
                return Ok(());
            }
            outcome = self.deleter.delete(&batch, &self.base.config) => outcome,
        };

        let (deleted, failed) = match outcome {
            Ok(result) => {
                let deleted = (result.deleted.len() as u64).min(batch_count);
                // Keys missing from the response are treated as failed too.
                (deleted, batch_count - deleted)
            }
            Err(e) => {
                error!(
                    worker_index = self.worker_index,
                    batch_size = batch_count,
                    error = format!("{e:#}"),
                    "batch deletion failed."
                );
                (0, batch_count)
            }
        };

        self.base.counters.increment_deleted(deleted);
        if failed > 0 {
            self.base.counters.increment_failed(failed);
            self.base.set_warning();
            error!(
                worker_index = self.worker_index,
                deleted = deleted,
                failed = failed,
                "{} of {} object versions in the batch could not be deleted.",
                failed,
                batch_count,
            );
        }

        // Every item of the batch is finished, deleted or not, so the drain completes.
        self.base.queue.mark_done(batch_count)?;

        debug!(
            worker_index = self.worker_index,
            deleted = deleted,
            failed = failed,
            "batch flushed."
        );
        Ok(())
    }
}
