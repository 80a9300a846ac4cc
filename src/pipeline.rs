//! Wipe pipeline orchestrator.
//!
//! Connects the listing workers and the deletion workers through a bounded
//! [`WorkQueue`], waits for everything that was listed to be handled, and
//! then deletes the bucket.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::counters::{ProgressCounters, ProgressSnapshot};
use crate::deleter::ObjectDeleter;
use crate::lister::{ObjectLister, discover_shards};
use crate::queue::WorkQueue;
use crate::reporter::ProgressReporter;
use crate::stage::Stage;
use crate::storage::{self, Storage};
use crate::types::ListingShard;
use crate::types::error::S3WipeError;
use crate::types::token::PipelineCancellationToken;

/// The bucket wipe orchestrator.
///
/// ```text
/// discover shards → ObjectLister (1 per shard) → WorkQueue → ObjectDeleter (2 per shard) → DeleteBucket
/// ```
///
/// ## Usage
///
/// ```no_run
/// # async fn example() {
/// use s3wipe_rs::{Config, WipePipeline, create_pipeline_cancellation_token};
///
/// let config = Config::for_bucket("my-bucket");
/// let cancellation_token = create_pipeline_cancellation_token();
/// let mut pipeline = WipePipeline::new(config, cancellation_token).await;
/// pipeline.run().await;
/// if pipeline.has_error() {
///     eprintln!("{:?}", pipeline.get_errors_and_consume().unwrap()[0]);
/// }
/// # }
/// ```
pub struct WipePipeline {
    config: Config,
    target: Storage,
    cancellation_token: PipelineCancellationToken,
    has_error: Arc<AtomicBool>,
    has_panic: Arc<AtomicBool>,
    has_warning: Arc<AtomicBool>,
    errors: Arc<Mutex<VecDeque<anyhow::Error>>>,
    counters: Arc<ProgressCounters>,
    ready: bool,
    bucket_deleted: bool,
    listing_worker_count: usize,
    deletion_worker_count: usize,
}

impl WipePipeline {
    /// Create a new WipePipeline backed by S3.
    pub async fn new(config: Config, cancellation_token: PipelineCancellationToken) -> Self {
        let target = storage::create_storage(&config).await;
        Self::with_storage(config, target, cancellation_token)
    }

    /// Create a new WipePipeline on top of an existing storage.
    pub fn with_storage(
        config: Config,
        target: Storage,
        cancellation_token: PipelineCancellationToken,
    ) -> Self {
        Self {
            config,
            target,
            cancellation_token,
            has_error: Arc::new(AtomicBool::new(false)),
            has_panic: Arc::new(AtomicBool::new(false)),
            has_warning: Arc::new(AtomicBool::new(false)),
            errors: Arc::new(Mutex::new(VecDeque::new())),
            counters: Arc::new(ProgressCounters::new()),
            ready: true,
            bucket_deleted: false,
            listing_worker_count: 0,
            deletion_worker_count: 0,
        }
    }

    /// Run the pipeline.
    ///
    /// 1. Validate the config
    /// 2. Check the bucket and make sure versioning is enabled
    /// 3. Discover listing shards
    /// 4. Run listing and deletion workers until the queue is drained
    /// 5. Delete the bucket, unless an error occurred or the run was cancelled
    ///
    /// A cancelled run without any other error records [`S3WipeError::Cancelled`].
    pub async fn run(&mut self) {
        assert!(self.ready, "WipePipeline::run() called more than once");
        self.ready = false;

        if let Err(e) = self.config.validate() {
            error!("{e}");
            self.record_error(anyhow!(e));
            return;
        }

        let prerequisites = tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => None,
            result = self.check_prerequisites() => Some(result),
        };
        match prerequisites {
            None => {
                self.record_cancelled();
                return;
            }
            Some(Err(e)) => {
                self.record_error(e);
                return;
            }
            Some(Ok(())) => {}
        }

        let discovery = tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => None,
            result = discover_shards(&self.target, self.config.max_keys) => Some(result),
        };
        let shards = match discovery {
            None => {
                self.record_cancelled();
                return;
            }
            Some(Err(e)) => {
                error!("shard discovery failed: {e:#}");
                self.record_error(e);
                return;
            }
            Some(Ok(shards)) => shards,
        };

        if shards.is_empty() {
            info!(bucket = self.config.bucket, "bucket is empty.");
        } else {
            self.execute_pipeline(shards).await;
        }

        if self.has_error() {
            info!("bucket deletion skipped.");
            return;
        }
        if self.cancellation_token.is_cancelled() {
            self.record_cancelled();
            return;
        }

        self.delete_bucket().await;
    }

    /// Check if any error occurred during the pipeline execution.
    pub fn has_error(&self) -> bool {
        self.has_error.load(Ordering::SeqCst)
    }

    /// Check if any spawned task panicked during the pipeline execution.
    pub fn has_panic(&self) -> bool {
        self.has_panic.load(Ordering::SeqCst)
    }

    /// Check if any object version could not be deleted.
    pub fn has_warning(&self) -> bool {
        self.has_warning.load(Ordering::SeqCst)
    }

    /// Consume and return all accumulated errors.
    ///
    /// Returns `None` if no errors occurred.
    pub fn get_errors_and_consume(&self) -> Option<Vec<anyhow::Error>> {
        if !self.has_error() {
            return None;
        }
        let mut error_list = self.errors.lock().unwrap();
        let mut errors = Vec::with_capacity(error_list.len());
        while let Some(e) = error_list.pop_front() {
            errors.push(e);
        }
        Some(errors)
    }

    /// Get error messages without consuming them.
    ///
    /// Returns `None` if no errors occurred.
    pub fn get_error_messages(&self) -> Option<Vec<String>> {
        if !self.has_error() {
            return None;
        }
        let error_list = self.errors.lock().unwrap();
        Some(error_list.iter().map(|e| e.to_string()).collect())
    }

    /// Current progress counters.
    pub fn progress(&self) -> ProgressSnapshot {
        self.counters.snapshot()
    }

    /// Whether the final DeleteBucket call succeeded.
    pub fn is_bucket_deleted(&self) -> bool {
        self.bucket_deleted
    }

    pub fn listing_worker_count(&self) -> usize {
        self.listing_worker_count
    }

    pub fn deletion_worker_count(&self) -> usize {
        self.deletion_worker_count
    }

    // -----------------------------------------------------------------------
    // Internal methods
    // -----------------------------------------------------------------------

    async fn check_prerequisites(&self) -> Result<()> {
        self.target.head_bucket().await?;

        if self.target.is_versioning_enabled().await? {
            debug!(bucket = self.config.bucket, "versioning is already enabled.");
        } else {
            info!(bucket = self.config.bucket, "enabling bucket versioning.");
            self.target.enable_versioning().await?;
        }

        Ok(())
    }

    async fn execute_pipeline(&mut self, shards: Vec<ListingShard>) {
        let queue = Arc::new(WorkQueue::new(self.config.max_queue_size as usize));

        self.listing_worker_count = shards.len();
        self.deletion_worker_count = Config::deletion_worker_count(shards.len());
        info!(
            listing_workers = self.listing_worker_count,
            deletion_workers = self.deletion_worker_count,
            "starting workers."
        );

        // Deleters first so the queue starts draining as soon as listing begins.
        let deleter_handles = self.delete_objects(&queue);
        let mut lister_handles = self.list_target(&queue, shards);
        let mut joined_listers = 0;

        let reporter_stop = self.cancellation_token.child_token();
        let reporter = ProgressReporter::new(
            self.counters.clone(),
            Duration::from_secs(self.config.progress_interval_seconds),
        );
        let reporter_handle = tokio::spawn(reporter.run(reporter_stop.clone()));

        tokio::select! {
            _ = async {
                while let Some(handle) = lister_handles.get_mut(joined_listers) {
                    let _ = handle.await;
                    joined_listers += 1;
                }
                debug!("all listing workers have been completed.");
                queue.join_drain().await;
                debug!("work queue has been drained.");
            } => {},
            _ = self.cancellation_token.cancelled() => {
                debug!("stopping workers on cancellation.");
            }
        }

        // Idle deleters exit once the queue is closed; busy workers watch the token.
        queue.close();
        for handle in lister_handles.drain(joined_listers..) {
            let _ = handle.await;
        }
        for handle in deleter_handles {
            let _ = handle.await;
        }

        reporter_stop.cancel();
        let _ = reporter_handle.await;

        let snapshot = self.counters.snapshot();
        info!(
            found = snapshot.found,
            deleted = snapshot.deleted,
            failed = snapshot.failed,
            "Deleted {} out of {} keys found.",
            snapshot.deleted,
            snapshot.found,
        );
    }

    async fn delete_bucket(&mut self) {
        info!(bucket = self.config.bucket, "deleting bucket.");
        match self.target.delete_bucket().await {
            Ok(()) => {
                self.bucket_deleted = true;
                info!(bucket = self.config.bucket, "bucket has been deleted.");
            }
            Err(e) => {
                error!(bucket = self.config.bucket, "bucket deletion failed: {e:#}");
                self.record_error(e);
            }
        }
    }

    /// Record an error and set the error flag.
    fn record_error(&self, error: anyhow::Error) {
        self.has_error.store(true, Ordering::SeqCst);
        self.errors.lock().unwrap().push_back(error);
    }

    /// Record a user cancellation, unless a worker failure caused it.
    fn record_cancelled(&self) {
        if self.has_error() {
            return;
        }
        info!(bucket = self.config.bucket, "pipeline has been cancelled. bucket deletion skipped.");
        self.record_error(anyhow!(S3WipeError::Cancelled));
    }

    fn create_stage(&self, queue: &Arc<WorkQueue>) -> Stage {
        Stage::new(
            self.config.clone(),
            dyn_clone::clone_box(&*self.target),
            queue.clone(),
            self.counters.clone(),
            self.cancellation_token.clone(),
            self.has_warning.clone(),
        )
    }

    /// Spawn one ObjectLister per shard.
    ///
    /// Uses the double-spawn pattern to catch panics. A failed lister cancels
    /// the pipeline so the drain wait cannot hang on items that will never
    /// arrive.
    fn list_target(&self, queue: &Arc<WorkQueue>, shards: Vec<ListingShard>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(shards.len());

        for (worker_index, shard) in shards.into_iter().enumerate() {
            let lister = ObjectLister::new(self.create_stage(queue), shard, worker_index);

            let has_error = self.has_error.clone();
            let has_panic = self.has_panic.clone();
            let error_list = self.errors.clone();
            let cancellation_token = self.cancellation_token.clone();

            handles.push(tokio::spawn(async move {
                let join_result = tokio::spawn(async move { lister.list_target().await }).await;

                match join_result {
                    Ok(Ok(())) => {
                        debug!(worker_index, "object lister completed successfully.");
                    }
                    Ok(Err(e)) => {
                        has_error.store(true, Ordering::SeqCst);
                        error!(worker_index, "object lister failed: {e:#}");
                        error_list.lock().unwrap().push_back(e);
                        cancellation_token.cancel();
                    }
                    Err(e) => {
                        has_error.store(true, Ordering::SeqCst);
                        has_panic.store(true, Ordering::SeqCst);
                        error!(worker_index, "object lister task panicked: {}", e);
                        error_list.lock().unwrap().push_back(anyhow!(S3WipeError::Pipeline(
                            format!("object lister task panicked: {e}")
                        )));
                        cancellation_token.cancel();
                    }
                }
            }));
        }

        handles
    }

    /// Spawn the ObjectDeleter workers.
    fn delete_objects(&self, queue: &Arc<WorkQueue>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.deletion_worker_count);

        for worker_index in 0..self.deletion_worker_count {
            let mut object_deleter = ObjectDeleter::new(self.create_stage(queue), worker_index);

            let has_error = self.has_error.clone();
            let has_panic = self.has_panic.clone();
            let error_list = self.errors.clone();
            let cancellation_token = self.cancellation_token.clone();

            handles.push(tokio::spawn(async move {
                let join_result = tokio::spawn(async move { object_deleter.delete().await }).await;

                match join_result {
                    Ok(Ok(())) => {
                        debug!(worker_index, "delete worker completed successfully.");
                    }
                    Ok(Err(e)) => {
                        has_error.store(true, Ordering::SeqCst);
                        error!(worker_index, "delete worker failed: {e:#}");
                        error_list.lock().unwrap().push_back(e);
                        cancellation_token.cancel();
                    }
                    Err(e) => {
                        has_error.store(true, Ordering::SeqCst);
                        has_panic.store(true, Ordering::SeqCst);
                        error!(worker_index, "delete worker task panicked: {}", e);
                        error_list.lock().unwrap().push_back(anyhow!(S3WipeError::Pipeline(
                            format!("delete worker panicked: {e}")
                        )));
                        cancellation_token.cancel();
                    }
                }
            }));
        }

        handles
    }
}
