use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use crate::config::Config;
use crate::counters::ProgressCounters;
use crate::queue::{SendResult, WorkQueue};
use crate::storage::Storage;
use crate::types::ObjectIdentity;
use crate::types::token::PipelineCancellationToken;

/// Shared context handed to each listing and deletion worker.
///
/// Every worker gets its own `Stage` with its own storage handle; the queue,
/// the counters and the warning flag are shared through `Arc`s.
pub struct Stage {
    pub config: Config,
    pub target: Storage,
    pub queue: Arc<WorkQueue>,
    pub counters: Arc<ProgressCounters>,
    pub cancellation_token: PipelineCancellationToken,
    pub has_warning: Arc<AtomicBool>,
}

impl Stage {
    pub fn new(
        config: Config,
        target: Storage,
        queue: Arc<WorkQueue>,
        counters: Arc<ProgressCounters>,
        cancellation_token: PipelineCancellationToken,
        has_warning: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            target,
            queue,
            counters,
            cancellation_token,
            has_warning,
        }
    }

    /// Put an identity on the work queue.
    ///
    /// Returns `SendResult::Closed` if the queue has been closed (e.g. due to
    /// cancellation), allowing the caller to exit gracefully.
    pub async fn send(&self, identity: ObjectIdentity) -> Result<SendResult> {
        self.queue.enqueue(identity).await
    }

    /// Set the warning flag to indicate a non-fatal issue occurred.
    pub fn set_warning(&self) {
        self.has_warning.store(true, Ordering::SeqCst);
    }
}
