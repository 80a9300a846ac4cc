//! Periodic progress logging.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::counters::{ProgressCounters, ProgressSnapshot};
use crate::types::token::PipelineCancellationToken;

/// Logs a counter snapshot on a fixed interval until stopped.
pub struct ProgressReporter {
    counters: Arc<ProgressCounters>,
    interval: Duration,
}

impl ProgressReporter {
    pub fn new(counters: Arc<ProgressCounters>, interval: Duration) -> Self {
        Self { counters, interval }
    }

    /// Report every interval until `stop` is cancelled.
    ///
    /// The first line is logged one full interval after start. Panics if the
    /// interval is zero.
    pub async fn run(self, stop: PipelineCancellationToken) {
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.interval,
            self.interval,
        );
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.report();
                },
                _ = stop.cancelled() => break,
            }
        }
    }

    pub fn report(&self) -> ProgressSnapshot {
        let snapshot = self.counters.snapshot();
        info!(
            found = snapshot.found,
            deleted = snapshot.deleted,
            failed = snapshot.failed,
            "Deleted {} out of {} keys found thus far.",
            snapshot.deleted,
            snapshot.found,
        );
        snapshot
    }
}
