//! Bounded work queue between the listing and deletion workers.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Result, anyhow};
use async_channel::{Receiver, Sender};
use tokio::sync::Notify;

use crate::types::ObjectIdentity;

/// Outcome of [`WorkQueue::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    Success,
    Closed,
}

/// A bounded MPMC queue of [`ObjectIdentity`] with drain tracking.
///
/// An entry counts as pending from the moment it is enqueued until a
/// consumer calls [`mark_done`](Self::mark_done) for it. Dequeuing alone does
/// not finish an entry, so [`join_drain`](Self::join_drain) only returns once
/// every enqueued identity has actually been handled.
pub struct WorkQueue {
    sender: Sender<ObjectIdentity>,
    receiver: Receiver<ObjectIdentity>,
    pending: AtomicU64,
    drained: Notify,
    capacity: usize,
}

impl WorkQueue {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = async_channel::bounded(capacity);
        Self {
            sender,
            receiver,
            pending: AtomicU64::new(0),
            drained: Notify::new(),
            capacity,
        }
    }

    /// Add an item, waiting while the queue is full.
    pub async fn enqueue(&self, item: ObjectIdentity) -> Result<SendResult> {
        // Count the item before a consumer can see it, otherwise a fast
        // consumer could mark it done while pending is still zero.
        self.pending.fetch_add(1, Ordering::SeqCst);

        if self.sender.send(item).await.is_err() {
            self.mark_done(1)?;
            return Ok(SendResult::Closed);
        }

        Ok(SendResult::Success)
    }

    /// Wait for the next item. Returns `None` once the queue is closed and empty.
    pub async fn dequeue(&self) -> Option<ObjectIdentity> {
        self.receiver.recv().await.ok()
    }

    /// Take an item only if one is available right now.
    pub fn try_dequeue(&self) -> Option<ObjectIdentity> {
        self.receiver.try_recv().ok()
    }

    /// Mark `n` previously enqueued items as handled.
    pub fn mark_done(&self, n: u64) -> Result<()> {
        if n == 0 {
            return Ok(());
        }

        let previous = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |pending| {
                pending.checked_sub(n)
            })
            .map_err(|pending| {
                anyhow!("mark_done({n}) called with only {pending} pending items.")
            })?;

        if previous == n {
            self.drained.notify_waiters();
        }

        Ok(())
    }

    /// Wait until every enqueued item has been marked done.
    pub async fn join_drain(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // Register before checking so a notify between the check and the
            // await is not lost.
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }

            notified.await;
        }
    }

    /// Close the queue. Pending items can still be dequeued; new ones are rejected.
    pub fn close(&self) {
        self.sender.close();
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::SeqCst)
    }
}
