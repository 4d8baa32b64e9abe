use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Countdown shared by every scheduled image of one run.
///
/// Each scheduled image holds one [`Ticket`]; dropping it counts the latch
/// down, whether the image was encoded, failed, or never started. The
/// arrival that reaches zero wakes [`wait`](Self::wait) exactly once.
#[derive(Debug)]
pub(crate) struct CompletionLatch {
    remaining: AtomicUsize,
    done: Notify,
}

impl CompletionLatch {
    pub(crate) fn new(count: usize) -> Arc<Self> {
        Arc::new(Self {
            remaining: AtomicUsize::new(count),
            done: Notify::new(),
        })
    }

    /// Count down once. Returns `true` only for the arrival that reached zero.
    pub(crate) fn count_down(&self) -> bool {
        let reached_zero = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok_and(|prev| prev == 1);
        if reached_zero {
            self.done.notify_one();
        }
        reached_zero
    }

    pub(crate) fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Resolve once the count has reached zero.
    pub(crate) async fn wait(&self) {
        if self.remaining() == 0 {
            return;
        }
        // notify_one stores a permit, so a zero arrival that races ahead of
        // this await is not lost.
        self.done.notified().await;
    }

    pub(crate) fn ticket(self: &Arc<Self>) -> Ticket {
        Ticket {
            latch: Arc::clone(self),
        }
    }
}

/// One outstanding arrival on a [`CompletionLatch`].
#[derive(Debug)]
pub(crate) struct Ticket {
    latch: Arc<CompletionLatch>,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if self.latch.count_down() {
            tracing::trace!("completion latch reached zero");
        }
    }
}
