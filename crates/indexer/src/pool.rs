use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use encoder::{AssetLibrary, ImageEncoder};
use store::{EmbeddingStore, ImageId};
use tokio_util::sync::CancellationToken;

use crate::latch::Ticket;
use crate::IndexerError;

/// A scheduled image. Dropping it counts the run's latch down.
pub(crate) struct WorkItem {
    pub(crate) id: ImageId,
    _ticket: Ticket,
}

impl WorkItem {
    pub(crate) fn new(id: ImageId, ticket: Ticket) -> Self {
        Self {
            id,
            _ticket: ticket,
        }
    }
}

enum Outcome {
    Encoded,
    Failed,
    Fatal(IndexerError),
}

/// State shared by the workers of one run.
pub(crate) struct RunState<L: ?Sized> {
    pub(crate) store: Arc<EmbeddingStore>,
    pub(crate) encoder: Arc<dyn ImageEncoder>,
    pub(crate) library: Arc<L>,
    queue: Mutex<VecDeque<WorkItem>>,
    pub(crate) encoded: AtomicUsize,
    pub(crate) failed: AtomicUsize,
    fatal: Mutex<Option<IndexerError>>,
}

impl<L: AssetLibrary + ?Sized> RunState<L> {
    pub(crate) fn new(
        store: Arc<EmbeddingStore>,
        encoder: Arc<dyn ImageEncoder>,
        library: Arc<L>,
        items: VecDeque<WorkItem>,
    ) -> Self {
        Self {
            store,
            encoder,
            library,
            queue: Mutex::new(items),
            encoded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            fatal: Mutex::new(None),
        }
    }

    fn next_item(&self) -> Option<WorkItem> {
        lock(&self.queue).pop_front()
    }

    /// Drop every item no worker picked up. Returns how many were left.
    pub(crate) fn drain_queue(&self) -> usize {
        let leftovers: Vec<WorkItem> = lock(&self.queue).drain(..).collect();
        leftovers.len()
    }

    pub(crate) fn take_fatal(&self) -> Option<IndexerError> {
        lock(&self.fatal).take()
    }

    async fn process(&self, id: &str) -> Outcome {
        let image = match self.library.fetch_image(id).await {
            Ok(image) => image,
            Err(err) => {
                tracing::warn!(
                    image_id = %id,
                    error = %err,
                    "skipping image that could not be fetched"
                );
                return Outcome::Failed;
            }
        };

        let embedding = match self.encoder.encode(&image).await {
            Ok(embedding) => embedding,
            Err(err) => {
                tracing::warn!(
                    image_id = %id,
                    error = %err,
                    "skipping image that failed to encode"
                );
                return Outcome::Failed;
            }
        };

        match self
            .store
            .put_versioned(id, embedding, self.encoder.model_version())
        {
            Ok(()) => {
                tracing::debug!(image_id = %id, "indexed image");
                Outcome::Encoded
            }
            Err(err) => Outcome::Fatal(err.into()),
        }
    }

    fn record(&self, outcome: Outcome, run: &CancellationToken) {
        match outcome {
            Outcome::Encoded => {
                self.encoded.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Fatal(err) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error = %err, "aborting indexing run");
                lock(&self.fatal).get_or_insert(err);
                run.cancel();
            }
        }
    }
}

/// Pull items until the queue is empty or the run is cancelled.
///
/// An item in flight when cancellation arrives is dropped without writing
/// to the store.
pub(crate) async fn worker_loop<L: AssetLibrary + ?Sized>(
    state: Arc<RunState<L>>,
    run: CancellationToken,
) {
    while !run.is_cancelled() {
        let Some(item) = state.next_item() else {
            break;
        };

        tokio::select! {
            biased;
            _ = run.cancelled() => {
                tracing::debug!(image_id = %item.id, "dropping in-flight image");
                break;
            }
            outcome = state.process(&item.id) => state.record(outcome, &run),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
