//! Batch indexing of library images into an [`EmbeddingStore`].
//!
//! [`Indexer::index_all`] fetches and encodes every id the store does not
//! hold yet, using at most `concurrency` workers. Each scheduled id counts a
//! completion latch down exactly once, whatever its outcome, and the arrival
//! that reaches zero triggers the run's single [`EmbeddingStore::save`].
//! Runs are cancellable through a [`CancellationToken`].

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use encoder::{AssetLibrary, ImageEncoder};
use store::{BackendError, EmbeddingStore, ImageId, SaveError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

mod config;
mod error;
mod latch;
mod pool;
mod report;

pub use crate::config::IndexerConfig;
pub use crate::error::IndexerError;
pub use crate::report::IndexReport;

use crate::latch::CompletionLatch;
use crate::pool::{worker_loop, RunState, WorkItem};

pub struct Indexer<L: ?Sized> {
    store: Arc<EmbeddingStore>,
    encoder: Arc<dyn ImageEncoder>,
    library: Arc<L>,
    cfg: IndexerConfig,
}

impl<L: AssetLibrary + ?Sized + 'static> Indexer<L> {
    pub fn new(
        store: Arc<EmbeddingStore>,
        encoder: Arc<dyn ImageEncoder>,
        library: Arc<L>,
        cfg: IndexerConfig,
    ) -> Result<Self, IndexerError> {
        cfg.validate()?;
        if encoder.dimension() != store.dimension() {
            return Err(IndexerError::DimensionMismatch {
                expected: store.dimension(),
                actual: encoder.dimension(),
            });
        }
        if encoder.model_version() != store.model_version() {
            tracing::warn!(
                encoder_version = encoder.model_version(),
                store_version = store.model_version(),
                "encoder and store disagree on model version; new embeddings will read as stale"
            );
        }
        Ok(Self {
            store,
            encoder,
            library,
            cfg,
        })
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.cfg
    }

    /// List the library and index everything in it.
    pub async fn index_library(
        &self,
        cancel: &CancellationToken,
    ) -> Result<IndexReport, IndexerError> {
        let ids = self.library.list_images().await?;
        tracing::info!(images = ids.len(), "listed library images");
        self.index_all(ids, cancel).await
    }

    /// Encode and store every id in `ids` that is not indexed yet.
    ///
    /// Duplicate ids are encoded once. Fetch and encode failures are logged
    /// and counted; they never abort the run. A dimension mismatch from the
    /// store cancels the remaining work and is returned after the save.
    pub async fn index_all<I>(
        &self,
        ids: I,
        cancel: &CancellationToken,
    ) -> Result<IndexReport, IndexerError>
    where
        I: IntoIterator<Item = ImageId>,
    {
        let mut report = IndexReport::default();
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for id in ids {
            report.requested += 1;
            if !seen.insert(id.clone()) {
                continue;
            }
            if self.already_indexed(&id) {
                report.skipped_existing += 1;
            } else {
                pending.push(id);
            }
        }

        report.scheduled = pending.len();
        if pending.is_empty() {
            tracing::info!(
                requested = report.requested,
                skipped = report.skipped_existing,
                "nothing to index"
            );
            return Ok(report);
        }

        let latch = CompletionLatch::new(pending.len());
        let items: VecDeque<WorkItem> = pending
            .into_iter()
            .map(|id| WorkItem::new(id, latch.ticket()))
            .collect();
        let state = Arc::new(RunState::new(
            Arc::clone(&self.store),
            Arc::clone(&self.encoder),
            Arc::clone(&self.library),
            items,
        ));

        let workers = self.cfg.concurrency.min(report.scheduled);
        tracing::info!(
            scheduled = report.scheduled,
            skipped = report.skipped_existing,
            workers,
            "indexing started"
        );

        let run = cancel.child_token();
        let mut pool = JoinSet::new();
        for _ in 0..workers {
            pool.spawn(worker_loop(Arc::clone(&state), run.clone()));
        }
        while let Some(joined) = pool.join_next().await {
            let Err(err) = joined else {
                continue;
            };
            if err.is_panic() {
                // The in-flight item unwound with the worker; its ticket has
                // already counted down.
                state.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error = %err, "indexing worker panicked; replacing it");
                if !run.is_cancelled() {
                    pool.spawn(worker_loop(Arc::clone(&state), run.clone()));
                }
            } else {
                tracing::error!(error = %err, "indexing worker exited abnormally");
            }
        }

        let leftover = state.drain_queue();
        if leftover > 0 {
            tracing::info!(leftover, "indexing cancelled before all images started");
        }

        latch.wait().await;
        report.saved = Some(self.save().await);

        report.encoded = state.encoded.load(Ordering::Relaxed);
        report.failed = state.failed.load(Ordering::Relaxed);
        report.cancelled = report.scheduled - report.encoded - report.failed;
        tracing::info!(
            encoded = report.encoded,
            failed = report.failed,
            cancelled = report.cancelled,
            "indexing finished"
        );

        match state.take_fatal() {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    fn already_indexed(&self, id: &str) -> bool {
        if self.cfg.reindex_stale {
            self.store.is_current(id)
        } else {
            self.store.contains(id)
        }
    }

    async fn save(&self) -> Result<usize, SaveError> {
        let store = Arc::clone(&self.store);
        let result = match tokio::task::spawn_blocking(move || store.save()).await {
            Ok(result) => result,
            Err(err) => Err(SaveError::Backend(BackendError::new(format!(
                "save task failed: {err}"
            )))),
        };
        match &result {
            Ok(count) => tracing::info!(entries = count, "saved embeddings"),
            Err(err) => tracing::error!(error = %err, "failed to save embeddings"),
        }
        result
    }
}
