use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use encoder::{
    AssetLibrary, DecodedImage, EncodeError, FetchError, ImageEncoder, ResolveError,
};
use indexer::{IndexReport, Indexer, IndexerConfig, IndexerError};
use store::{
    BackendError, Embedding, EmbeddingStore, ImageId, InMemoryBackend, StoreBackend, StoreConfig,
};
use tokio_util::sync::CancellationToken;

const DIM: usize = 4;
const VERSION: &str = "fake-1";

/// Backend that counts how many times the store was saved.
#[derive(Default)]
struct SaveCounter {
    inner: InMemoryBackend,
    saves: AtomicUsize,
}

struct CountingBackend(Arc<SaveCounter>);

impl StoreBackend for CountingBackend {
    fn replace_all(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), BackendError> {
        self.0.saves.fetch_add(1, Ordering::SeqCst);
        self.0.inner.replace_all(entries)
    }

    fn scan(&self, visitor: &mut dyn FnMut(&str, &[u8])) -> Result<(), BackendError> {
        self.0.inner.scan(visitor)
    }

    fn exists(&self) -> Result<bool, BackendError> {
        self.0.inner.exists()
    }
}

/// Library of 1-pixel-high images whose width identifies them.
struct WidthLibrary {
    widths: HashMap<ImageId, u32>,
}

impl WidthLibrary {
    fn with_images(count: u32) -> Self {
        Self {
            widths: (0..count).map(|i| (id(i), i + 1)).collect(),
        }
    }
}

#[async_trait]
impl AssetLibrary for WidthLibrary {
    type Display = ImageId;

    async fn list_images(&self) -> Result<Vec<ImageId>, FetchError> {
        let mut ids: Vec<ImageId> = self.widths.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn fetch_image(&self, id: &str) -> Result<DecodedImage, FetchError> {
        let width = self
            .widths
            .get(id)
            .ok_or_else(|| FetchError::NotFound(id.to_string()))?;
        Ok(DecodedImage::new_luma8(*width, 1))
    }

    async fn resolve_display_image(&self, id: &str) -> Result<ImageId, ResolveError> {
        Ok(id.to_string())
    }
}

/// Encoder that sleeps a width-dependent time, so completions arrive out of
/// order, and records how many calls overlap.
struct FakeEncoder {
    output_dim: usize,
    failing_widths: HashSet<u32>,
    panicking_widths: HashSet<u32>,
    hang_after: Option<usize>,
    jitter_seed: u32,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeEncoder {
    fn new() -> Self {
        Self {
            output_dim: DIM,
            failing_widths: HashSet::new(),
            panicking_widths: HashSet::new(),
            hang_after: None,
            jitter_seed: 7,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageEncoder for FakeEncoder {
    async fn encode(&self, image: &DecodedImage) -> Result<Embedding, EncodeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        if self.hang_after.is_some_and(|n| call > n) {
            std::future::pending::<()>().await;
        }
        let jitter = u64::from(image.width() * self.jitter_seed % 5);
        tokio::time::sleep(Duration::from_millis(jitter)).await;

        if self.panicking_widths.contains(&image.width()) {
            panic!("encoder crashed on width {}", image.width());
        }
        if self.failing_widths.contains(&image.width()) {
            return Err(EncodeError::Inference("model rejected image".into()));
        }
        Ok(Embedding::from(vec![image.width() as f32; self.output_dim]))
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_version(&self) -> &str {
        VERSION
    }
}

fn id(i: u32) -> ImageId {
    format!("img-{i:03}")
}

fn ids(range: std::ops::Range<u32>) -> Vec<ImageId> {
    range.map(id).collect()
}

struct Harness {
    store: Arc<EmbeddingStore>,
    saves: Arc<SaveCounter>,
    encoder: Arc<FakeEncoder>,
    indexer: Indexer<WidthLibrary>,
}

impl Harness {
    fn new(library: WidthLibrary, encoder: FakeEncoder, cfg: IndexerConfig) -> Self {
        let saves = Arc::new(SaveCounter::default());
        let store = Arc::new(EmbeddingStore::with_backend(
            StoreConfig::new(DIM).with_model_version(VERSION),
            Box::new(CountingBackend(Arc::clone(&saves))),
        ));
        let encoder = Arc::new(encoder);
        let indexer = Indexer::new(
            Arc::clone(&store),
            Arc::clone(&encoder) as Arc<dyn ImageEncoder>,
            Arc::new(library),
            cfg,
        )
        .expect("indexer");
        Self {
            store,
            saves,
            encoder,
            indexer,
        }
    }

    fn saves(&self) -> usize {
        self.saves.saves.load(Ordering::SeqCst)
    }

    async fn run(&self, ids: Vec<ImageId>) -> IndexReport {
        self.indexer
            .index_all(ids, &CancellationToken::new())
            .await
            .expect("index run")
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn indexes_new_images_and_saves_once() {
    let h = Harness::new(
        WidthLibrary::with_images(20),
        FakeEncoder::new(),
        IndexerConfig::default(),
    );

    let report = h.run(ids(0..20)).await;

    assert_eq!(report.scheduled, 20);
    assert_eq!(report.encoded, 20);
    assert_eq!(report.failed, 0);
    assert_eq!(report.cancelled, 0);
    assert_eq!(report.saved, Some(Ok(20)));
    assert_eq!(h.store.len(), 20);
    assert_eq!(h.saves(), 1);
    assert_eq!(h.store.get("img-004").unwrap().as_slice(), &[5.0; DIM]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn saves_exactly_once_for_any_completion_order() {
    for seed in [1, 3, 7, 11, 13] {
        for concurrency in [1, 3, 8] {
            let mut encoder = FakeEncoder::new();
            encoder.jitter_seed = seed;
            let h = Harness::new(
                WidthLibrary::with_images(12),
                encoder,
                IndexerConfig::default().with_concurrency(concurrency),
            );
            let report = h.run(ids(0..12)).await;
            assert_eq!(report.encoded, 12, "seed {seed} concurrency {concurrency}");
            assert_eq!(h.saves(), 1, "seed {seed} concurrency {concurrency}");
        }
    }
}

#[tokio::test]
async fn duplicate_ids_are_encoded_once() {
    let h = Harness::new(
        WidthLibrary::with_images(3),
        FakeEncoder::new(),
        IndexerConfig::default(),
    );
    let requested = vec![id(0), id(1), id(0), id(2), id(1), id(0)];

    let report = h.run(requested).await;

    assert_eq!(report.requested, 6);
    assert_eq!(report.scheduled, 3);
    assert_eq!(report.encoded, 3);
    assert_eq!(h.encoder.calls(), 3);
}

#[tokio::test]
async fn already_indexed_images_are_skipped() {
    let h = Harness::new(
        WidthLibrary::with_images(5),
        FakeEncoder::new(),
        IndexerConfig::default(),
    );
    h.store.put(id(0), Embedding::from(vec![9.0; DIM])).unwrap();
    h.store.put(id(1), Embedding::from(vec![9.0; DIM])).unwrap();

    let report = h.run(ids(0..5)).await;

    assert_eq!(report.skipped_existing, 2);
    assert_eq!(report.encoded, 3);
    assert_eq!(h.encoder.calls(), 3);
    assert_eq!(h.store.len(), 5);
    // Existing embeddings are left alone.
    assert_eq!(h.store.get(&id(0)).unwrap().as_slice(), &[9.0; DIM]);
}

#[tokio::test]
async fn nothing_scheduled_means_no_save() {
    let h = Harness::new(
        WidthLibrary::with_images(2),
        FakeEncoder::new(),
        IndexerConfig::default(),
    );
    h.store.put(id(0), Embedding::from(vec![1.0; DIM])).unwrap();
    h.store.put(id(1), Embedding::from(vec![1.0; DIM])).unwrap();

    let report = h.run(ids(0..2)).await;
    assert_eq!(report.scheduled, 0);
    assert_eq!(report.saved, None);
    assert_eq!(h.saves(), 0);

    let report = h.run(Vec::new()).await;
    assert_eq!(report.requested, 0);
    assert_eq!(h.saves(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn partial_failures_do_not_abort_the_batch() {
    let mut encoder = FakeEncoder::new();
    // Widths 2 and 4 belong to img-001 and img-003.
    encoder.failing_widths = [2, 4].into_iter().collect();
    let h = Harness::new(
        WidthLibrary::with_images(6),
        encoder,
        IndexerConfig::default(),
    );
    // img-098 and img-099 are not in the library.
    let mut requested = ids(0..6);
    requested.extend([id(98), id(99)]);

    let report = h.run(requested).await;

    assert_eq!(report.scheduled, 8);
    assert_eq!(report.encoded, 4);
    assert_eq!(report.failed, 4);
    assert_eq!(report.cancelled, 0);
    assert_eq!(h.saves(), 1);
    assert!(h.store.contains(&id(0)));
    assert!(!h.store.contains(&id(1)));
    assert!(!h.store.contains(&id(98)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_is_bounded() {
    let h = Harness::new(
        WidthLibrary::with_images(16),
        FakeEncoder::new(),
        IndexerConfig::default().with_concurrency(2),
    );

    h.run(ids(0..16)).await;

    let max = h.encoder.max_in_flight.load(Ordering::SeqCst);
    assert!(max >= 1 && max <= 2, "saw {max} concurrent encodes");
}

#[tokio::test]
async fn cancelled_before_start_still_saves_once() {
    let h = Harness::new(
        WidthLibrary::with_images(4),
        FakeEncoder::new(),
        IndexerConfig::default(),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = h.indexer.index_all(ids(0..4), &cancel).await.unwrap();

    assert_eq!(report.scheduled, 4);
    assert_eq!(report.encoded, 0);
    assert_eq!(report.cancelled, 4);
    assert_eq!(h.encoder.calls(), 0);
    assert_eq!(h.saves(), 1);
}

#[tokio::test]
async fn cancellation_drops_in_flight_work_and_keeps_completed() {
    let mut encoder = FakeEncoder::new();
    encoder.hang_after = Some(2);
    let h = Harness::new(
        WidthLibrary::with_images(5),
        encoder,
        IndexerConfig::default().with_concurrency(1),
    );
    let cancel = CancellationToken::new();

    let canceller = async {
        while h.encoder.calls() < 3 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        cancel.cancel();
    };
    let (report, ()) = tokio::join!(h.indexer.index_all(ids(0..5), &cancel), canceller);
    let report = report.unwrap();

    assert_eq!(report.encoded, 2);
    assert_eq!(report.cancelled, 3);
    assert_eq!(h.store.len(), 2);
    assert!(!h.store.contains(&id(2)));
    assert_eq!(h.saves(), 1);
    assert_eq!(h.encoder.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dimension_mismatch_aborts_after_saving() {
    let mut encoder = FakeEncoder::new();
    encoder.output_dim = DIM - 1;
    let h = Harness::new(
        WidthLibrary::with_images(6),
        encoder,
        IndexerConfig::default().with_concurrency(1),
    );

    let err = h
        .indexer
        .index_all(ids(0..6), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        IndexerError::DimensionMismatch {
            expected: DIM,
            actual: DIM - 1
        }
    );
    assert!(h.encoder.calls() < 6);
    assert!(h.store.is_empty());
    assert_eq!(h.saves(), 1);
}

#[tokio::test]
async fn stale_embeddings_are_reindexed_when_enabled() {
    let h = Harness::new(
        WidthLibrary::with_images(3),
        FakeEncoder::new(),
        IndexerConfig::default().with_reindex_stale(true),
    );
    h.store
        .put_versioned(id(0), Embedding::from(vec![0.0; DIM]), "fake-0")
        .unwrap();
    h.store.put(id(1), Embedding::from(vec![0.0; DIM])).unwrap();

    let report = h.run(ids(0..3)).await;

    assert_eq!(report.skipped_existing, 1);
    assert_eq!(report.encoded, 2);
    assert!(h.store.is_current(&id(0)));
    assert!(h.store.stale_ids().is_empty());
}

#[tokio::test]
async fn panicking_encoder_counts_as_failure_and_work_continues() {
    let mut encoder = FakeEncoder::new();
    encoder.panicking_widths = HashSet::from([3]);
    let h = Harness::new(
        WidthLibrary::with_images(6),
        encoder,
        IndexerConfig::default().with_concurrency(1),
    );

    let report = h.run(ids(0..6)).await;

    assert_eq!(report.scheduled, 6);
    assert_eq!(report.encoded, 5);
    assert_eq!(report.failed, 1);
    assert_eq!(report.cancelled, 0);
    assert_eq!(report.saved, Some(Ok(5)));
    assert_eq!(h.saves(), 1);
    assert!(!h.store.contains(&id(2)));
    assert!(h.store.contains(&id(5)));
}

#[tokio::test]
async fn index_library_lists_then_indexes() {
    let h = Harness::new(
        WidthLibrary::with_images(7),
        FakeEncoder::new(),
        IndexerConfig::default(),
    );

    let report = h
        .indexer
        .index_library(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.requested, 7);
    assert_eq!(report.encoded, 7);
    assert_eq!(h.saves(), 1);
}

#[test]
fn encoder_dimension_must_match_store() {
    struct WideEncoder;

    #[async_trait]
    impl ImageEncoder for WideEncoder {
        async fn encode(&self, _: &DecodedImage) -> Result<Embedding, EncodeError> {
            Ok(Embedding::from(vec![0.0; DIM * 2]))
        }

        fn dimension(&self) -> usize {
            DIM * 2
        }

        fn model_version(&self) -> &str {
            VERSION
        }
    }

    let store = Arc::new(EmbeddingStore::open(StoreConfig::new(DIM)).unwrap());
    let result = Indexer::new(
        store,
        Arc::new(WideEncoder),
        Arc::new(WidthLibrary::with_images(1)),
        IndexerConfig::default(),
    );
    assert!(matches!(
        result,
        Err(IndexerError::DimensionMismatch {
            expected: DIM,
            actual: 8
        })
    ));
}
