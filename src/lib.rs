//! Workspace umbrella crate for photosearch.
//!
//! Ties the tokenizer, encoders, embedding store, indexer and search engine
//! together behind [`PhotoSearch`], so callers can index a photo library and
//! query it with free text through a single entry point.
//!
//! ```no_run
//! use photosearch::{AppConfig, CancellationToken, PhotoSearch};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_file("photosearch.yaml")?;
//! let app = PhotoSearch::from_config(&config)?;
//!
//! app.index_library(&CancellationToken::new()).await?;
//! for hit in app.search("dog on the beach", Some(10)).await? {
//!     println!("{}", hit.path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod library;

pub use crate::config::{AppConfig, ConfigLoadError};
pub use crate::library::{DirectoryLibrary, DisplayImage, IMAGE_EXTENSIONS};

pub use encoder::{
    DecodedImage, EncodeError, EncoderConfig, ImageEncoder, StubImageEncoder, StubTextEncoder,
    TextEncoder,
};
pub use indexer::{IndexReport, Indexer, IndexerConfig, IndexerError};
pub use search::{
    AssetLibrary, FetchError, ResolveError, ScoredResult, SearchConfig, SearchEngine, SearchError,
};
pub use store::{
    BackendConfig, Embedding, EmbeddingStore, ImageId, LoadError, SaveError, StoreConfig,
};
pub use tokenize::{TokenId, TokenizeError, Tokenizer, TokenizerConfig, VocabularyTable};
pub use tokio_util::sync::CancellationToken;

use std::sync::Arc;

use store::BackendError;
use thiserror::Error;

/// Errors that prevent the application from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),
    #[error("vocabulary: {0}")]
    Vocabulary(#[from] TokenizeError),
    #[error("encoder: {0}")]
    Encoder(#[from] EncodeError),
    #[error("embedding store: {0}")]
    Store(#[from] BackendError),
    #[error("indexer: {0}")]
    Indexer(#[from] IndexerError),
    #[error("search: {0}")]
    Search(#[from] SearchError),
}

/// Text search over an indexed photo library.
pub struct PhotoSearch<L: ?Sized = DirectoryLibrary> {
    tokenizer: Tokenizer,
    text_encoder: Arc<dyn TextEncoder>,
    store: Arc<EmbeddingStore>,
    engine: SearchEngine,
    indexer: Indexer<L>,
    library: Arc<L>,
}

impl<L: AssetLibrary + ?Sized + 'static> PhotoSearch<L> {
    /// Assemble the application from already-built parts.
    ///
    /// The store is used as is; call [`load_store`] first to restore a
    /// previous session.
    pub fn new(
        tokenizer: Tokenizer,
        text_encoder: Arc<dyn TextEncoder>,
        image_encoder: Arc<dyn ImageEncoder>,
        store: Arc<EmbeddingStore>,
        library: Arc<L>,
        indexer_cfg: IndexerConfig,
        search_cfg: SearchConfig,
    ) -> Result<Self, StartupError> {
        let indexer = Indexer::new(
            Arc::clone(&store),
            image_encoder,
            Arc::clone(&library),
            indexer_cfg,
        )?;
        let engine = SearchEngine::new(Arc::clone(&store), search_cfg)?;
        Ok(Self {
            tokenizer,
            text_encoder,
            store,
            engine,
            indexer,
            library,
        })
    }

    pub fn store(&self) -> &Arc<EmbeddingStore> {
        &self.store
    }

    pub fn library(&self) -> &Arc<L> {
        &self.library
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Find the photos best matching `text`.
    ///
    /// `top_k` defaults to the configured `default_top_k`. A query the text
    /// encoder cannot handle is logged and yields no results; a query vector
    /// of the wrong dimension is an error.
    pub async fn search(
        &self,
        text: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<L::Display>, SearchError> {
        let k = top_k.unwrap_or(self.engine.config().default_top_k);
        let tokens = self.tokenizer.tokenize(text);
        let query = match self.text_encoder.encode(&tokens).await {
            Ok(query) => query,
            Err(err) => {
                tracing::error!(error = %err, query = text, "failed to encode search query");
                return Ok(Vec::new());
            }
        };
        self.engine.search(&query, k, self.library.as_ref()).await
    }

    /// Ranked ids and scores for `text`, without display resolution.
    pub async fn rank(&self, text: &str, top_k: usize) -> Result<Vec<ScoredResult>, SearchError> {
        let tokens = self.tokenizer.tokenize(text);
        match self.text_encoder.encode(&tokens).await {
            Ok(query) => self.engine.rank(&query, top_k),
            Err(err) => {
                tracing::error!(error = %err, query = text, "failed to encode search query");
                Ok(Vec::new())
            }
        }
    }

    /// Index every image the library lists.
    pub async fn index_library(
        &self,
        cancel: &CancellationToken,
    ) -> Result<IndexReport, IndexerError> {
        self.indexer.index_library(cancel).await
    }

    /// Index specific images, e.g. ones the platform reported as new.
    pub async fn index_images(
        &self,
        ids: Vec<ImageId>,
        cancel: &CancellationToken,
    ) -> Result<IndexReport, IndexerError> {
        self.indexer.index_all(ids, cancel).await
    }
}

impl PhotoSearch<DirectoryLibrary> {
    /// Build the application described by `cfg` over a directory library,
    /// using the deterministic stub encoders.
    ///
    /// A missing vocabulary is fatal. Persisted embeddings are restored on a
    /// best-effort basis, see [`load_store`].
    pub fn from_config(cfg: &AppConfig) -> Result<Self, StartupError> {
        cfg.validate()?;

        let vocab = VocabularyTable::from_json_file(&cfg.vocabulary.path)?;
        let tokenizer = Tokenizer::new(vocab, cfg.tokenizer.clone())?;
        let image_encoder = Arc::new(StubImageEncoder::new(cfg.encoder.clone())?);
        let text_encoder = Arc::new(StubTextEncoder::new(cfg.encoder.clone())?);

        let store = Arc::new(EmbeddingStore::open(cfg.store_config())?);
        load_store(&store);

        let library = Arc::new(
            DirectoryLibrary::new(cfg.library.root.clone())
                .with_thumbnail_size(cfg.library.thumbnail_size),
        );

        tracing::info!(
            model = %cfg.encoder.model_name,
            version = %cfg.encoder.model_version,
            dimension = cfg.encoder.dimension,
            library = %cfg.library.root.display(),
            "photosearch ready"
        );

        Self::new(
            tokenizer,
            text_encoder,
            image_encoder,
            store,
            library,
            cfg.indexer.clone(),
            cfg.search.clone(),
        )
    }
}

/// Restore persisted embeddings into `store`.
///
/// Failures are not fatal: the store stays empty and the library is simply
/// re-indexed. Returns the number of restored entries.
pub fn load_store(store: &EmbeddingStore) -> usize {
    match store.load() {
        Ok(count) => {
            let stale = store.stale_ids().len();
            if stale > 0 {
                tracing::warn!(
                    stale,
                    current_version = store.model_version(),
                    "some embeddings come from another model version"
                );
            }
            count
        }
        Err(LoadError::Missing) => {
            tracing::info!("no saved embeddings found; starting with an empty store");
            0
        }
        Err(err) => {
            tracing::warn!(error = %err, "could not restore saved embeddings; starting empty");
            0
        }
    }
}
