//! # Embedding store
//!
//! Durable mapping from image id to embedding vector. The store is the single
//! owner of every embedding in the process: the indexer writes through
//! [`EmbeddingStore::put`], the search engine reads a consistent snapshot via
//! [`EmbeddingStore::all_entries`], and nothing else touches the map.
//!
//! ## Lifecycle
//!
//! 1. [`EmbeddingStore::open`] builds the configured [`StoreBackend`].
//! 2. [`EmbeddingStore::load`] fills the map from persisted state. Missing or
//!    corrupt state yields a [`LoadError`] and an empty store; callers log it
//!    and carry on.
//! 3. The indexer calls `put` concurrently while encodes complete.
//! 4. [`EmbeddingStore::save`] writes the full mapping in one backend
//!    transaction.
//!
//! ## Invariants
//!
//! - Every stored embedding has exactly [`StoreConfig::dimension`] values;
//!   `put` rejects anything else with [`StoreError::DimensionMismatch`].
//! - Every entry is tagged with the model version that produced it, so
//!   embeddings from an older encoder can be found with
//!   [`EmbeddingStore::stale_ids`].
//!
//! ```
//! use store::{EmbeddingStore, StoreConfig};
//!
//! let store = EmbeddingStore::open(StoreConfig::new(3)).unwrap();
//! store.put("img-1", vec![1.0, 0.0, 0.0].into()).unwrap();
//! assert!(store.contains("img-1"));
//! assert_eq!(store.all_entries().len(), 1);
//! ```

mod backend;
mod embedding;
mod error;
mod record;

pub use crate::backend::{BackendConfig, InMemoryBackend, StoreBackend};
#[cfg(feature = "backend-redb")]
pub use crate::backend::RedbBackend;
pub use crate::embedding::{dot_product, Embedding};
pub use crate::error::{BackendError, LoadError, SaveError, StoreError};
pub use crate::record::{
    CompressionCodec, CompressionConfig, PersistedRecord, STORE_SCHEMA_VERSION,
};

use crate::record::{decode_record, encode_record};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Opaque, stable identifier of one photo across runs.
pub type ImageId = String;

/// Model version used when the caller does not configure one.
pub const DEFAULT_MODEL_VERSION: &str = "unversioned";

/// Store configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Embedding dimensionality `D`, shared by image and text encoders.
    pub dimension: usize,
    /// Version tag applied by [`EmbeddingStore::put`].
    pub model_version: String,
    pub backend: BackendConfig,
    pub compression: CompressionConfig,
}

impl StoreConfig {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            backend: BackendConfig::default(),
            compression: CompressionConfig::default(),
        }
    }

    pub fn with_model_version<S: Into<String>>(mut self, version: S) -> Self {
        self.model_version = version.into();
        self
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }
}

/// One entry of the store.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredEmbedding {
    pub embedding: Embedding,
    pub model_version: Arc<str>,
}

/// Thread-safe embedding store. Share it behind an `Arc`.
pub struct EmbeddingStore {
    backend: Box<dyn StoreBackend>,
    cfg: StoreConfig,
    model_version: Arc<str>,
    entries: RwLock<HashMap<ImageId, StoredEmbedding>>,
    /// Serializes saves so an older snapshot never lands after a newer one.
    save_lock: Mutex<()>,
}

impl EmbeddingStore {
    /// Build the configured backend and return an empty store.
    pub fn open(cfg: StoreConfig) -> Result<Self, BackendError> {
        let backend = cfg.backend.build()?;
        Ok(Self::with_backend(cfg, backend))
    }

    /// Build a store over a caller-supplied backend.
    pub fn with_backend(cfg: StoreConfig, backend: Box<dyn StoreBackend>) -> Self {
        let model_version: Arc<str> = cfg.model_version.as_str().into();
        Self {
            backend,
            cfg,
            model_version,
            entries: RwLock::new(HashMap::new()),
            save_lock: Mutex::new(()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.cfg.dimension
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn get(&self, id: &str) -> Option<Embedding> {
        self.read().get(id).map(|entry| entry.embedding.clone())
    }

    /// Insert or overwrite `id`, tagged with the configured model version.
    pub fn put<I: Into<ImageId>>(&self, id: I, embedding: Embedding) -> Result<(), StoreError> {
        let version = self.model_version.clone();
        self.insert(id.into(), embedding, version)
    }

    /// Insert or overwrite `id` with an explicit model version tag.
    pub fn put_versioned<I: Into<ImageId>>(
        &self,
        id: I,
        embedding: Embedding,
        model_version: &str,
    ) -> Result<(), StoreError> {
        self.insert(id.into(), embedding, model_version.into())
    }

    fn insert(
        &self,
        id: ImageId,
        embedding: Embedding,
        model_version: Arc<str>,
    ) -> Result<(), StoreError> {
        self.check_dimension(embedding.len())?;
        self.write().insert(
            id,
            StoredEmbedding {
                embedding,
                model_version,
            },
        );
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Present and produced by the current model version.
    pub fn is_current(&self, id: &str) -> bool {
        self.read()
            .get(id)
            .is_some_and(|entry| entry.model_version == self.model_version)
    }

    /// Ids whose embedding was produced by a different model version.
    pub fn stale_ids(&self) -> Vec<ImageId> {
        let mut ids: Vec<ImageId> = self
            .read()
            .iter()
            .filter(|(_, entry)| entry.model_version != self.model_version)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of every entry, taken under a single read lock.
    pub fn all_entries(&self) -> Vec<(ImageId, Embedding)> {
        self.read()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.embedding.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Replace the in-memory map with the persisted state.
    ///
    /// Returns the number of loaded entries. On any error the store is left
    /// empty.
    pub fn load(&self) -> Result<usize, LoadError> {
        match self.read_persisted() {
            Ok(loaded) => {
                let count = loaded.len();
                *self.write() = loaded;
                info!(count, "loaded persisted embeddings");
                Ok(count)
            }
            Err(err) => {
                self.write().clear();
                Err(err)
            }
        }
    }

    fn read_persisted(&self) -> Result<HashMap<ImageId, StoredEmbedding>, LoadError> {
        if !self.backend.exists()? {
            return Err(LoadError::Missing);
        }

        let mut raw: Vec<(String, Vec<u8>)> = Vec::new();
        self.backend
            .scan(&mut |key, value| raw.push((key.to_string(), value.to_vec())))?;

        let mut loaded = HashMap::with_capacity(raw.len());
        for (id, bytes) in raw {
            let record = decode_record(&bytes, &self.cfg.compression)
                .map_err(|e| LoadError::Corrupt(format!("record {id}: {e}")))?;
            if record.schema_version != STORE_SCHEMA_VERSION {
                return Err(LoadError::Corrupt(format!(
                    "record {id}: unsupported schema version {}",
                    record.schema_version
                )));
            }
            if record.vector.len() != self.cfg.dimension {
                return Err(LoadError::Corrupt(format!(
                    "record {id}: expected {} values, found {}",
                    self.cfg.dimension,
                    record.vector.len()
                )));
            }
            loaded.insert(
                id,
                StoredEmbedding {
                    embedding: Embedding::new(record.vector),
                    model_version: record.model_version.into(),
                },
            );
        }
        Ok(loaded)
    }

    /// Persist the full current mapping. Returns the number of saved entries.
    pub fn save(&self) -> Result<usize, SaveError> {
        let _guard = self
            .save_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let snapshot: Vec<(ImageId, StoredEmbedding)> = self
            .read()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();

        let mut encoded = Vec::with_capacity(snapshot.len());
        for (id, entry) in snapshot {
            let record = PersistedRecord {
                schema_version: STORE_SCHEMA_VERSION,
                model_version: entry.model_version.to_string(),
                vector: entry.embedding.to_vec(),
            };
            encoded.push((id, encode_record(&record, &self.cfg.compression)?));
        }

        let count = encoded.len();
        self.backend.replace_all(encoded)?;
        self.backend.flush()?;
        debug!(count, "saved embeddings");
        Ok(count)
    }

    fn check_dimension(&self, actual: usize) -> Result<(), StoreError> {
        if actual != self.cfg.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.cfg.dimension,
                actual,
            });
        }
        Ok(())
    }

    // Writers never panic while holding the lock, so a poisoned guard still
    // holds a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ImageId, StoredEmbedding>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ImageId, StoredEmbedding>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
