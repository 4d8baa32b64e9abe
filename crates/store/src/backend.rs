use crate::BackendError;
use std::collections::HashMap;
use std::sync::RwLock;

/// Key-value persistence used by [`EmbeddingStore`](crate::EmbeddingStore).
///
/// Keys are image ids, values are encoded [`PersistedRecord`](crate::PersistedRecord)s.
pub trait StoreBackend: Send + Sync {
    /// Replace the whole persisted mapping with `entries` in one atomic write.
    fn replace_all(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), BackendError>;
    /// Visit every persisted key/value pair.
    fn scan(&self, visitor: &mut dyn FnMut(&str, &[u8])) -> Result<(), BackendError>;
    /// Whether anything was ever persisted.
    fn exists(&self) -> Result<bool, BackendError>;
    /// Flush any buffered writes.
    fn flush(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Configuration for selecting and building a backend.
///
/// ```
/// use store::BackendConfig;
///
/// let ephemeral = BackendConfig::in_memory();
/// let durable = BackendConfig::redb("/data/embeddings.redb");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackendConfig {
    /// Redb database file at `path`. Requires the `backend-redb` feature.
    Redb { path: String },
    /// Process-local map; nothing survives a restart.
    #[default]
    InMemory,
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    /// Build the backend described by this configuration.
    pub fn build(&self) -> Result<Box<dyn StoreBackend>, BackendError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(RedbBackend::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(BackendError::new("redb backend disabled at compile time"))
                }
            }
        }
    }
}

/// In-memory backend. `None` until the first `replace_all`.
pub struct InMemoryBackend {
    records: RwLock<Option<HashMap<String, Vec<u8>>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(None),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreBackend for InMemoryBackend {
    fn replace_all(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), BackendError> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| BackendError::new("poisoned lock"))?;
        *guard = Some(entries.into_iter().collect());
        Ok(())
    }

    fn scan(&self, visitor: &mut dyn FnMut(&str, &[u8])) -> Result<(), BackendError> {
        let guard = self
            .records
            .read()
            .map_err(|_| BackendError::new("poisoned lock"))?;
        if let Some(records) = guard.as_ref() {
            for (key, value) in records {
                visitor(key, value);
            }
        }
        Ok(())
    }

    fn exists(&self) -> Result<bool, BackendError> {
        let guard = self
            .records
            .read()
            .map_err(|_| BackendError::new("poisoned lock"))?;
        Ok(guard.is_some())
    }
}

#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use self::redb::RedbBackend;
