use std::fmt::Display;
use thiserror::Error;

/// Failure reported by a [`StoreBackend`](crate::StoreBackend).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("backend error: {0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new<E: Display>(err: E) -> Self {
        Self(err.to_string())
    }
}

/// Errors raised by in-memory store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An embedding of the wrong length was offered to the store. This is a
    /// configuration or data-corruption bug and must abort the caller.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors from [`EmbeddingStore::load`](crate::EmbeddingStore::load).
///
/// None of these are fatal: the store is left empty and startup continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("no persisted embeddings found")]
    Missing,
    #[error("persisted embeddings are corrupt: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors from [`EmbeddingStore::save`](crate::EmbeddingStore::save).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SaveError {
    #[error("failed to encode embedding record: {0}")]
    Encode(String),
    #[error("compression error: {0}")]
    Compression(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
