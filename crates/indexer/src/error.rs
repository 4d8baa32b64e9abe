use encoder::FetchError;
use store::StoreError;
use thiserror::Error;

/// Errors that abort an indexing run. Per-image fetch and encode failures
/// are not errors here; they are counted in the report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexerError {
    /// The encoder emits vectors the store cannot hold. Remaining work is
    /// cancelled; whatever was already encoded is still saved.
    #[error("encoder dimension mismatch: store expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("failed to list library images: {0}")]
    Listing(#[from] FetchError),
    #[error("invalid indexer config: {0}")]
    InvalidConfig(String),
}

impl From<StoreError> for IndexerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
        }
    }
}
