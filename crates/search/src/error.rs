use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The query vector does not match the store dimension. Raised before any
    /// comparison is made.
    #[error("query has {actual} dimensions, store expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("invalid search config: {0}")]
    InvalidConfig(String),
}
