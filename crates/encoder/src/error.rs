use thiserror::Error;

/// Failure of one encode call. Per-item: callers skip the item and go on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Model inference failed or its worker died.
    #[error("inference failure: {0}")]
    Inference(String),
    /// The input cannot be encoded (empty image, wrong token width, ...).
    #[error("invalid encoder input: {0}")]
    InvalidInput(String),
    /// The model produced a vector of the wrong length.
    #[error("encoder produced {actual} values, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("invalid encoder config: {0}")]
    InvalidConfig(String),
}

/// Reject embeddings whose length differs from `expected`.
///
/// Model adapters call this on raw runtime output before handing it on.
pub fn ensure_dimension(
    embedding: store::Embedding,
    expected: usize,
) -> Result<store::Embedding, EncodeError> {
    if embedding.len() != expected {
        return Err(EncodeError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    Ok(embedding)
}
