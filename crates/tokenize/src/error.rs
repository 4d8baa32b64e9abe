use thiserror::Error;

/// Errors raised while building a tokenizer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// The known-words table could not be found. Query embeddings are
    /// meaningless without it, so callers treat this as fatal.
    #[error("vocabulary not found: {0}")]
    MissingVocabulary(String),
    #[error("vocabulary could not be parsed: {0}")]
    InvalidVocabulary(String),
    #[error("invalid tokenizer configuration: {0}")]
    InvalidConfig(String),
}
