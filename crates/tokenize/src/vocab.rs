use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::{TokenId, TokenizeError};

/// Immutable mapping from lowercase word to vocabulary index.
///
/// Loaded once at startup from a JSON object such as
/// `{"dog": 17, "beach": 412}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularyTable {
    words: HashMap<String, TokenId>,
}

impl VocabularyTable {
    /// Read a JSON vocabulary from disk.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, TokenizeError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => TokenizeError::MissingVocabulary(path.display().to_string()),
            _ => TokenizeError::InvalidVocabulary(format!("{}: {err}", path.display())),
        })?;
        let table = Self::from_json_str(&content)?;
        tracing::info!(path = %path.display(), words = table.len(), "loaded vocabulary");
        Ok(table)
    }

    /// Parse a JSON vocabulary. Indices must be non-negative integers.
    pub fn from_json_str(json: &str) -> Result<Self, TokenizeError> {
        let words: HashMap<String, TokenId> = serde_json::from_str(json)
            .map_err(|e| TokenizeError::InvalidVocabulary(e.to_string()))?;
        Ok(Self { words })
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, TokenId)>,
        S: Into<String>,
    {
        Self {
            words: pairs.into_iter().map(|(w, id)| (w.into(), id)).collect(),
        }
    }

    pub fn get(&self, word: &str) -> Option<TokenId> {
        self.words.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
