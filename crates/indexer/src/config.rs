use serde::{Deserialize, Serialize};

use crate::IndexerError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexerConfig {
    /// Upper bound on images fetched and encoded at the same time.
    #[serde(default = "IndexerConfig::default_concurrency")]
    pub concurrency: usize,
    /// Re-encode images whose stored embedding came from another model
    /// version instead of skipping every id already present.
    #[serde(default)]
    pub reindex_stale: bool,
}

impl IndexerConfig {
    fn default_concurrency() -> usize {
        4
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_reindex_stale(mut self, reindex_stale: bool) -> Self {
        self.reindex_stale = reindex_stale;
        self
    }

    pub fn validate(&self) -> Result<(), IndexerError> {
        if self.concurrency == 0 {
            return Err(IndexerError::InvalidConfig(
                "concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            concurrency: Self::default_concurrency(),
            reindex_stale: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = IndexerConfig::default();
        assert_eq!(cfg.concurrency, 4);
        assert!(!cfg.reindex_stale);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = IndexerConfig::default().with_concurrency(0).validate().unwrap_err();
        assert!(matches!(err, IndexerError::InvalidConfig(_)));
    }
}
