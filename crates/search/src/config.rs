use serde::{Deserialize, Serialize};

use crate::SearchError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Result count used when the caller does not ask for one.
    #[serde(default = "SearchConfig::default_top_k")]
    pub default_top_k: usize,
    /// Results scoring below this are dropped before truncation.
    #[serde(default)]
    pub min_score: Option<f32>,
}

impl SearchConfig {
    fn default_top_k() -> usize {
        25
    }

    pub fn with_default_top_k(mut self, k: usize) -> Self {
        self.default_top_k = k;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.default_top_k == 0 {
            return Err(SearchError::InvalidConfig(
                "default_top_k must be greater than zero".into(),
            ));
        }
        if let Some(min) = self.min_score {
            if !min.is_finite() {
                return Err(SearchError::InvalidConfig(
                    "min_score must be a finite number".into(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: Self::default_top_k(),
            min_score: None,
        }
    }
}
