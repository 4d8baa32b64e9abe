use serde::{Deserialize, Serialize};

use crate::{TokenId, TokenizeError};

/// Tokenizer settings. Must match the text encoder's input layout.
///
/// ```
/// use tokenize::TokenizerConfig;
///
/// let cfg = TokenizerConfig::default();
/// assert_eq!(cfg.max_tokens, 32);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenizerConfig {
    /// Model input width `N`; every token sequence has exactly this length.
    #[serde(default = "TokenizerConfig::default_max_tokens")]
    pub max_tokens: usize,
    /// Value for positions without a word.
    #[serde(default)]
    pub pad_id: TokenId,
    /// Value for words missing from the vocabulary.
    #[serde(default = "TokenizerConfig::default_unknown_id")]
    pub unknown_id: TokenId,
}

impl TokenizerConfig {
    pub(crate) fn default_max_tokens() -> usize {
        32
    }

    pub(crate) fn default_unknown_id() -> TokenId {
        1
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_pad_id(mut self, pad_id: TokenId) -> Self {
        self.pad_id = pad_id;
        self
    }

    pub fn with_unknown_id(mut self, unknown_id: TokenId) -> Self {
        self.unknown_id = unknown_id;
        self
    }

    pub fn validate(&self) -> Result<(), TokenizeError> {
        if self.max_tokens == 0 {
            return Err(TokenizeError::InvalidConfig(
                "max_tokens must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            max_tokens: Self::default_max_tokens(),
            pad_id: 0,
            unknown_id: Self::default_unknown_id(),
        }
    }
}
