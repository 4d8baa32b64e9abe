use std::sync::Arc;

use crate::{TokenId, TokenizeError, TokenizerConfig, VocabularyTable};

/// Maps query text to a fixed-width sequence of vocabulary indices.
///
/// Cheap to clone; the vocabulary is shared.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    vocab: Arc<VocabularyTable>,
    cfg: TokenizerConfig,
}

impl Tokenizer {
    pub fn new(vocab: VocabularyTable, cfg: TokenizerConfig) -> Result<Self, TokenizeError> {
        Self::with_shared_vocab(Arc::new(vocab), cfg)
    }

    pub fn with_shared_vocab(
        vocab: Arc<VocabularyTable>,
        cfg: TokenizerConfig,
    ) -> Result<Self, TokenizeError> {
        cfg.validate()?;
        if vocab.is_empty() {
            tracing::warn!("tokenizer built over an empty vocabulary; every word will be unknown");
        }
        Ok(Self { vocab, cfg })
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.cfg
    }

    pub fn vocabulary(&self) -> &VocabularyTable {
        &self.vocab
    }

    /// Tokenize `text` into exactly `max_tokens` ids.
    ///
    /// The text is lowercased and split on single spaces, so consecutive
    /// spaces produce empty words, which map to `unknown_id` like any other
    /// out-of-vocabulary word. Words past `max_tokens` are dropped and unused
    /// positions hold `pad_id`.
    pub fn tokenize(&self, text: &str) -> Vec<TokenId> {
        let lowered = text.to_lowercase();
        let mut ids = vec![self.cfg.pad_id; self.cfg.max_tokens];

        for (slot, word) in ids.iter_mut().zip(lowered.split(' ')) {
            *slot = self.vocab.get(word).unwrap_or(self.cfg.unknown_id);
        }

        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer(max_tokens: usize) -> Tokenizer {
        let vocab = VocabularyTable::from_pairs([("dog", 17), ("on", 9), ("beach", 412), ("the", 3)]);
        Tokenizer::new(vocab, TokenizerConfig::default().with_max_tokens(max_tokens)).unwrap()
    }

    #[test]
    fn looks_up_real_indices_and_pads() {
        let ids = tokenizer(6).tokenize("Dog on the BEACH");
        assert_eq!(ids, vec![17, 9, 3, 412, 0, 0]);
    }

    #[test]
    fn output_width_is_fixed() {
        let t = tokenizer(32);
        let long = "dog ".repeat(100);
        for text in ["", "dog", "dog on the beach", long.as_str()] {
            assert_eq!(t.tokenize(text).len(), 32);
        }
    }

    #[test]
    fn long_queries_are_truncated() {
        let ids = tokenizer(3).tokenize("the dog on the beach");
        assert_eq!(ids, vec![3, 17, 9]);
    }

    #[test]
    fn unknown_words_use_unknown_id() {
        let ids = tokenizer(4).tokenize("dog surfing");
        assert_eq!(ids, vec![17, 1, 0, 0]);
    }

    #[test]
    fn split_is_on_single_spaces() {
        // "dog  beach" has an empty word between the two spaces.
        let ids = tokenizer(4).tokenize("dog  beach");
        assert_eq!(ids, vec![17, 1, 412, 0]);
    }

    #[test]
    fn empty_text_is_one_empty_word() {
        let ids = tokenizer(3).tokenize("");
        assert_eq!(ids, vec![1, 0, 0]);
    }

    #[test]
    fn custom_pad_and_unknown_ids() {
        let vocab = VocabularyTable::from_pairs([("dog", 17)]);
        let cfg = TokenizerConfig::default()
            .with_max_tokens(3)
            .with_pad_id(99)
            .with_unknown_id(7);
        let t = Tokenizer::new(vocab, cfg).unwrap();
        assert_eq!(t.tokenize("cat dog"), vec![7, 17, 99]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = Tokenizer::new(
            VocabularyTable::default(),
            TokenizerConfig::default().with_max_tokens(0),
        )
        .unwrap_err();
        assert!(matches!(err, TokenizeError::InvalidConfig(_)));
    }
}
