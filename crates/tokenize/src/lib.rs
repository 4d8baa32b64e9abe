//! Query tokenizer.
//!
//! Turns free text into the fixed-width index sequence the text encoder
//! expects:
//!
//! - lowercase the text (Unicode-aware, locale-free)
//! - split on single spaces
//! - look up each word's index in the [`VocabularyTable`]; unknown words get
//!   [`TokenizerConfig::unknown_id`]
//! - truncate to [`TokenizerConfig::max_tokens`] and pad the rest with
//!   [`TokenizerConfig::pad_id`]
//!
//! Pure function of text + vocabulary + config. No I/O after the vocabulary
//! is loaded.
//!
//! ```
//! use tokenize::{Tokenizer, TokenizerConfig, VocabularyTable};
//!
//! let vocab = VocabularyTable::from_pairs([("sunset", 1093), ("beach", 412)]);
//! let tokenizer = Tokenizer::new(vocab, TokenizerConfig::default()).unwrap();
//! let ids = tokenizer.tokenize("Sunset beach");
//! assert_eq!(&ids[..3], &[1093, 412, 0]);
//! assert_eq!(ids.len(), 32);
//! ```

mod config;
mod error;
mod tokenizer;
mod vocab;

pub use crate::config::TokenizerConfig;
pub use crate::error::TokenizeError;
pub use crate::tokenizer::Tokenizer;
pub use crate::vocab::VocabularyTable;

/// Vocabulary index fed to the text encoder.
pub type TokenId = u32;
