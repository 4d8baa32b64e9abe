//! Encoder ports for photo search.
//!
//! An [`ImageEncoder`] maps a decoded image to an [`Embedding`] and a
//! [`TextEncoder`] maps a token sequence into the same `D`-dimensional space,
//! so a text query can be compared against image embeddings with a dot
//! product. The model runtime is a collaborator behind these traits; the
//! crate ships deterministic stubs for tests and model-less installs.
//!
//! ```
//! use encoder::{EncoderConfig, StubTextEncoder, TextEncoder};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let enc = StubTextEncoder::new(EncoderConfig::default().with_dimension(16)).unwrap();
//! let query = enc.encode(&[17, 9, 0, 0]).await.unwrap();
//! assert_eq!(query.len(), 16);
//! # });
//! ```

use async_trait::async_trait;

mod config;
mod error;
mod library;
mod normalize;
mod stub;

pub use crate::config::EncoderConfig;
pub use crate::error::{ensure_dimension, EncodeError};
pub use crate::library::{AssetLibrary, FetchError, ResolveError};
pub use crate::stub::{StubImageEncoder, StubTextEncoder};

pub use store::Embedding;
pub use tokenize::TokenId;

/// An image decoded into memory, ready for encoding.
pub type DecodedImage = image::DynamicImage;

/// Maps images into the shared embedding space.
#[async_trait]
pub trait ImageEncoder: Send + Sync {
    /// Encode one image. Must return exactly [`dimension`](Self::dimension)
    /// values; the store rejects anything else.
    async fn encode(&self, image: &DecodedImage) -> Result<Embedding, EncodeError>;

    fn dimension(&self) -> usize;

    /// Version tag recorded with every embedding this encoder produces.
    fn model_version(&self) -> &str;
}

/// Maps token sequences into the shared embedding space.
#[async_trait]
pub trait TextEncoder: Send + Sync {
    async fn encode(&self, tokens: &[TokenId]) -> Result<Embedding, EncodeError>;

    fn dimension(&self) -> usize;
}
