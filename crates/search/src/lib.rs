//! Text-to-image search over an [`EmbeddingStore`](store::EmbeddingStore).
//!
//! [`SearchEngine::rank`] scores a query embedding against every stored image
//! embedding by dot product and keeps the best `k`. [`SearchEngine::search`]
//! additionally resolves the ranked ids through an [`AssetLibrary`].

mod config;
mod engine;
mod error;

pub use crate::config::SearchConfig;
pub use crate::engine::{ScoredResult, SearchEngine};
pub use crate::error::SearchError;
pub use encoder::{AssetLibrary, FetchError, ResolveError};
