use async_trait::async_trait;
use store::ImageId;
use thiserror::Error;

use crate::DecodedImage;

/// Failure to list or load a library image.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("image {0} not found")]
    NotFound(String),
    #[error("failed to decode image {id}: {reason}")]
    Decode { id: String, reason: String },
    #[error("library I/O error: {0}")]
    Io(String),
}

/// Failure to turn a ranked id into something displayable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("image {0} no longer exists")]
    NotFound(String),
    #[error("image {id} unavailable: {reason}")]
    Unavailable { id: String, reason: String },
}

/// Port to the platform's photo library.
///
/// The indexer uses `list_images` and `fetch_image`; search uses
/// `resolve_display_image` to turn ranked ids into something a UI can show.
#[async_trait]
pub trait AssetLibrary: Send + Sync {
    /// What search hands back for each hit (a path, a thumbnail, a URL...).
    type Display: Send;

    async fn list_images(&self) -> Result<Vec<ImageId>, FetchError>;

    async fn fetch_image(&self, id: &str) -> Result<DecodedImage, FetchError>;

    async fn resolve_display_image(&self, id: &str) -> Result<Self::Display, ResolveError>;
}
