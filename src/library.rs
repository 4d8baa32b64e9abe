//! Photo library backed by a directory tree.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use encoder::DecodedImage;
use search::{AssetLibrary, FetchError, ResolveError};
use store::ImageId;
use walkdir::WalkDir;

/// File extensions treated as photos, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

const DEFAULT_THUMBNAIL_SIZE: u32 = 500;

/// A search hit ready for display.
#[derive(Debug, Clone)]
pub struct DisplayImage {
    pub id: ImageId,
    pub path: PathBuf,
    /// Aspect-preserving thumbnail no larger than the library's thumbnail size.
    pub thumbnail: DecodedImage,
}

/// Treats every image file under `root` as a library photo.
///
/// Image ids are paths relative to `root` with `/` separators, so they stay
/// stable when the library directory moves.
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
    thumbnail_size: u32,
}

impl DirectoryLibrary {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
        }
    }

    pub fn with_thumbnail_size(mut self, size: u32) -> Self {
        self.thumbnail_size = size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an id back to a file under `root`. Ids that would escape the
    /// root are treated as unknown.
    fn path_for(&self, id: &str) -> Option<PathBuf> {
        let relative = Path::new(id);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        (safe && !id.is_empty()).then(|| self.root.join(relative))
    }
}

#[async_trait]
impl AssetLibrary for DirectoryLibrary {
    type Display = DisplayImage;

    /// Newest first by modification time; equal times fall back to id order.
    async fn list_images(&self) -> Result<Vec<ImageId>, FetchError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || scan(&root))
            .await
            .map_err(|e| FetchError::Io(format!("library scan task failed: {e}")))?
    }

    async fn fetch_image(&self, id: &str) -> Result<DecodedImage, FetchError> {
        let path = self
            .path_for(id)
            .ok_or_else(|| FetchError::NotFound(id.to_string()))?;
        let size = self.thumbnail_size;
        let loaded = tokio::task::spawn_blocking(move || load_thumbnail(&path, size))
            .await
            .map_err(|e| FetchError::Io(format!("image decode task failed: {e}")))?;

        loaded.map_err(|err| match err {
            image::ImageError::IoError(e) if e.kind() == io::ErrorKind::NotFound => {
                FetchError::NotFound(id.to_string())
            }
            other => FetchError::Decode {
                id: id.to_string(),
                reason: other.to_string(),
            },
        })
    }

    async fn resolve_display_image(&self, id: &str) -> Result<DisplayImage, ResolveError> {
        let path = self
            .path_for(id)
            .ok_or_else(|| ResolveError::NotFound(id.to_string()))?;
        if !path.is_file() {
            return Err(ResolveError::NotFound(id.to_string()));
        }

        let size = self.thumbnail_size;
        let load_path = path.clone();
        let thumbnail = tokio::task::spawn_blocking(move || load_thumbnail(&load_path, size))
            .await
            .map_err(|e| ResolveError::Unavailable {
                id: id.to_string(),
                reason: e.to_string(),
            })?
            .map_err(|e| ResolveError::Unavailable {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        Ok(DisplayImage {
            id: id.to_string(),
            path,
            thumbnail,
        })
    }
}

fn scan(root: &Path) -> Result<Vec<ImageId>, FetchError> {
    let meta = std::fs::metadata(root)
        .map_err(|e| FetchError::Io(format!("{}: {e}", root.display())))?;
    if !meta.is_dir() {
        return Err(FetchError::Io(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut found: Vec<(SystemTime, ImageId)> = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable library entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_image(entry.path()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        found.push((modified, image_id(relative)));
    }

    found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    tracing::debug!(root = %root.display(), images = found.len(), "scanned library");
    Ok(found.into_iter().map(|(_, id)| id).collect())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn image_id(relative: &Path) -> ImageId {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn load_thumbnail(path: &Path, size: u32) -> Result<DecodedImage, image::ImageError> {
    let image = image::open(path)?;
    if image.width() <= size && image.height() <= size {
        return Ok(image);
    }
    Ok(image.thumbnail(size, size))
}
