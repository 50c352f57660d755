use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use alertline_shared::constants::{ALLOWED_IMAGE_EXTENSIONS, UPLOADS_URL_PREFIX};

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Only jpeg, jpg, png and gif images are allowed")]
    Unsupported,

    #[error("Empty image")]
    Empty,

    #[error("Image too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Path traversal detected")]
    Traversal,

    #[error("Image storage failed: {0}")]
    Io(String),
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Unsupported | ImageError::Empty | ImageError::Traversal => {
                ApiError::BadRequest(err.to_string())
            }
            ImageError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            ImageError::Io(_) => ApiError::Internal(err.to_string()),
        }
    }
}

/// Resolve a single file name inside `base`, refusing anything that would
/// climb out of it.
fn ensure_within(base: &Path, file_name: &str) -> Result<PathBuf, ImageError> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => {
            let resolved = base.join(name);
            if resolved.starts_with(base) {
                Ok(resolved)
            } else {
                Err(ImageError::Traversal)
            }
        }
        _ => Err(ImageError::Traversal),
    }
}

/// Pick the stored extension for an upload. Both the file name extension and
/// the declared content type must name an accepted image format.
fn accepted_extension(file_name: Option<&str>, content_type: Option<&str>) -> Option<String> {
    let ext = Path::new(file_name?)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    if !ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }

    let subtype = content_type?
        .trim()
        .to_ascii_lowercase()
        .strip_prefix("image/")?
        .to_string();
    if !ALLOWED_IMAGE_EXTENSIONS.contains(&subtype.as_str()) {
        return None;
    }

    Some(ext)
}

/// Report images on local disk, addressed by `uploads/<uuid>.<ext>`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    base_path: PathBuf,
    max_size: usize,
}

impl ImageStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, ImageError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ImageError::Io(format!(
                "Failed to create upload directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Image store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Write an uploaded image and return the relative URL to record on the
    /// report.
    pub async fn store_image(
        &self,
        data: &[u8],
        file_name: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<String, ImageError> {
        let ext = accepted_extension(file_name, content_type).ok_or(ImageError::Unsupported)?;
        if data.is_empty() {
            return Err(ImageError::Empty);
        }
        if data.len() > self.max_size {
            return Err(ImageError::TooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let name = format!("{}.{}", Uuid::new_v4(), ext);
        let path = ensure_within(&self.base_path, &name)?;

        fs::write(&path, data)
            .await
            .map_err(|e| ImageError::Io(format!("Failed to write {name}: {e}")))?;

        debug!(file = %name, size = data.len(), "Stored image");
        Ok(format!("{UPLOADS_URL_PREFIX}/{name}"))
    }

    /// Remove the file behind a recorded image URL. Returns `false` when the
    /// file was already gone.
    pub async fn delete_image(&self, image_url: &str) -> Result<bool, ImageError> {
        let path = self.path_for(image_url)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(url = %image_url, "Deleted image");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ImageError::Io(format!("Failed to delete {image_url}: {e}"))),
        }
    }

    fn path_for(&self, image_url: &str) -> Result<PathBuf, ImageError> {
        let name = image_url
            .strip_prefix(UPLOADS_URL_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or(ImageError::Traversal)?;
        ensure_within(&self.base_path, name)
    }
}
