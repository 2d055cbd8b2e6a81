pub mod cloudinary;
pub mod local;
pub mod upload;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{Config, MediaProvider};

pub use upload::{TempUpload, UploadForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// What the media host hands back for a stored file.
#[derive(Debug, Clone, Serialize)]
pub struct StoredMedia {
    pub url: String,
    /// Playback length in seconds, when the host can derive it.
    pub duration: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Media host rejected upload: status={status}, body={body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid media host response: {0}")]
    InvalidResponse(String),

    #[error("Unknown media url: {0}")]
    UnknownUrl(String),
}

/// External "store bytes, return URL" service.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(
        &self,
        file: &Path,
        file_name: Option<&str>,
        kind: MediaKind,
    ) -> Result<StoredMedia, MediaError>;

    async fn delete(&self, url: &str) -> Result<(), MediaError>;
}

/// Push a spooled upload to the store. The local temp file is removed before
/// returning, whether the upload succeeded or not.
pub async fn store_temp_file(
    store: &dyn MediaStore,
    upload: TempUpload,
    kind: MediaKind,
) -> Result<StoredMedia, MediaError> {
    let result = store
        .upload(upload.path(), upload.file_name.as_deref(), kind)
        .await;

    if let Err(e) = upload.remove() {
        tracing::warn!("Failed to remove temp upload: {}", e);
    }

    result
}

/// Best-effort removal of an asset that is no longer referenced.
pub async fn discard(store: &dyn MediaStore, url: &str) {
    if let Err(e) = store.delete(url).await {
        tracing::warn!("Failed to delete media {}: {}", url, e);
    }
}

/// Pass `result` through, discarding the freshly stored `urls` when it is an
/// error so a failed write does not leave unreferenced assets behind.
pub async fn discard_on_error<T, E>(
    store: &dyn MediaStore,
    urls: &[&str],
    result: Result<T, E>,
) -> Result<T, E> {
    if result.is_err() {
        for url in urls {
            discard(store, url).await;
        }
    }
    result
}

pub fn from_config(config: &Config) -> anyhow::Result<Arc<dyn MediaStore>> {
    let store: Arc<dyn MediaStore> = match config.media.provider {
        MediaProvider::Local => Arc::new(local::LocalMediaStore::new(
            config.uploads_path(),
            config.public_url(),
        )?),
        MediaProvider::Cloudinary => Arc::new(cloudinary::CloudinaryMediaStore::new(
            &config.media.cloudinary,
        )?),
    };
    Ok(store)
}
