use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{MediaError, MediaKind, MediaStore, StoredMedia};

/// Stores media on local disk and serves it back from `/media/{name}`.
pub struct LocalMediaStore {
    root: PathBuf,
    public_url: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, public_url: String) -> std::io::Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    fn name_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        let name = url
            .strip_prefix(&self.public_url)?
            .strip_prefix("/media/")?;
        let valid = !name.is_empty()
            && !name.contains('/')
            && !name.contains('\\')
            && !name.starts_with('.');
        valid.then_some(name)
    }
}

fn extension_of(file: &Path, file_name: Option<&str>) -> Option<String> {
    file_name
        .map(Path::new)
        .and_then(|p| p.extension())
        .or_else(|| file.extension())
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn upload(
        &self,
        file: &Path,
        file_name: Option<&str>,
        _kind: MediaKind,
    ) -> Result<StoredMedia, MediaError> {
        let id = uuid::Uuid::now_v7().to_string();
        let name = match extension_of(file, file_name) {
            Some(ext) => format!("{id}.{ext}"),
            None => id,
        };

        let bytes = tokio::fs::copy(file, self.root.join(&name)).await?;
        tracing::debug!("Stored {} ({} bytes)", name, bytes);

        Ok(StoredMedia {
            url: format!("{}/media/{}", self.public_url, name),
            duration: None,
        })
    }

    async fn delete(&self, url: &str) -> Result<(), MediaError> {
        let name = self
            .name_from_url(url)
            .ok_or_else(|| MediaError::UnknownUrl(url.to_string()))?;
        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_keeps_extension_and_delete_removes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(tmp.path().join("media"), "http://host/".into()).unwrap();
        let src = tmp.path().join("upload-abc");
        std::fs::write(&src, b"png").unwrap();

        let stored = store
            .upload(&src, Some("Avatar.PNG"), MediaKind::Image)
            .await
            .unwrap();
        assert!(stored.url.starts_with("http://host/media/"));
        assert!(stored.url.ends_with(".png"));
        assert_eq!(stored.duration, None);

        let name = stored.url.rsplit('/').next().unwrap();
        assert!(tmp.path().join("media").join(name).exists());

        store.delete(&stored.url).await.unwrap();
        assert!(!tmp.path().join("media").join(name).exists());
        // Deleting twice is fine
        store.delete(&stored.url).await.unwrap();
    }

    #[tokio::test]
    async fn delete_rejects_foreign_or_traversal_urls() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(tmp.path().to_path_buf(), "http://host".into()).unwrap();
        assert!(store.delete("http://elsewhere/media/x.png").await.is_err());
        assert!(store.delete("http://host/media/../secret").await.is_err());
        assert!(store.delete("http://host/media/").await.is_err());
    }
}
