use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use axum::extract::{FromRequest, Multipart, Request};
use tempfile::TempPath;

use crate::error::AppError;
use crate::state::AppState;

/// A multipart file part spooled to local disk. Dropping it deletes the file.
#[derive(Debug)]
pub struct TempUpload {
    path: TempPath,
    pub file_name: Option<String>,
}

impl TempUpload {
    pub fn new(path: TempPath, file_name: Option<String>) -> Self {
        Self {
            path,
            file_name,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remove(self) -> std::io::Result<()> {
        self.path.close()
    }
}

/// Parsed multipart body: text fields plus spooled file parts.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, TempUpload>,
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {}", err.body_text()))
}

fn spool_error(err: std::io::Error) -> AppError {
    AppError::Internal(format!("Failed to spool upload: {err}"))
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart, temp_dir: &Path) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(temp_dir)
            .await
            .map_err(spool_error)?;

        let mut form = UploadForm::default();

        while let Some(mut field) = multipart.next_field().await.map_err(bad_multipart)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let text = field.text().await.map_err(bad_multipart)?;
                form.fields.insert(name, text);
                continue;
            };

            let suffix = Path::new(&file_name)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{e}"))
                .unwrap_or_default();
            let mut file = tempfile::Builder::new()
                .prefix("upload-")
                .suffix(&suffix)
                .tempfile_in(temp_dir)
                .map_err(spool_error)?;

            let mut size = 0u64;
            while let Some(chunk) = field.chunk().await.map_err(bad_multipart)? {
                file.write_all(&chunk).map_err(spool_error)?;
                size += chunk.len() as u64;
            }

            // An empty file input counts as not provided
            if size == 0 {
                continue;
            }

            tracing::debug!("Spooled upload field {} ({} bytes)", name, size);
            form.files.insert(
                name,
                TempUpload::new(file.into_temp_path(), Some(file_name)),
            );
        }

        Ok(form)
    }

    /// Trimmed text field, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<TempUpload> {
        self.files.remove(name)
    }
}

impl FromRequest<AppState> for UploadForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        Self::read(multipart, &state.config.temp_uploads_path()).await
    }
}
