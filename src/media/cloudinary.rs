use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sha1::{Digest, Sha1};

use super::{MediaError, MediaKind, MediaStore, StoredMedia};
use crate::config::CloudinaryConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Signed uploads to Cloudinary's REST API.
pub struct CloudinaryMediaStore {
    client: Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    bytes: u64,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Cloudinary request signature: params sorted by key, joined as a query
/// string, the API secret appended, then SHA-1 hex encoded.
pub fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let payload = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(payload.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Split a delivery URL such as
/// `https://res.cloudinary.com/demo/video/upload/v1712/folder/clip.mp4`
/// into `("video", "folder/clip")`.
pub fn parse_delivery_url(url: &str) -> Option<(&str, &str)> {
    let (head, tail) = url.split_once("/upload/")?;
    let resource_type = head.rsplit('/').next().filter(|s| !s.is_empty())?;

    let tail = match tail.split_once('/') {
        Some((version, rest))
            if version.len() > 1
                && version.starts_with('v')
                && version[1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            rest
        }
        _ => tail,
    };

    let public_id = match tail.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('/') => stem,
        _ => tail,
    };

    (!public_id.is_empty()).then_some((resource_type, public_id))
}

impl CloudinaryMediaStore {
    pub fn new(config: &CloudinaryConfig) -> Result<Self, MediaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            client,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    async fn post(&self, url: String, form: Form) -> Result<String, MediaError> {
        let response = self.client.post(url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl MediaStore for CloudinaryMediaStore {
    async fn upload(
        &self,
        file: &Path,
        file_name: Option<&str>,
        kind: MediaKind,
    ) -> Result<StoredMedia, MediaError> {
        let bytes = tokio::fs::read(file).await?;
        let name = file_name
            .map(str::to_string)
            .or_else(|| file.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .unwrap_or_else(|| "upload".to_string());
        let mime = mime_guess::from_path(&name).first_or_octet_stream();

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(&[("timestamp", timestamp.as_str())], &self.api_secret);

        let form = Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .part(
                "file",
                Part::bytes(bytes).file_name(name).mime_str(mime.as_ref())?,
            );

        let resource_type = match kind {
            MediaKind::Image => "image",
            MediaKind::Video => "auto",
        };
        let url = format!("{API_BASE}/{}/{resource_type}/upload", self.cloud_name);
        let body = self.post(url, form).await?;

        let parsed: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| MediaError::InvalidResponse(e.to_string()))?;
        tracing::info!(public_id = %parsed.public_id, bytes = parsed.bytes, "Uploaded to cloudinary");

        Ok(StoredMedia {
            url: parsed.secure_url,
            duration: parsed.duration,
        })
    }

    async fn delete(&self, url: &str) -> Result<(), MediaError> {
        let (resource_type, public_id) =
            parse_delivery_url(url).ok_or_else(|| MediaError::UnknownUrl(url.to_string()))?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );

        let form = Form::new()
            .text("public_id", public_id.to_string())
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let endpoint = format!("{API_BASE}/{}/{resource_type}/destroy", self.cloud_name);
        let body = self.post(endpoint, form).await?;
        let parsed: DestroyResponse = serde_json::from_str(&body)
            .map_err(|e| MediaError::InvalidResponse(e.to_string()))?;

        match parsed.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(MediaError::InvalidResponse(format!(
                "unexpected destroy result: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_documented_example() {
        let signature = sign(
            &[
                ("timestamp", "1315060510"),
                ("public_id", "sample_image"),
                ("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop"),
            ],
            "abcd",
        );
        assert_eq!(signature, "bfd09f95f331f558cbd1320e67aa8d488770583e");
    }

    #[test]
    fn signature_is_order_independent() {
        let a = sign(&[("a", "1"), ("b", "2")], "s");
        let b = sign(&[("b", "2"), ("a", "1")], "s");
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
    }

    #[test]
    fn parses_versioned_delivery_url() {
        assert_eq!(
            parse_delivery_url("https://res.cloudinary.com/demo/video/upload/v1712/folder/clip.mp4"),
            Some(("video", "folder/clip"))
        );
    }

    #[test]
    fn parses_unversioned_delivery_url() {
        assert_eq!(
            parse_delivery_url("https://res.cloudinary.com/demo/image/upload/avatar.png"),
            Some(("image", "avatar"))
        );
    }

    #[test]
    fn rejects_non_cloudinary_url() {
        assert_eq!(parse_delivery_url("http://localhost/media/x.png"), None);
    }
}
