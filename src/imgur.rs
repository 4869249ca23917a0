//! Image hosting on Imgur.
//!
//! Uploads go through the Imgur v3 `image` endpoint with the file content
//! base64 encoded in a form body.

use async_trait::async_trait;
use base64::Engine;
use log::{debug, error};
use reqwest::Client;
use std::path::Path;

use crate::config::ImgurConfig;
use crate::oauth::build_imgur_auth_header;
use crate::pipeline::{ImageMetadata, UploadError, Uploader};
use crate::twitter::sanitize_for_logging;

const UPLOAD_URL: &str = "https://api.imgur.com/3/image";

pub struct ImgurUploader {
    client: Client,
    config: ImgurConfig,
}

impl ImgurUploader {
    pub fn new(config: ImgurConfig) -> Self {
        ImgurUploader {
            client: Client::new(),
            config,
        }
    }
}

/// Reads the image id out of an Imgur upload response.
pub(crate) fn parse_upload_id(json_response: &serde_json::Value) -> Option<String> {
    json_response
        .get("data")
        .and_then(|d| d.get("id"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

#[async_trait]
impl Uploader for ImgurUploader {
    async fn upload(&self, path: &Path, metadata: &ImageMetadata) -> Result<String, UploadError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| UploadError::Failed(format!("cannot read {}: {}", path.display(), e)))?;
        let image = base64::engine::general_purpose::STANDARD.encode(&bytes);
        debug!("Uploading {} bytes from {}", bytes.len(), path.display());

        let form = [
            ("image", image.as_str()),
            ("type", "base64"),
            ("title", metadata.title.as_str()),
            ("name", metadata.title.as_str()),
            ("description", metadata.description.as_str()),
        ];
        let auth_header =
            build_imgur_auth_header(&self.config.client_id, self.config.access_token.as_deref());

        let response = self
            .client
            .post(UPLOAD_URL)
            .header("Authorization", auth_header)
            .form(&form)
            .send()
            .await
            .map_err(|e| UploadError::Failed(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(UploadError::RateLimited);
        }

        let body = response
            .text()
            .await
            .map_err(|e| UploadError::Failed(e.to_string()))?;
        if !status.is_success() {
            error!(
                "Imgur upload failed - Status: {}: {}",
                status,
                sanitize_for_logging(&body, 200)
            );
            return Err(UploadError::Failed(format!("Imgur API error ({})", status)));
        }

        let json_response: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| UploadError::Failed(format!("malformed Imgur response: {}", e)))?;
        parse_upload_id(&json_response)
            .ok_or_else(|| UploadError::Failed("Imgur response has no image id".to_string()))
    }
}
