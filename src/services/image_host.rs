//! Image host gateway.
//!
//! Wraps the external image-hosting service: multipart upload, deletion of
//! the most recent upload, and accessors for the last upload's metadata. The
//! host exposes single-slot "last upload" semantics: the delete link and
//! thumbnail always refer to the most recently uploaded image.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};

/// Response body of a successful upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub code: u16,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub del: String,
    #[serde(default)]
    pub thumb: String,
    #[serde(default, rename = "srcName")]
    pub src_name: String,
    #[serde(default)]
    pub message: String,
}

/// Abstraction over the image-hosting service.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload a local image file, returning its rehosted URL.
    async fn upload(&self, path: &Path) -> Result<String>;

    /// Delete the most recently uploaded image, returning the HTTP status.
    async fn delete_last(&self) -> Result<u16>;
}

/// HTTP gateway to the image bed service.
pub struct ImageBed {
    client: reqwest::Client,
    api_url: String,
    token: String,
    last_upload: Mutex<Option<UploadResponse>>,
}

impl ImageBed {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            token: token.into(),
            last_upload: Mutex::new(None),
        }
    }

    /// Thumbnail URL of the last successful upload.
    pub async fn last_thumb(&self) -> Option<String> {
        let last = self.last_upload.lock().await;
        last.as_ref()
            .map(|r| r.thumb.clone())
            .filter(|t| !t.is_empty())
    }

    /// Original filename of the last successful upload.
    pub async fn last_source_name(&self) -> Option<String> {
        let last = self.last_upload.lock().await;
        last.as_ref()
            .map(|r| r.src_name.clone())
            .filter(|n| !n.is_empty())
    }
}

#[async_trait]
impl ImageHost for ImageBed {
    async fn upload(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.png".to_string());

        let form = reqwest::multipart::Form::new()
            .part(
                "image",
                reqwest::multipart::Part::bytes(bytes).file_name(filename),
            )
            .text("token", self.token.clone());

        let response = self.client.post(&self.api_url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::remote(&self.api_url, status.as_u16()));
        }

        let result: UploadResponse = response.json().await?;
        if result.code != 200 {
            let reason = if result.message.is_empty() {
                format!("code {}", result.code)
            } else {
                result.message.clone()
            };
            return Err(AppError::upload(reason));
        }

        let url = result.url.clone();
        *self.last_upload.lock().await = Some(result);
        Ok(url)
    }

    async fn delete_last(&self) -> Result<u16> {
        let del_url = {
            let last = self.last_upload.lock().await;
            last.as_ref()
                .map(|r| r.del.clone())
                .filter(|d| !d.is_empty())
                .ok_or_else(|| AppError::upload("no delete link, nothing uploaded yet"))?
        };

        let response = self.client.get(&del_url).send().await?;
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_response_parses_host_shape() {
        let json = r#"{
            "code": 200,
            "url": "http://img.example.com/a.png",
            "del": "http://img.example.com/del/a",
            "thumb": "http://img.example.com/t/a.png",
            "srcName": "a.png"
        }"#;
        let parsed: UploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.code, 200);
        assert_eq!(parsed.src_name, "a.png");
        assert!(parsed.message.is_empty());
    }

    #[tokio::test]
    async fn delete_without_upload_fails() {
        let bed = ImageBed::new("http://127.0.0.1:1/api", "token");
        let err = bed.delete_last().await.unwrap_err();
        assert!(matches!(err, AppError::Upload(_)));
    }

    #[tokio::test]
    async fn accessors_empty_before_upload() {
        let bed = ImageBed::new("http://127.0.0.1:1/api", "token");
        assert!(bed.last_thumb().await.is_none());
        assert!(bed.last_source_name().await.is_none());
    }
}
