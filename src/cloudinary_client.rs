// Cloudinary client: re-host an ephemeral video URL to durable storage.
// Uses the signed upload API with a SHA-256 signature over the sorted
// parameters. Uploads land in the `generated_content` folder.

use crate::error::PipelineError;
use crate::pipeline::providers::PublishVideo;
use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;

const UPLOAD_FOLDER: &str = "generated_content";

#[derive(Clone)]
pub struct CloudinaryClient {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    client: Client,
}

#[derive(Deserialize, Debug)]
struct UploadResponse {
    secure_url: String,
}

impl CloudinaryClient {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            cloud_name,
            api_key,
            api_secret,
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Upload a video into Cloudinary from a public URL and return the
    /// durable `secure_url`.
    pub async fn upload_video(&self, video_url: &str) -> Result<String, PipelineError> {
        if video_url.trim().is_empty() {
            return Err(PipelineError::invalid("missing 'video_url' in request body"));
        }

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("folder", UPLOAD_FOLDER), ("timestamp", &timestamp)]);

        let form = multipart::Form::new()
            .text("file", video_url.to_string())
            .text("folder", UPLOAD_FOLDER)
            .text("timestamp", timestamp)
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let url = format!(
            "https://api.cloudinary.com/v1_1/{}/video/upload",
            self.cloud_name
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::transport("cloudinary", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::upstream("cloudinary", Some(status), error_text));
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::upstream("cloudinary", None, format!("unparseable response: {}", e)))?;
        Ok(upload.secure_url)
    }

    /// SHA-256 signature over `key=value` pairs sorted by key, with the
    /// API secret appended, hex-encoded.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by_key(|&(k, _)| k);
        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl PublishVideo for CloudinaryClient {
    async fn publish(&self, video_url: &str) -> Result<String, PipelineError> {
        self.upload_video(video_url).await
    }
}

/// Stands in when Cloudinary credentials are absent; every publish is a
/// call-time upstream error, never a silent success.
pub struct UnconfiguredPublisher;

#[async_trait]
impl PublishVideo for UnconfiguredPublisher {
    async fn publish(&self, _video_url: &str) -> Result<String, PipelineError> {
        Err(PipelineError::upstream(
            "cloudinary",
            None,
            "Cloudinary credentials not configured",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_stable_over_param_order() {
        let client = CloudinaryClient::new("demo".into(), "key".into(), "secret".into());
        let a = client.sign(&[("folder", "generated_content"), ("timestamp", "1700000000")]);
        let b = client.sign(&[("timestamp", "1700000000"), ("folder", "generated_content")]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64); // hex-encoded sha256
    }

    #[tokio::test]
    async fn empty_url_is_invalid_input() {
        let client = CloudinaryClient::new("demo".into(), "key".into(), "secret".into());
        let err = client.upload_video("").await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }
}
