// Transient public hosting via tmpfiles.org. The animation provider can
// only fetch media over public URLs, so avatar and audio bytes are parked
// here for the lifetime of one render.

use crate::error::PipelineError;
use crate::pipeline::providers::HostMedia;
use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Clone)]
pub struct TmpFilesClient {
    client: Client,
    upload_url: String,
}

#[derive(Deserialize, Debug)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Deserialize, Debug)]
struct UploadData {
    url: String,
}

impl TmpFilesClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
            upload_url: "https://tmpfiles.org/api/v1/upload".to_string(),
        }
    }

    /// Upload bytes and return a directly-fetchable URL.
    pub async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::invalid("cannot host an empty file"));
        }

        let part = multipart::Part::bytes(bytes)
            .file_name("file")
            .mime_str(content_type)
            .map_err(|e| PipelineError::upstream("tmpfiles", None, e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::transport("tmpfiles", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::upstream("tmpfiles", Some(status), error_text));
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::upstream("tmpfiles", None, format!("unparseable response: {}", e)))?;

        Ok(direct_url(&upload.data.url))
    }
}

impl Default for TmpFilesClient {
    fn default() -> Self {
        Self::new()
    }
}

/// The API returns a landing-page URL; the direct download lives under
/// the `/dl/` path.
fn direct_url(page_url: &str) -> String {
    if page_url.contains("tmpfiles.org/dl/") {
        return page_url.to_string();
    }
    page_url.replacen("tmpfiles.org/", "tmpfiles.org/dl/", 1)
}

#[async_trait]
impl HostMedia for TmpFilesClient {
    async fn host(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, PipelineError> {
        self.upload(bytes, content_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landing_url_is_rewritten_to_direct() {
        assert_eq!(
            direct_url("https://tmpfiles.org/12345/voice.mp3"),
            "https://tmpfiles.org/dl/12345/voice.mp3"
        );
    }

    #[test]
    fn direct_url_is_left_alone() {
        assert_eq!(
            direct_url("https://tmpfiles.org/dl/12345/voice.mp3"),
            "https://tmpfiles.org/dl/12345/voice.mp3"
        );
    }
}
