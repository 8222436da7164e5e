// YouTube Data API v3 client for publishing finished videos.
// Docs: https://developers.google.com/youtube/v3
//
// The caller supplies their own OAuth access token; this process holds no
// Google credentials of its own.

use crate::error::PipelineError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone)]
pub struct YouTubeClient {
    client: Client,
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct VideoSnippet {
    title: String,
    description: String,
    #[serde(rename = "categoryId")]
    category_id: String,
}

#[derive(Debug, Serialize)]
struct VideoStatus {
    #[serde(rename = "privacyStatus")]
    privacy_status: String,
}

#[derive(Debug, Serialize)]
struct VideoResource {
    snippet: VideoSnippet,
    status: VideoStatus,
}

#[derive(Debug, Deserialize)]
struct VideoUploadResponse {
    id: String,
}

impl YouTubeClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .unwrap_or_else(|_| Client::new()),
            upload_url: "https://www.googleapis.com/upload/youtube/v3/videos".to_string(),
        }
    }

    /// Download the video from `video_url` and publish it unlisted under
    /// the caller's account. Returns the watch URL.
    pub async fn upload_from_url(
        &self,
        access_token: &str,
        video_url: &str,
        title: &str,
        description: &str,
    ) -> Result<String, PipelineError> {
        if video_url.trim().is_empty() {
            return Err(PipelineError::invalid("missing 'video_url' in request body"));
        }
        if access_token.trim().is_empty() {
            return Err(PipelineError::invalid("missing 'access_token' in request body"));
        }

        let source = self
            .client
            .get(video_url)
            .send()
            .await
            .map_err(|e| PipelineError::transport("youtube", e))?;

        if !source.status().is_success() {
            let status = source.status().as_u16();
            return Err(PipelineError::upstream(
                "youtube",
                Some(status),
                format!("failed to download video from {}", video_url),
            ));
        }

        let video_data = source
            .bytes()
            .await
            .map_err(|e| PipelineError::transport("youtube", e))?;

        let metadata = VideoResource {
            snippet: VideoSnippet {
                title: title.to_string(),
                description: description.to_string(),
                category_id: "22".to_string(), // People & Blogs
            },
            status: VideoStatus {
                privacy_status: "unlisted".to_string(),
            },
        };
        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| PipelineError::upstream("youtube", None, e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part(
                "snippet",
                reqwest::multipart::Part::text(metadata_json)
                    .mime_str("application/json")
                    .map_err(|e| PipelineError::upstream("youtube", None, e.to_string()))?,
            )
            .part(
                "media",
                reqwest::multipart::Part::bytes(video_data.to_vec())
                    .file_name("video.mp4")
                    .mime_str("video/mp4")
                    .map_err(|e| PipelineError::upstream("youtube", None, e.to_string()))?,
            );

        let response = self
            .client
            .post(&self.upload_url)
            .query(&[("part", "snippet,status"), ("uploadType", "multipart")])
            .header("Authorization", format!("Bearer {}", access_token))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::transport("youtube", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::upstream("youtube", Some(status), error_text));
        }

        let upload: VideoUploadResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::upstream("youtube", None, format!("unparseable response: {}", e)))?;

        tracing::info!(video_id = %upload.id, "video published to YouTube");
        Ok(format!("https://youtube.com/watch?v={}", upload.id))
    }
}

impl Default for YouTubeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_fields_are_rejected_before_any_network_call() {
        let client = YouTubeClient::new();
        let err = client
            .upload_from_url("token", "", "title", "desc")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));

        let err = client
            .upload_from_url("", "https://cdn.example/v.mp4", "title", "desc")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }
}
