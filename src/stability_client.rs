// Hugging Face Inference API client for Stable Diffusion XL.
// Renders avatar images either from a text description or from a source
// image fetched by URL. Responses are the raw image bytes.

use crate::error::PipelineError;
use crate::pipeline::providers::RenderAvatar;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const SDXL_MODEL_URL: &str =
    "https://api-inference.huggingface.co/models/stabilityai/stable-diffusion-xl-base-1.0";

#[derive(Clone)]
pub struct StabilityClient {
    api_key: String,
    client: Client,
    model_url: String,
}

impl StabilityClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
            model_url: SDXL_MODEL_URL.to_string(),
        }
    }

    /// Generate an avatar image from a text description.
    pub async fn text_to_image(&self, description: &str) -> Result<Vec<u8>, PipelineError> {
        let response = self
            .client
            .post(&self.model_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({ "inputs": description }))
            .send()
            .await
            .map_err(|e| PipelineError::transport("hugging-face", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::upstream("hugging-face", Some(status), error_text));
        }

        let image_bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::transport("hugging-face", e))?;
        Ok(image_bytes.to_vec())
    }

    /// Generate an avatar from a source image: fetch the image by URL,
    /// then feed the bytes through the model.
    pub async fn image_to_avatar(&self, image_url: &str) -> Result<Vec<u8>, PipelineError> {
        if image_url.trim().is_empty() {
            return Err(PipelineError::invalid("missing 'image_url'"));
        }

        let source = self
            .client
            .get(image_url)
            .send()
            .await
            .map_err(|e| PipelineError::transport("hugging-face", e))?;

        if !source.status().is_success() {
            let status = source.status().as_u16();
            return Err(PipelineError::upstream(
                "hugging-face",
                Some(status),
                format!("failed to download source image from {}", image_url),
            ));
        }

        let image_bytes = source
            .bytes()
            .await
            .map_err(|e| PipelineError::transport("hugging-face", e))?;

        let response = self
            .client
            .post(&self.model_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .body(image_bytes.to_vec())
            .send()
            .await
            .map_err(|e| PipelineError::transport("hugging-face", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::upstream("hugging-face", Some(status), error_text));
        }

        let avatar_bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::transport("hugging-face", e))?;
        Ok(avatar_bytes.to_vec())
    }
}

#[async_trait]
impl RenderAvatar for StabilityClient {
    async fn render(&self, description: &str) -> Result<Vec<u8>, PipelineError> {
        self.text_to_image(description).await
    }
}
