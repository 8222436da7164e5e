// Fish Audio client: voice cloning and text-to-speech.
// Docs: https://docs.fish.audio

use crate::error::PipelineError;
use crate::pipeline::providers::SynthesizeSpeech;
use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone)]
pub struct FishAudioClient {
    api_key: String,
    client: Client,
    base_url: String,
}

#[derive(Serialize, Debug)]
struct TtsRequest {
    text: String,
    reference_id: String,
}

#[derive(Deserialize, Debug)]
struct CreateModelResponse {
    #[serde(rename = "_id")]
    id: String,
}

impl FishAudioClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: "https://api.fish.audio".to_string(),
        }
    }

    /// Create a voice model from reference audio. Returns the new voice id.
    pub async fn clone_voice(&self, audio: Vec<u8>) -> Result<String, PipelineError> {
        if audio.is_empty() {
            return Err(PipelineError::invalid("audio file is empty"));
        }

        let url = format!("{}/model", self.base_url);
        let form = multipart::Form::new()
            .text("title", "Generated User Voice")
            .text("train_mode", "fast")
            .part(
                "voices",
                multipart::Part::bytes(audio)
                    .file_name("reference.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| PipelineError::upstream("fish-audio", None, e.to_string()))?,
            );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::transport("fish-audio", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::upstream("fish-audio", Some(status), error_text));
        }

        let model: CreateModelResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::upstream("fish-audio", None, format!("unparseable response: {}", e)))?;
        Ok(model.id)
    }

    /// Synthesize speech for `text` with a cloned or stock voice.
    /// Both fields are validated before any network call.
    pub async fn generate_speech(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::invalid("missing 'text' in request body"));
        }
        if voice_id.trim().is_empty() {
            return Err(PipelineError::invalid("missing 'voice_id' in request body"));
        }

        let url = format!("{}/v1/tts", self.base_url);
        let request_body = TtsRequest {
            text: text.to_string(),
            reference_id: voice_id.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| PipelineError::transport("fish-audio", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::upstream("fish-audio", Some(status), error_text));
        }

        let audio_bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::transport("fish-audio", e))?;
        Ok(audio_bytes.to_vec())
    }
}

#[async_trait]
impl SynthesizeSpeech for FishAudioClient {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, PipelineError> {
        self.generate_speech(text, voice_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_text_is_rejected_before_any_network_call() {
        let client = FishAudioClient::new("test-key".to_string());
        let err = client.generate_speech("", "abc").await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert!(err.to_string().contains("text"));
    }

    #[tokio::test]
    async fn empty_voice_id_is_rejected() {
        let client = FishAudioClient::new("test-key".to_string());
        let err = client.generate_speech("Hello world", " ").await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert!(err.to_string().contains("voice_id"));
    }
}
