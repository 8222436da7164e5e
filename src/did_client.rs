// D-ID talking-head client: create a talk from an avatar image URL and an
// audio URL, then look up its render status by talk id.
// Docs: https://docs.d-id.com

use crate::error::PipelineError;
use crate::pipeline::providers::{AnimateTalk, TalkStatus};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

#[derive(Clone)]
pub struct DidClient {
    auth_header: String,
    client: Client,
    base_url: String,
}

#[derive(Serialize, Debug)]
struct CreateTalkRequest {
    source_url: String,
    script: TalkScript,
}

#[derive(Serialize, Debug)]
struct TalkScript {
    #[serde(rename = "type")]
    kind: &'static str,
    audio_url: String,
}

#[derive(Deserialize, Debug)]
struct CreateTalkResponse {
    id: String,
}

#[derive(Deserialize, Debug)]
pub struct TalkStatusResponse {
    pub status: String,
    #[serde(default)]
    pub result: Option<TalkResult>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Deserialize, Debug)]
pub struct TalkResult {
    pub url: Option<String>,
}

impl DidClient {
    pub fn new(api_key: String) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(api_key.as_bytes());
        Self {
            auth_header: format!("Basic {}", encoded),
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: "https://api.d-id.com".to_string(),
        }
    }

    /// Submit a new talk. Both URLs must be resolvable by D-ID.
    pub async fn create_talk(&self, avatar_url: &str, audio_url: &str) -> Result<String, PipelineError> {
        if avatar_url.trim().is_empty() || audio_url.trim().is_empty() {
            return Err(PipelineError::invalid(
                "missing 'avatar_url' or 'audio_url' in request body",
            ));
        }

        let url = format!("{}/talks", self.base_url);
        let request_body = CreateTalkRequest {
            source_url: avatar_url.to_string(),
            script: TalkScript {
                kind: "audio",
                audio_url: audio_url.to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .header("accept", "application/json")
            .header("authorization", &self.auth_header)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| PipelineError::transport("d-id", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::upstream("d-id", Some(status), error_text));
        }

        let talk: CreateTalkResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::upstream("d-id", None, format!("unparseable response: {}", e)))?;
        Ok(talk.id)
    }

    /// Fetch the raw status payload for a talk. The status endpoint passes
    /// this through untouched; the pipeline goes through `status()` below.
    pub async fn get_talk(&self, talk_id: &str) -> Result<Value, PipelineError> {
        let url = format!("{}/talks/{}", self.base_url, talk_id);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .header("authorization", &self.auth_header)
            .send()
            .await
            .map_err(|e| PipelineError::transport("d-id", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::upstream("d-id", Some(status), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| PipelineError::upstream("d-id", None, format!("unparseable response: {}", e)))
    }
}

/// Map D-ID's status strings onto the pipeline's terminal/pending model.
pub fn classify_talk(payload: &TalkStatusResponse) -> TalkStatus {
    match payload.status.as_str() {
        "done" => match payload.result.as_ref().and_then(|r| r.url.clone()) {
            Some(url) => TalkStatus::Done { result_url: url },
            None => TalkStatus::Error {
                message: "talk reported done but carried no result URL".to_string(),
            },
        },
        "error" | "rejected" => TalkStatus::Error {
            message: payload
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "animation render failed".to_string()),
        },
        _ => TalkStatus::Pending,
    }
}

#[async_trait]
impl AnimateTalk for DidClient {
    async fn submit(&self, avatar_url: &str, audio_url: &str) -> Result<String, PipelineError> {
        self.create_talk(avatar_url, audio_url).await
    }

    async fn status(&self, talk_id: &str) -> Result<TalkStatus, PipelineError> {
        let raw = self.get_talk(talk_id).await?;
        let payload: TalkStatusResponse = serde_json::from_value(raw)
            .map_err(|e| PipelineError::upstream("d-id", None, format!("unparseable status payload: {}", e)))?;
        Ok(classify_talk(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: serde_json::Value) -> TalkStatusResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn done_with_result_url_is_terminal() {
        let status = classify_talk(&payload(serde_json::json!({
            "status": "done",
            "result": { "url": "https://d-id.example/talk.mp4" }
        })));
        assert_eq!(
            status,
            TalkStatus::Done {
                result_url: "https://d-id.example/talk.mp4".to_string()
            }
        );
    }

    #[test]
    fn done_without_result_url_is_an_error() {
        let status = classify_talk(&payload(serde_json::json!({ "status": "done" })));
        assert!(matches!(status, TalkStatus::Error { .. }));
    }

    #[test]
    fn created_and_started_are_pending() {
        for s in ["created", "started"] {
            let status = classify_talk(&payload(serde_json::json!({ "status": s })));
            assert_eq!(status, TalkStatus::Pending);
        }
    }

    #[test]
    fn rejected_carries_the_provider_error() {
        let status = classify_talk(&payload(serde_json::json!({
            "status": "rejected",
            "error": { "kind": "ValidationError", "description": "face not detected" }
        })));
        match status {
            TalkStatus::Error { message } => assert!(message.contains("face not detected")),
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_urls_rejected_before_submission() {
        let client = DidClient::new("user:pass".to_string());
        let err = client.create_talk("", "https://a.example/audio.mp3").await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }
}
