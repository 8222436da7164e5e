// OpenAI chat-completions client used as the script generator.
//
// The model is asked for JSON `{script, avatar_description}`. When the
// content comes back malformed, we degrade instead of failing: the raw
// content becomes the script and the original prompt the description.
// Known tradeoff: the fallback can silently mask prompt-formatting bugs.

use crate::error::PipelineError;
use crate::pipeline::providers::{GenerateScript, GeneratedScript};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are an AI assistant that generates a short video script and a \
     visual description for an avatar image, based on a user's prompt. \
     Respond in JSON with 'script' and 'avatar_description'.";

#[derive(Clone)]
pub struct OpenAiClient {
    api_key: Option<String>,
    client: Client,
    base_url: String,
}

#[derive(Serialize, Debug)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize, Debug)]
struct ChatCompletionRequest {
    model: &'static str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ScriptPayload {
    script: String,
    avatar_description: String,
}

impl OpenAiClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub async fn generate_script(&self, prompt: &str) -> Result<GeneratedScript, PipelineError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| PipelineError::upstream("openai", None, "OPENAI_API_KEY not configured"))?;

        let url = format!("{}/chat/completions", self.base_url);
        let request_body = ChatCompletionRequest {
            model: "gpt-3.5-turbo",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            max_tokens: 400,
            temperature: 0.7,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| PipelineError::transport("openai", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::upstream("openai", Some(status), error_text));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::upstream("openai", None, format!("unparseable response: {}", e)))?;

        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| PipelineError::upstream("openai", None, "completion had no choices"))?;

        Ok(parse_script_content(&content, prompt))
    }
}

/// Parse the model's content as `{script, avatar_description}` JSON,
/// degrading to the raw text + original prompt when it is not.
fn parse_script_content(content: &str, prompt: &str) -> GeneratedScript {
    match serde_json::from_str::<ScriptPayload>(content.trim()) {
        Ok(payload) => GeneratedScript {
            script: payload.script,
            avatar_description: payload.avatar_description,
        },
        Err(_) => {
            tracing::warn!("script generator returned non-JSON content, using raw text as script");
            GeneratedScript {
                script: content.to_string(),
                avatar_description: prompt.to_string(),
            }
        }
    }
}

#[async_trait]
impl GenerateScript for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<GeneratedScript, PipelineError> {
        self.generate_script(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_content_is_parsed() {
        let content = r#"{"script": "Hello there.", "avatar_description": "A friendly robot"}"#;
        let generated = parse_script_content(content, "make a robot video");
        assert_eq!(generated.script, "Hello there.");
        assert_eq!(generated.avatar_description, "A friendly robot");
    }

    #[test]
    fn malformed_content_degrades_to_raw_text() {
        let content = "Here is your script: Hello there.";
        let generated = parse_script_content(content, "make a robot video");
        assert_eq!(generated.script, content);
        assert_eq!(generated.avatar_description, "make a robot video");
    }

    #[test]
    fn json_missing_fields_also_degrades() {
        let content = r#"{"script": "only a script"}"#;
        let generated = parse_script_content(content, "the prompt");
        assert_eq!(generated.script, content);
        assert_eq!(generated.avatar_description, "the prompt");
    }
}
