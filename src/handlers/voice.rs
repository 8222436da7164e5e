// Voice endpoints: clone a voice model from reference audio and
// synthesize speech with it.

use crate::error::{ApiError, PipelineError};
use crate::models::api::{CloneVoiceResponse, GenerateSpeechRequest};
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Extension, Multipart},
    http::header,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use std::sync::Arc;

pub fn voice_routes() -> Router {
    Router::new()
        .route("/voice/clone-voice", post(clone_voice))
        .route("/voice/generate-speech", post(generate_speech))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
}

/// Create a new voice model from an uploaded audio file.
pub async fn clone_voice(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<CloneVoiceResponse>, ApiError> {
    let mut audio: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PipelineError::invalid(format!("invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let content_type = field.content_type().unwrap_or_default().to_string();
            if !content_type.starts_with("audio/") {
                return Err(PipelineError::invalid("file provided is not an audio file").into());
            }
            let bytes = field
                .bytes()
                .await
                .map_err(|e| PipelineError::invalid(format!("failed to read audio file: {}", e)))?;
            audio = Some(bytes.to_vec());
        }
    }

    let audio = audio.ok_or_else(|| PipelineError::invalid("missing 'file' in form data"))?;
    let voice_id = state.fish_audio_client.clone_voice(audio).await?;
    Ok(Json(CloneVoiceResponse { voice_id }))
}

/// Synthesize speech and stream the audio bytes back.
pub async fn generate_speech(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<GenerateSpeechRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let audio = state
        .fish_audio_client
        .generate_speech(&payload.text, &payload.voice_id)
        .await?;
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio))
}
