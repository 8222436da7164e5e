// Animation endpoints: host media for the animator, submit a talk, and
// poll a talk's render status.

use crate::error::{ApiError, PipelineError};
use crate::models::api::{AnimateRequest, AnimateResponse, UploadForAnimationResponse};
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Extension, Multipart, Path},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::sync::Arc;

pub fn animation_routes() -> Router {
    Router::new()
        .route("/animation/upload-for-animation", post(upload_for_animation))
        .route("/animation/animate", post(animate))
        .route("/animation/talks/:talk_id", get(get_animation_status))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
}

/// Upload avatar and audio files to transient hosting and return public
/// URLs the animation provider can fetch.
pub async fn upload_for_animation(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadForAnimationResponse>, ApiError> {
    let mut avatar: Option<(Vec<u8>, String)> = None;
    let mut audio: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PipelineError::invalid(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| PipelineError::invalid(format!("failed to read '{}': {}", name, e)))?;

        match name.as_str() {
            "avatar" => avatar = Some((bytes.to_vec(), content_type)),
            "audio" => audio = Some((bytes.to_vec(), content_type)),
            _ => {}
        }
    }

    let (avatar_bytes, avatar_type) =
        avatar.ok_or_else(|| PipelineError::invalid("missing 'avatar' file"))?;
    let (audio_bytes, audio_type) =
        audio.ok_or_else(|| PipelineError::invalid("missing 'audio' file"))?;

    let avatar_url = state.providers.media.host(avatar_bytes, &avatar_type).await?;
    let audio_url = state.providers.media.host(audio_bytes, &audio_type).await?;

    Ok(Json(UploadForAnimationResponse { avatar_url, audio_url }))
}

/// Submit a new talking-head render.
pub async fn animate(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<AnimateRequest>,
) -> Result<Json<AnimateResponse>, ApiError> {
    let talk_id = state
        .did_client
        .create_talk(&payload.avatar_url, &payload.audio_url)
        .await?;
    Ok(Json(AnimateResponse { talk_id }))
}

/// Pass the provider's status payload through untouched.
pub async fn get_animation_status(
    Extension(state): Extension<Arc<AppState>>,
    Path(talk_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let payload = state.did_client.get_talk(&talk_id).await?;
    Ok(Json(payload))
}
