// Video utility endpoints: frame extraction and avatar generation from a
// source image.

use crate::error::{ApiError, PipelineError};
use crate::models::api::{ExtractFrameResponse, GenerateAvatarRequest};
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Extension, Multipart},
    http::header,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use std::sync::Arc;

pub fn video_routes() -> Router {
    Router::new()
        .route("/video/extract-frame", post(extract_frame))
        .route("/video/generate-avatar", post(generate_avatar))
        .layer(DefaultBodyLimit::max(500 * 1024 * 1024))
}

/// Extract the first frame of an uploaded video as a JPEG.
pub async fn extract_frame(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ExtractFrameResponse>, ApiError> {
    let mut video: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PipelineError::invalid(format!("invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let content_type = field.content_type().unwrap_or_default().to_string();
            if !content_type.starts_with("video/") {
                return Err(PipelineError::invalid("file provided is not a video").into());
            }
            let file_name = field.file_name().unwrap_or("video.mp4").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| PipelineError::invalid(format!("failed to read video file: {}", e)))?;
            video = Some((bytes.to_vec(), file_name));
        }
    }

    let (bytes, file_name) = video.ok_or_else(|| PipelineError::invalid("missing 'file' in form data"))?;
    let frame_url = state.cloudconvert_client.extract_frame(bytes, &file_name).await?;
    Ok(Json(ExtractFrameResponse { frame_url }))
}

/// Generate an avatar from a source image URL; streams the image back.
pub async fn generate_avatar(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<GenerateAvatarRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let image = state.stability_client.image_to_avatar(&payload.image_url).await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], image))
}
