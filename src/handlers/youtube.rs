// Publish a finished video to YouTube with a caller-supplied OAuth
// access token.

use crate::error::ApiError;
use crate::models::api::{YouTubeUploadRequest, YouTubeUploadResponse};
use crate::AppState;
use axum::{extract::Extension, response::Json, routing::post, Router};
use std::sync::Arc;

pub fn youtube_routes() -> Router {
    Router::new().route("/youtube/upload", post(youtube_upload))
}

pub async fn youtube_upload(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<YouTubeUploadRequest>,
) -> Result<Json<YouTubeUploadResponse>, ApiError> {
    if payload.dry_run {
        return Ok(Json(YouTubeUploadResponse {
            youtube_url: "https://youtube.com/watch?v=abc123".to_string(),
            dry_run: true,
        }));
    }

    let youtube_url = state
        .youtube_client
        .upload_from_url(
            &payload.access_token,
            &payload.video_url,
            &payload.title,
            &payload.description,
        )
        .await?;

    Ok(Json(YouTubeUploadResponse {
        youtube_url,
        dry_run: false,
    }))
}
