// Storage endpoint: re-host an ephemeral video URL to durable storage.

use crate::error::ApiError;
use crate::models::api::{UploadVideoRequest, UploadVideoResponse};
use crate::AppState;
use axum::{extract::Extension, response::Json, routing::post, Router};
use std::sync::Arc;

pub fn storage_routes() -> Router {
    Router::new().route("/storage/upload-video", post(upload_video))
}

pub async fn upload_video(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<UploadVideoRequest>,
) -> Result<Json<UploadVideoResponse>, ApiError> {
    let url = state.providers.publisher.publish(&payload.video_url).await?;
    Ok(Json(UploadVideoResponse { url }))
}
