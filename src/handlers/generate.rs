// End-to-end generation from a finished script and an avatar image
// (direct mode of the pipeline).

use crate::error::{ApiError, PipelineError};
use crate::models::api::GenerateResponse;
use crate::pipeline::JobRequest;
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Extension, Multipart},
    response::Json,
    routing::post,
    Router,
};
use std::sync::Arc;

pub fn generate_routes() -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
}

pub async fn generate(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, ApiError> {
    let mut avatar: Option<(Vec<u8>, String)> = None;
    let mut script: Option<String> = None;
    let mut voice_id: Option<String> = None;
    let mut dry_run = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PipelineError::invalid(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "avatar" => {
                let content_type = field.content_type().unwrap_or("image/jpeg").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| PipelineError::invalid(format!("failed to read avatar: {}", e)))?;
                avatar = Some((bytes.to_vec(), content_type));
            }
            "script" => {
                script = Some(field.text().await.map_err(|e| {
                    PipelineError::invalid(format!("failed to read script: {}", e))
                })?);
            }
            "voice_id" => {
                voice_id = Some(field.text().await.map_err(|e| {
                    PipelineError::invalid(format!("failed to read voice_id: {}", e))
                })?);
            }
            "dry_run" => {
                let value = field.text().await.unwrap_or_default();
                dry_run = matches!(value.trim(), "true" | "1" | "yes");
            }
            _ => {}
        }
    }

    let (avatar_bytes, avatar_content_type) =
        avatar.ok_or_else(|| PipelineError::invalid("missing 'avatar' file"))?;
    let script = script.ok_or_else(|| PipelineError::invalid("missing 'script' field"))?;

    let request = JobRequest::Direct {
        script,
        avatar: avatar_bytes,
        avatar_content_type,
        voice_id: voice_id.filter(|v| !v.trim().is_empty()),
    };

    let job = state.pipeline.run(request, dry_run).await?;
    Ok(Json(GenerateResponse {
        job_id: job.id,
        video_url: job.video_url.unwrap_or_default(),
    }))
}
