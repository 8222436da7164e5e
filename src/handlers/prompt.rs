// End-to-end generation from a single prompt (prompt mode of the
// pipeline): script and avatar are generated before the common stages.

use crate::error::{ApiError, PipelineError};
use crate::models::api::{PromptRequest, PromptResponse};
use crate::pipeline::JobRequest;
use crate::AppState;
use axum::{extract::Extension, response::Json, routing::post, Router};
use std::sync::Arc;

pub fn prompt_routes() -> Router {
    Router::new().route("/api/prompt-to-video", post(prompt_to_video))
}

pub async fn prompt_to_video(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<PromptRequest>,
) -> Result<Json<PromptResponse>, ApiError> {
    if payload.prompt.trim().is_empty() {
        return Err(PipelineError::invalid("missing 'prompt' in request body").into());
    }

    let job = state
        .pipeline
        .run(JobRequest::Prompt { prompt: payload.prompt }, payload.dry_run)
        .await?;

    Ok(Json(PromptResponse {
        job_id: job.id,
        script: job.script.unwrap_or_default(),
        image_url: job.image_url.unwrap_or_default(),
        video_url: job.video_url.unwrap_or_default(),
    }))
}
